//! Pure utility functions.
//!
//! Process bootstrap and retry policy shared by the binary and the services.

pub mod bootstrap;
pub mod retry;
