//! reliefhub - relief coordination backend.
//!
//! Camps post needs, NGOs pledge against them, citizens volunteer for camp
//! seats. Pledges and seat reservations commit atomically at the store so
//! concurrent callers can never overcommit a need or a camp.

pub mod actor;
pub mod config;
pub mod handlers;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;
