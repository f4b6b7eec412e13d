//! Shared storage integration tests.
//!
//! Tests the store interfaces against every backend. Each backend's test
//! binary builds a `Stores` bundle and runs the contract macro over it.

pub mod store_contract_tests;
