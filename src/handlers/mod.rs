//! HTTP handlers.

pub mod rest;
