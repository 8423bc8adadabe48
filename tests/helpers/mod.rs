//! Test helpers module
//!
//! Shared utilities for the integration test binaries: an isolated Postgres
//! instance per test plus builders for common request payloads.

#![allow(dead_code)]

pub mod database_helper;
pub mod test_data;

pub use database_helper::*;
pub use test_data::*;
