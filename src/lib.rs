//! Fixture sync — live tournament fixtures for the tournament site.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod store;
pub mod presenter;
pub mod engine;
pub mod dashboard;
