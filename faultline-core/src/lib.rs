//! Core shared library for the Faultline error-log service.
//!
//! This crate exposes the primitives the service crates depend on:
//! common errors, configuration loading, the database pool wrapper
//! and logging setup.

pub mod config;
pub mod db;
pub mod errors;
pub mod logging;

pub use errors::{FaultlineError, Result as CoreResult};
