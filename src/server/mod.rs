//! HTTP service mode.
//!
//! This module provides:
//! - TOML + environment configuration (`config`)
//! - The axum router and handlers (`routes`)
//! - Error-to-response mapping with quota headers (`error`)
//!
//! Enabled by the `server` cargo feature; the `uraniad` binary wires it
//! together.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{Config, Secrets};
pub use error::ApiError;
pub use routes::{AppState, router};
