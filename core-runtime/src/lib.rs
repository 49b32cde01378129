//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the offline caching proxy:
//! - Logging and tracing infrastructure
//! - Static configuration with fail-fast bridge validation
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the proxy core depends on. It
//! establishes the logging conventions and the configuration surface a host
//! fills in before constructing the proxy.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
