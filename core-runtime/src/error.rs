//! Errors raised while assembling the runtime.
//!
//! Both variants surface before any request is served: a bad setting from
//! the builder or logging setup, or a host that left out a bridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A builder or logging value was missing or out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The host did not provide a required bridge implementation.
    #[error("Missing bridge {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
