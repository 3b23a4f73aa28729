//! Types shared by every Kai crate.
//!
//! Kept deliberately small so the library crates can depend on it without
//! dragging in the UI or HTTP stack.
//!
//! - [`KaiError`] and [`Result`]: shared error handling
//! - [`observability`]: one-shot tracing/logging initialisation
//!
//! ```rust
//! use kai_common::KaiError;
//!
//! let err = KaiError::Config("API key is not defined".into());
//! assert_eq!(err.to_string(), "Configuration error: API key is not defined");
//! ```

pub mod observability;

/// Error types used across the Kai workspace.
#[derive(thiserror::Error, Debug)]
pub enum KaiError {
    /// The language model call failed (transport, status, or payload).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`KaiError`].
pub type Result<T> = std::result::Result<T, KaiError>;
