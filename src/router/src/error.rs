//! Error types for route tree construction and configuration

use thiserror::Error;

/// Router construction and configuration errors
///
/// Navigation outcomes (denials, not-found, redirect loops) are values of
/// [`crate::NavigationOutcome`], not errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Route tree violates a structural invariant
    #[error("Invalid route tree: {0}")]
    InvalidTree(String),

    /// Route file references a guard that was never registered
    #[error("Unknown guard: {0}")]
    UnknownGuard(String),

    /// Route file references a resolver that was never registered
    #[error("Unknown resolver: {0}")]
    UnknownResolver(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Route file could not be parsed
    #[error("Route file parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for router operations
pub type Result<T> = std::result::Result<T, RouterError>;
