//! Error types for the flattening engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while flattening or rebuilding a fragment
///
/// The public `encode`/`decode` entry points never surface these to callers;
/// they degrade to "less content" instead. The variants are visible to
/// render-surface implementations and to the CLI.
#[derive(Error, Debug)]
pub enum Error {
    /// The render surface could not be constructed
    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The surface was constructed but the fragment did not load
    #[error("Failed to load fragment: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// JSON (de)serialization of visual units failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
