//! Error types for trellis-core

use thiserror::Error;

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the dispatch core
///
/// The first four variants are request-level failures; the dispatcher turns
/// each into a canned response and never hands them to the transport.
#[derive(Debug, Error)]
pub enum Error {
    /// No version/resource/verb match
    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// Body read filled the pooled buffer
    #[error("Body too large: reached limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Body present but not parseable into the route's target
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Handler produced no response
    #[error("Handler produced no response for {url}")]
    HandlerFault { url: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
