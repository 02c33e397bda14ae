//! Pre-built failure responses

use crate::{Config, Error, Response, StatusCode};

/// Fixed responses for request-level failures.
///
/// Built once when the router is created and cloned into each reply.
#[derive(Debug, Clone)]
pub struct Canned {
    pub not_found: Response,
    pub body_too_large: Response,
    pub invalid_format: Response,
    pub internal_server_error: Response,
}

impl Canned {
    pub fn from_config(config: &Config) -> Self {
        Self {
            not_found: Response::json(r#"{"error":"not found"}"#, StatusCode::NOT_FOUND),
            body_too_large: Response::json(
                r#"{"error":"body too large"}"#,
                StatusCode(config.too_large_status),
            ),
            invalid_format: Response::json(
                r#"{"error":"invalid format"}"#,
                StatusCode(config.invalid_format_status),
            ),
            internal_server_error: Response::json(
                r#"{"error":"internal server error"}"#,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    }

    /// The canned response for a request-level error
    pub fn for_error(&self, err: &Error) -> Response {
        match err {
            Error::RouteNotFound { .. } => self.not_found.clone(),
            Error::PayloadTooLarge { .. } => self.body_too_large.clone(),
            Error::MalformedBody(_) => self.invalid_format.clone(),
            _ => self.internal_server_error.clone(),
        }
    }
}

impl Default for Canned {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
