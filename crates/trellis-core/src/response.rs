//! HTTP Response types

use bytes::Bytes;
use http_body_util::Full;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Content type set by [`Response::json`]
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Diagnostic cause attached to a 500 response; logged, never serialized
pub type Fault = Arc<dyn std::error::Error + Send + Sync>;

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    // 2xx Success
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    // 4xx Client Errors
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const CONFLICT: StatusCode = StatusCode(409);
    pub const PAYLOAD_TOO_LARGE: StatusCode = StatusCode(413);
    pub const UNPROCESSABLE_ENTITY: StatusCode = StatusCode(422);

    // 5xx Server Errors
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get the reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            409 => "Conflict",
            413 => "Payload Too Large",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// HTTP Response
///
/// Immutable once built, so canned instances can be cloned into every reply.
#[derive(Clone)]
pub struct Response {
    /// Status code
    pub status: StatusCode,
    /// Response headers, keys unique (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 8]>,
    /// Response body
    pub body: Bytes,
    fault: Option<Fault>,
}

impl Response {
    /// Create an empty response
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: Bytes::new(),
            fault: None,
        }
    }

    /// Create a JSON response from an already-encoded payload.
    ///
    /// Sets `Content-Type` and `Content-Length`.
    pub fn json(raw: impl Into<String>, status: StatusCode) -> Self {
        let body = Bytes::from(raw.into());
        ResponseBuilder::new(status)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .header("Content-Length", body.len().to_string())
            .body(body)
            .build()
    }

    /// Create a 500 response carrying an internal cause for logging
    pub fn fatal<E>(fault: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::json(
            r#"{"error":"internal server error"}"#,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .with_fault(fault)
    }

    /// Attach an internal cause, replacing any earlier one
    pub fn with_fault<E>(mut self, fault: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.fault = Some(Arc::new(fault));
        self
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get content-type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get body as string (if UTF-8)
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(|s| s.to_string())
    }

    /// Internal cause, if this is a fault-carrying response
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Convert into an `http` response for the transport.
    ///
    /// Headers that are not valid HTTP tokens are skipped with a warning;
    /// an out-of-range status becomes 500.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = http::StatusCode::from_u16(self.status.0)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "skipping invalid response header"),
            }
        }
        res
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("fault", &self.fault.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Create a new builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    /// Set status code
    pub fn status(mut self, status: StatusCode) -> Self {
        self.response.status = status;
        self
    }

    /// Set a header, replacing any earlier value under the same
    /// case-insensitive name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.response.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => *slot = (name, value),
            None => self.response.headers.push((name, value)),
        }
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    /// Attach an internal cause
    pub fn fault<E>(mut self, fault: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.response.fault = Some(Arc::new(fault));
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        self.response
    }
}
