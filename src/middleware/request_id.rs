use std::fmt;

use reqwest::{header::HeaderValue, Method};
use uuid::Uuid;

/// Header carrying the correlation id of an outgoing call
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id minted for every outgoing API call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Hyphenated UUID, always a valid header value
    pub fn to_header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.0.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Span wrapping a single API call, tagged with its request ID
pub fn make_span_with_request_id(method: &Method, path: &str, request_id: &RequestId) -> tracing::Span {
    tracing::info_span!(
        "api_request",
        method = %method,
        path = %path,
        request_id = %request_id,
    )
}
