/// Transport client
///
/// Issues a single HTTP request per call and normalises both outcomes:
/// success bodies become `Option<Value>` (`None` for empty bodies), failures
/// become an [`ApiError`] carrying the most specific message the server gave.
/// There is no retry logic here; retry policy belongs to callers.
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde_json::Value;
use tracing::Instrument;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{make_span_with_request_id, RequestId, REQUEST_ID_HEADER},
};

/// Request body encodings understood by the API
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// URL-form-encoded fields, used by the token endpoint only
    Form(Vec<(String, String)>),
}

/// Per-call options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    pub token: Option<String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Attaches a bearer token; `None` leaves the request unauthenticated
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }
}

/// Seam between the client and the network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request against `path`, relative to the API origin
    async fn call(&self, path: &str, options: RequestOptions) -> ApiResult<Option<Value>>;
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    http_client: HttpClient,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, path: &str, options: RequestOptions) -> ApiResult<Option<Value>> {
        let request_id = RequestId::generate();
        let span = make_span_with_request_id(&options.method, path, &request_id);
        let url = format!("{}{}", self.base_url, path);

        async move {
            let mut builder = self
                .http_client
                .request(options.method, &url)
                .header(REQUEST_ID_HEADER, request_id.to_header_value());

            if let Some(token) = options.token.as_deref().filter(|t| !t.trim().is_empty()) {
                builder = builder.bearer_auth(token);
            }

            builder = match options.body {
                Some(RequestBody::Json(body)) => builder.json(&body),
                Some(RequestBody::Form(fields)) => builder.form(&fields),
                None => builder,
            };

            let response = builder.send().await.map_err(|e| {
                tracing::error!(error = %e, "API request could not be sent");
                ApiError::Transport(e.to_string())
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = resolve_error_message(status, &body);
                tracing::warn!(status = status.as_u16(), message = %message, "API request failed");
                return Err(ApiError::Protocol { status, message });
            }

            if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
                tracing::debug!(status = status.as_u16(), "Empty response body");
                return Ok(None);
            }

            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(None);
            }

            let payload = serde_json::from_str(&text).map_err(|e| {
                tracing::error!(error = %e, "Failed to decode API response");
                ApiError::MalformedResponse(format!("expected JSON body: {}", e))
            })?;

            tracing::debug!(status = status.as_u16(), "API request completed");
            Ok(Some(payload))
        }
        .instrument(span)
        .await
    }
}

/// Picks the most specific human-readable message from an error body
///
/// Priority: field-validation `detail[0].msg`, then a string `detail`,
/// then `message`, then the generic status line. Non-JSON bodies are used verbatim.
pub fn resolve_error_message(status: StatusCode, body: &str) -> String {
    let generic = || format!("API request failed: {}", status.as_u16());

    match serde_json::from_str::<Value>(body) {
        Ok(json) => message_from_json(&json).unwrap_or_else(generic),
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                generic()
            } else {
                text.to_string()
            }
        }
    }
}

fn message_from_json(json: &Value) -> Option<String> {
    let detail = json.get("detail");

    let validation = detail
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("msg"))
        .and_then(Value::as_str);

    let plain_detail = detail.and_then(Value::as_str);
    let message = json.get("message").and_then(Value::as_str);

    validation
        .or(plain_detail)
        .or(message)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
