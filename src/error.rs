use reqwest::StatusCode;

/// Client-level errors
///
/// Every failure a caller can observe is one of these. Session and navigation
/// code recovers from them locally; listing code stores them as per-query state.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("{message}")]
    Protocol { status: StatusCode, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of a protocol error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the credentials themselves (401/403)
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Message suitable for a notification or an inline error slot
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Network error. Please check your connection.".to_string(),
            ApiError::Protocol { message, .. } => message.clone(),
            ApiError::Validation(msg) | ApiError::Unsupported(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::MalformedResponse(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
