use reqwest::StatusCode;
use service_core::error::AppError;
use thiserror::Error;

/// Failure of a call to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to marketplace API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("marketplace API answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// 401/403. Callers tear the session down instead of showing an error.
    #[error("session rejected by marketplace API ({0})")]
    Unauthorized(StatusCode),

    /// 2xx response carrying `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid multipart attachment: {0}")]
    Attachment(String),

    /// An id that cannot be placed in a URL path segment.
    #[error("invalid record id {0:?}")]
    InvalidId(String),
}

impl ApiError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for an inline error or banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "We could not reach the server. Please try again.".to_string()
            }
            ApiError::Status { message, .. } | ApiError::Rejected(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            ApiError::Unauthorized(_) => "Your session has expired. Please log in again.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Short label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Status { .. } => "http_error",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Rejected(_) => "rejected",
            ApiError::Decode(_) => "decode",
            ApiError::Attachment(_) => "attachment",
            ApiError::InvalidId(_) => "invalid_id",
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(status) if status == StatusCode::FORBIDDEN => {
                AppError::Forbidden(anyhow::anyhow!("Forbidden"))
            }
            ApiError::Unauthorized(_) => AppError::Unauthorized(anyhow::anyhow!("Session expired")),
            ApiError::Status { status, message } if status == StatusCode::NOT_FOUND => {
                AppError::NotFound(anyhow::anyhow!(message))
            }
            ApiError::Rejected(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            ApiError::Attachment(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            ApiError::InvalidId(id) => {
                AppError::BadRequest(anyhow::anyhow!("invalid record id {:?}", id))
            }
            ApiError::Transport(_) => AppError::ServiceUnavailable,
            other => AppError::BadGateway(other.to_string()),
        }
    }
}
