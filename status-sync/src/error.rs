use domain::dtos::{ApiErrorBody, StatusStreamEventError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Api(ApiErrorBody),
    #[error("invalid stream event: {0}")]
    Event(#[from] StatusStreamEventError),
    #[error("stream failed: {0}")]
    Stream(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl SyncError {
    /// The `{code, message}` pair a caller can show for this failure.
    pub fn to_api_error(&self) -> ApiErrorBody {
        match self {
            SyncError::Api(body) => body.clone(),
            SyncError::Request(error) if error.is_timeout() => {
                ApiErrorBody::new(503, "backend request timed out")
            }
            SyncError::Request(error) if error.is_connect() => {
                ApiErrorBody::new(503, "backend unavailable")
            }
            other => ApiErrorBody::new(500, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
