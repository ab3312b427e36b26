use axum::{
    response::{IntoResponse, Response},
    Json,
};
use domain::dtos::ApiErrorBody;
use hyper::StatusCode;
use mock_backend::MockError;

/// Every failed handler ends up here and leaves as a `{code, message}` body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody::new(self.status.as_u16(), self.message.clone())
    }
}

impl From<ApiErrorBody> for ApiError {
    fn from(body: ApiErrorBody) -> Self {
        match StatusCode::from_u16(body.code) {
            Ok(status) => Self::new(status, body.message),
            Err(_) => Self::internal(),
        }
    }
}

impl From<MockError> for ApiError {
    fn from(error: MockError) -> Self {
        ApiErrorBody::from(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_body())).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
