use domain::dtos::{ApiErrorBody, BackendErrorDetail};
use domain::StatusValidationError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    #[error("pipeline with id {0:?} does not exist")]
    NotFound(String),
    #[error("notification with id {0:?} does not exist")]
    NotificationNotFound(String),
    #[error("pipeline already running: {0}, only a single active pipeline is allowed")]
    AlreadyRunning(String),
    #[error("pipeline with id {0:?} already exists")]
    IdExists(String),
    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),
    #[error("{error}")]
    InvalidTransition {
        pipeline_id: String,
        error: StatusValidationError,
    },
    #[error("{0}")]
    BadRequest(String),
    #[error("Filter expression validation failed: {0}")]
    FilterValidation(String),
    #[error("only expr_lang_transform is supported")]
    InvalidTransformationType,
    #[error("Failed to evaluate transformation: {0}")]
    Transformation(String),
}

impl MockError {
    pub fn status(&self) -> u16 {
        match self {
            MockError::NotFound(_) | MockError::NotificationNotFound(_) => 404,
            MockError::AlreadyRunning(_) | MockError::IdExists(_) => 403,
            MockError::InvalidConfig(_) => 422,
            MockError::InvalidTransition { error, .. } => error.http_status(),
            MockError::BadRequest(_)
            | MockError::FilterValidation(_)
            | MockError::InvalidTransformationType
            | MockError::Transformation(_) => 400,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MockError::NotFound(_) | MockError::NotificationNotFound(_) => "not_found",
            MockError::AlreadyRunning(_) | MockError::IdExists(_) => "forbidden",
            MockError::InvalidConfig(_) => "unprocessable_entity",
            MockError::InvalidTransition { .. } => domain::lifecycle::INVALID_STATUS_TRANSITION,
            MockError::BadRequest(_) => "bad_request",
            MockError::FilterValidation(_) => "validation_error",
            MockError::InvalidTransformationType => "invalid_transformation_type",
            MockError::Transformation(_) => "transformation_error",
        }
    }

    pub fn to_detail(&self) -> BackendErrorDetail {
        match self {
            MockError::InvalidTransition { pipeline_id, error } => error.to_detail(pipeline_id),
            MockError::NotFound(pipeline_id) | MockError::AlreadyRunning(pipeline_id) | MockError::IdExists(pipeline_id) => {
                BackendErrorDetail::new(self.status(), self.code(), self.to_string())
                    .with_detail("pipeline_id", pipeline_id.as_str())
            }
            _ => BackendErrorDetail::new(self.status(), self.code(), self.to_string()),
        }
    }
}

impl From<MockError> for ApiErrorBody {
    fn from(error: MockError) -> Self {
        ApiErrorBody::new(error.status(), error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MockError>;
