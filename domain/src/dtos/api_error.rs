use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The `{code, message}` pair every failed call is reduced to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorBody {}

/// Error body as produced by the orchestration API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendErrorDetail {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl BackendErrorDetail {
    pub fn new(status: u16, code: &str, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code: Some(code.to_string()),
            message: Some(message.into()),
            details: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Collapses the detail into the `{code, message}` pair. Internal errors
    /// never expose the backend message.
    pub fn into_api_error(self, http_status: u16) -> ApiErrorBody {
        if http_status == 500 {
            return ApiErrorBody::new(500, "Internal server error");
        }

        let message = self
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| default_message(http_status).to_string());

        ApiErrorBody::new(http_status, message)
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not found",
        409 => "conflict",
        422 => "invalid configuration",
        501 => "not implemented",
        502 => "bad gateway",
        503 => "service unavailable",
        _ => "request failed",
    }
}
