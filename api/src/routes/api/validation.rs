use axum::Json;
use domain::dtos::{FilterValidationRequest, TransformEvaluationRequest};
use serde_json::{json, Value};

use crate::{app_state::Backend, error::Result};

pub async fn validate_filter(
    Backend(backend): Backend,
    Json(request): Json<FilterValidationRequest>,
) -> Result<Json<Value>> {
    backend.validate_filter(&request).await?;
    Ok(Json(json!({ "valid": true })))
}

pub async fn evaluate_transform(
    Backend(backend): Backend,
    Json(request): Json<TransformEvaluationRequest>,
) -> Result<Json<Value>> {
    Ok(Json(backend.evaluate_transform(&request).await?))
}
