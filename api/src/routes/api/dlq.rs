use axum::{
    extract::{Path, Query},
    Json,
};
use domain::dtos::{DlqConsumeQuery, DlqMessage, DlqState};
use hyper::StatusCode;

use crate::{app_state::Backend, error::Result};

pub async fn state(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<DlqState>> {
    Ok(Json(backend.dlq_state(&pipeline_id).await?))
}

pub async fn consume(
    Path(pipeline_id): Path<String>,
    Query(query): Query<DlqConsumeQuery>,
    Backend(backend): Backend,
) -> Result<Json<Vec<DlqMessage>>> {
    Ok(Json(
        backend.dlq_consume(&pipeline_id, query.batch_size).await?,
    ))
}

pub async fn purge(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<StatusCode> {
    backend.dlq_purge(&pipeline_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
