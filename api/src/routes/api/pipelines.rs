use axum::Json;
use domain::dtos::{
    CreatePipelineResponse, PipelineConfig, PipelineListItem, TerminateAllResponse,
};
use tracing::info;

use crate::{app_state::Backend, error::Result};

pub async fn list(Backend(backend): Backend) -> Result<Json<Vec<PipelineListItem>>> {
    Ok(Json(backend.list_pipelines().await?))
}

pub async fn create(
    Backend(backend): Backend,
    Json(config): Json<PipelineConfig>,
) -> Result<Json<CreatePipelineResponse>> {
    let pipeline_id = backend.create_pipeline(config).await?;
    info!("Created pipeline {pipeline_id}");

    Ok(Json(CreatePipelineResponse::active(pipeline_id)))
}

pub async fn terminate_all(Backend(backend): Backend) -> Result<Json<TerminateAllResponse>> {
    let terminated = backend.terminate_all().await?;
    info!("Terminating {} pipeline(s)", terminated.len());

    Ok(Json(TerminateAllResponse {
        success: true,
        terminated,
    }))
}
