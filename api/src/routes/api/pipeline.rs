use axum::{extract::Path, Json};
use domain::dtos::{
    Pipeline, PipelineActionResponse, PipelineConfig, PipelineHealth, UpdatePipelineNameParams,
};
use domain::LifecycleAction;
use hyper::StatusCode;
use std::sync::Arc;
use tracing::info;

use crate::{app_state::Backend, backend::PipelineBackend, error::Result};

pub async fn get(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<Pipeline>> {
    Ok(Json(backend.get_pipeline(&pipeline_id).await?))
}

pub async fn rename(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
    Json(params): Json<UpdatePipelineNameParams>,
) -> Result<Json<Pipeline>> {
    backend
        .update_pipeline_name(&pipeline_id, &params.name)
        .await?;

    Ok(Json(backend.get_pipeline(&pipeline_id).await?))
}

pub async fn edit(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
    Json(config): Json<PipelineConfig>,
) -> Result<Json<Pipeline>> {
    backend.edit_pipeline(&pipeline_id, config).await?;
    info!("Edited pipeline {pipeline_id}");

    Ok(Json(backend.get_pipeline(&pipeline_id).await?))
}

pub async fn delete(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<StatusCode> {
    backend.delete_pipeline(&pipeline_id).await?;
    info!("Deleted pipeline {pipeline_id}");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn health(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<PipelineHealth>> {
    Ok(Json(backend.pipeline_health(&pipeline_id).await?))
}

async fn apply(
    backend: Arc<dyn PipelineBackend>,
    pipeline_id: String,
    action: LifecycleAction,
) -> Result<Json<PipelineActionResponse>> {
    let status = backend.apply_action(&pipeline_id, action).await?;
    info!("{action} requested for {pipeline_id}, now {status}");

    Ok(Json(PipelineActionResponse {
        success: true,
        pipeline_id,
        status,
    }))
}

pub async fn pause(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<PipelineActionResponse>> {
    apply(backend, pipeline_id, LifecycleAction::Pause).await
}

pub async fn resume(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<PipelineActionResponse>> {
    apply(backend, pipeline_id, LifecycleAction::Resume).await
}

pub async fn stop(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<PipelineActionResponse>> {
    apply(backend, pipeline_id, LifecycleAction::Stop).await
}

pub async fn terminate(
    Path(pipeline_id): Path<String>,
    Backend(backend): Backend,
) -> Result<Json<PipelineActionResponse>> {
    apply(backend, pipeline_id, LifecycleAction::Terminate).await
}
