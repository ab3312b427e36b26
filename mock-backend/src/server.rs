//! The mock service behind the orchestration API's `/api/v1` routes, plus the
//! notification service's `/notifications` routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use domain::dtos::{
    DlqConsumeQuery, DlqMessage, DlqState, FilterValidationRequest, MarkNotificationsReadParams,
    MarkNotificationsReadResponse, Notification, NotificationQuery, Pipeline, PipelineActionResponse,
    PipelineConfig, PipelineHealth, PipelineListItem, PlatformInfo, TransformEvaluationRequest,
    UpdatePipelineNameParams,
};
use domain::LifecycleAction;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::MockError;
use crate::service::MockPipelineService;

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        debug!("Mock backend answering {status}: {self}");
        (status, Json(self.to_detail())).into_response()
    }
}

type MockResult<T> = Result<T, MockError>;

pub fn router(service: MockPipelineService) -> Router {
    Router::new()
        .route("/api/v1/pipeline", get(list_pipelines).post(create_pipeline))
        .route(
            "/api/v1/pipeline/:id",
            get(get_pipeline)
                .patch(update_pipeline_name)
                .delete(delete_pipeline),
        )
        .route("/api/v1/pipeline/:id/pause", post(pause_pipeline))
        .route("/api/v1/pipeline/:id/resume", post(resume_pipeline))
        .route("/api/v1/pipeline/:id/stop", post(stop_pipeline))
        .route("/api/v1/pipeline/:id/terminate", post(terminate_pipeline))
        .route("/api/v1/pipeline/:id/edit", post(edit_pipeline))
        .route("/api/v1/pipeline/:id/health", get(pipeline_health))
        .route("/api/v1/pipeline/:id/dlq/state", get(dlq_state))
        .route("/api/v1/pipeline/:id/dlq/consume", get(dlq_consume))
        .route("/api/v1/pipeline/:id/dlq/purge", post(dlq_purge))
        .route("/api/v1/platform", get(platform))
        .route("/api/v1/filter/validate", post(validate_filter))
        .route(
            "/api/v1/transform/expression/evaluate",
            post(evaluate_transform),
        )
        .route("/notifications", get(list_notifications))
        .route("/notifications/mark-read", post(mark_notifications_read))
        .route(
            "/notifications/:id",
            get(get_notification).delete(delete_notification),
        )
        .with_state(service)
}

async fn create_pipeline(
    State(service): State<MockPipelineService>,
    Json(config): Json<PipelineConfig>,
) -> MockResult<(StatusCode, Json<Pipeline>)> {
    let pipeline_id = service.create_pipeline(config).await?;
    let pipeline = service.get_pipeline(&pipeline_id).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

async fn list_pipelines(State(service): State<MockPipelineService>) -> Json<Vec<PipelineListItem>> {
    Json(service.list_pipelines().await)
}

async fn get_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<Pipeline>> {
    Ok(Json(service.get_pipeline(&id).await?))
}

async fn update_pipeline_name(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
    Json(params): Json<UpdatePipelineNameParams>,
) -> MockResult<Json<Pipeline>> {
    service.update_pipeline_name(&id, &params.name).await?;
    Ok(Json(service.get_pipeline(&id).await?))
}

async fn delete_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<StatusCode> {
    service.delete_pipeline(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_action(
    service: &MockPipelineService,
    id: String,
    action: LifecycleAction,
) -> MockResult<Json<PipelineActionResponse>> {
    let status = service.apply_action(&id, action).await?;

    Ok(Json(PipelineActionResponse {
        success: true,
        pipeline_id: id,
        status,
    }))
}

async fn pause_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<PipelineActionResponse>> {
    run_action(&service, id, LifecycleAction::Pause).await
}

async fn resume_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<PipelineActionResponse>> {
    run_action(&service, id, LifecycleAction::Resume).await
}

async fn stop_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<PipelineActionResponse>> {
    run_action(&service, id, LifecycleAction::Stop).await
}

async fn terminate_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<PipelineActionResponse>> {
    run_action(&service, id, LifecycleAction::Terminate).await
}

async fn edit_pipeline(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
    Json(config): Json<PipelineConfig>,
) -> MockResult<Json<Pipeline>> {
    service.edit_pipeline(&id, config).await?;
    Ok(Json(service.get_pipeline(&id).await?))
}

async fn pipeline_health(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<PipelineHealth>> {
    Ok(Json(service.pipeline_health(&id).await?))
}

async fn dlq_state(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<DlqState>> {
    Ok(Json(service.dlq_state(&id).await?))
}

async fn dlq_consume(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
    Query(query): Query<DlqConsumeQuery>,
) -> MockResult<Response> {
    let messages: Vec<DlqMessage> = service.dlq_consume(&id, query.batch_size).await?;

    if messages.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(messages).into_response())
}

async fn dlq_purge(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<StatusCode> {
    service.dlq_purge(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn platform(State(service): State<MockPipelineService>) -> Json<PlatformInfo> {
    Json(service.platform())
}

async fn validate_filter(
    State(service): State<MockPipelineService>,
    Json(request): Json<FilterValidationRequest>,
) -> MockResult<Json<Value>> {
    service.validate_filter(&request)?;
    Ok(Json(json!({ "valid": true })))
}

async fn evaluate_transform(
    State(service): State<MockPipelineService>,
    Json(request): Json<TransformEvaluationRequest>,
) -> MockResult<Json<Value>> {
    Ok(Json(service.evaluate_transform(&request)?))
}

async fn list_notifications(
    State(service): State<MockPipelineService>,
    Query(query): Query<NotificationQuery>,
) -> Json<Vec<Notification>> {
    Json(service.list_notifications(&query).await)
}

async fn get_notification(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<Json<Notification>> {
    Ok(Json(service.get_notification(&id).await?))
}

async fn delete_notification(
    State(service): State<MockPipelineService>,
    Path(id): Path<String>,
) -> MockResult<StatusCode> {
    service.delete_notification(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_notifications_read(
    State(service): State<MockPipelineService>,
    Json(params): Json<MarkNotificationsReadParams>,
) -> Json<MarkNotificationsReadResponse> {
    let updated = service.mark_notifications_read(&params.notification_ids).await;

    Json(MarkNotificationsReadResponse {
        success: true,
        updated,
    })
}
