mod http;
mod mock;

pub use http::{backend_error, transport_error, HttpBackend};

use axum::async_trait;
use domain::dtos::{
    DlqMessage, DlqState, FilterValidationRequest, Notification, NotificationQuery, Pipeline,
    PipelineConfig, PipelineHealth, PipelineListItem, PipelineStatus, PlatformInfo,
    TransformEvaluationRequest,
};
use domain::LifecycleAction;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

/// The orchestration API (and the notification service) as seen by the
/// route handlers.
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// The same backend acting on behalf of the caller's bearer token.
    fn authorized(&self, token: Option<String>) -> Arc<dyn PipelineBackend>;

    async fn create_pipeline(&self, config: PipelineConfig) -> Result<String>;

    async fn list_pipelines(&self) -> Result<Vec<PipelineListItem>>;

    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline>;

    async fn update_pipeline_name(&self, pipeline_id: &str, name: &str) -> Result<()>;

    async fn edit_pipeline(&self, pipeline_id: &str, config: PipelineConfig) -> Result<()>;

    async fn delete_pipeline(&self, pipeline_id: &str) -> Result<()>;

    /// Issues a lifecycle action and returns the status the pipeline moved
    /// into while the action completes.
    async fn apply_action(
        &self,
        pipeline_id: &str,
        action: LifecycleAction,
    ) -> Result<PipelineStatus>;

    /// Terminates every pipeline that can still be terminated.
    async fn terminate_all(&self) -> Result<Vec<String>> {
        let mut terminated = Vec::new();

        for pipeline in self.list_pipelines().await? {
            if !LifecycleAction::Terminate.is_allowed(pipeline.status) {
                continue;
            }

            let result = self
                .apply_action(&pipeline.pipeline_id, LifecycleAction::Terminate)
                .await;

            match result {
                Ok(_) => terminated.push(pipeline.pipeline_id),
                Err(error) => warn!("Failed to terminate {}: {error}", pipeline.pipeline_id),
            }
        }

        Ok(terminated)
    }

    async fn pipeline_health(&self, pipeline_id: &str) -> Result<PipelineHealth>;

    async fn dlq_state(&self, pipeline_id: &str) -> Result<DlqState>;

    async fn dlq_consume(
        &self,
        pipeline_id: &str,
        batch_size: Option<usize>,
    ) -> Result<Vec<DlqMessage>>;

    async fn dlq_purge(&self, pipeline_id: &str) -> Result<()>;

    async fn platform(&self) -> Result<PlatformInfo>;

    async fn validate_filter(&self, request: &FilterValidationRequest) -> Result<()>;

    async fn evaluate_transform(&self, request: &TransformEvaluationRequest) -> Result<Value>;

    async fn list_notifications(&self, query: &NotificationQuery) -> Result<Vec<Notification>>;

    async fn get_notification(&self, notification_id: &str) -> Result<Notification>;

    async fn delete_notification(&self, notification_id: &str) -> Result<()>;

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<usize>;
}
