use axum::async_trait;
use domain::dtos::{
    DlqMessage, DlqState, FilterValidationRequest, Notification, NotificationQuery, Pipeline,
    PipelineConfig, PipelineHealth, PipelineListItem, PipelineStatus, PlatformInfo,
    TransformEvaluationRequest,
};
use domain::LifecycleAction;
use mock_backend::MockPipelineService;
use serde_json::Value;
use std::sync::Arc;

use super::PipelineBackend;
use crate::error::Result;

/// Mock mode: the fixtures answer in-process. Tokens are not checked.
#[async_trait]
impl PipelineBackend for MockPipelineService {
    fn authorized(&self, _token: Option<String>) -> Arc<dyn PipelineBackend> {
        Arc::new(self.clone())
    }

    async fn create_pipeline(&self, config: PipelineConfig) -> Result<String> {
        Ok(MockPipelineService::create_pipeline(self, config).await?)
    }

    async fn list_pipelines(&self) -> Result<Vec<PipelineListItem>> {
        Ok(MockPipelineService::list_pipelines(self).await)
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        Ok(MockPipelineService::get_pipeline(self, pipeline_id).await?)
    }

    async fn update_pipeline_name(&self, pipeline_id: &str, name: &str) -> Result<()> {
        Ok(MockPipelineService::update_pipeline_name(self, pipeline_id, name).await?)
    }

    async fn edit_pipeline(&self, pipeline_id: &str, config: PipelineConfig) -> Result<()> {
        Ok(MockPipelineService::edit_pipeline(self, pipeline_id, config).await?)
    }

    async fn delete_pipeline(&self, pipeline_id: &str) -> Result<()> {
        Ok(MockPipelineService::delete_pipeline(self, pipeline_id).await?)
    }

    async fn apply_action(
        &self,
        pipeline_id: &str,
        action: LifecycleAction,
    ) -> Result<PipelineStatus> {
        Ok(MockPipelineService::apply_action(self, pipeline_id, action).await?)
    }

    async fn terminate_all(&self) -> Result<Vec<String>> {
        Ok(MockPipelineService::terminate_all(self).await)
    }

    async fn pipeline_health(&self, pipeline_id: &str) -> Result<PipelineHealth> {
        Ok(MockPipelineService::pipeline_health(self, pipeline_id).await?)
    }

    async fn dlq_state(&self, pipeline_id: &str) -> Result<DlqState> {
        Ok(MockPipelineService::dlq_state(self, pipeline_id).await?)
    }

    async fn dlq_consume(
        &self,
        pipeline_id: &str,
        batch_size: Option<usize>,
    ) -> Result<Vec<DlqMessage>> {
        Ok(MockPipelineService::dlq_consume(self, pipeline_id, batch_size).await?)
    }

    async fn dlq_purge(&self, pipeline_id: &str) -> Result<()> {
        Ok(MockPipelineService::dlq_purge(self, pipeline_id).await?)
    }

    async fn platform(&self) -> Result<PlatformInfo> {
        Ok(MockPipelineService::platform(self))
    }

    async fn validate_filter(&self, request: &FilterValidationRequest) -> Result<()> {
        Ok(MockPipelineService::validate_filter(self, request)?)
    }

    async fn evaluate_transform(&self, request: &TransformEvaluationRequest) -> Result<Value> {
        Ok(MockPipelineService::evaluate_transform(self, request)?)
    }

    async fn list_notifications(&self, query: &NotificationQuery) -> Result<Vec<Notification>> {
        Ok(MockPipelineService::list_notifications(self, query).await)
    }

    async fn get_notification(&self, notification_id: &str) -> Result<Notification> {
        Ok(MockPipelineService::get_notification(self, notification_id).await?)
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        Ok(MockPipelineService::delete_notification(self, notification_id).await?)
    }

    async fn mark_notifications_read(&self, notification_ids: &[String]) -> Result<usize> {
        Ok(MockPipelineService::mark_notifications_read(self, notification_ids).await)
    }
}
