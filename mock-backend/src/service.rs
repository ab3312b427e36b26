use chrono::Utc;
use domain::dtos::{
    dlq_batch_size, ColumnSchema, DlqMessage, DlqState, FilterValidationRequest, Notification,
    NotificationQuery, Pipeline, PipelineConfig, PipelineHealth,
    PipelineListItem, PipelineStatus, PlatformInfo, TransformEvaluationRequest,
    EXPR_LANG_TRANSFORM,
};
use domain::lifecycle::{can_delete, can_edit, StatusValidationError};
use domain::LifecycleAction;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{MockError, Result};
use crate::expression;
use crate::fixtures;
use crate::simulator::{LifecycleSimulator, TransitionDelays};
use crate::store::{DlqQueue, MockStore};

pub const MOCK_ORCHESTRATOR: &str = "mock";

/// In-memory stand-in for the orchestration API.
#[derive(Clone)]
pub struct MockPipelineService {
    store: Arc<MockStore>,
    simulator: LifecycleSimulator,
    delays: TransitionDelays,
    single_active_pipeline: bool,
}

impl Default for MockPipelineService {
    fn default() -> Self {
        Self::new(TransitionDelays::default())
    }
}

impl MockPipelineService {
    pub fn new(delays: TransitionDelays) -> Self {
        let store = Arc::new(MockStore::with_fixtures());
        Self {
            simulator: LifecycleSimulator::new(store.clone()),
            store,
            delays,
            single_active_pipeline: true,
        }
    }

    #[must_use]
    pub fn allow_concurrent_pipelines(mut self) -> Self {
        self.single_active_pipeline = false;
        self
    }

    pub fn store(&self) -> &Arc<MockStore> {
        &self.store
    }

    pub fn simulator(&self) -> &LifecycleSimulator {
        &self.simulator
    }

    pub async fn create_pipeline(&self, mut config: PipelineConfig) -> Result<String> {
        config.validate().map_err(MockError::InvalidConfig)?;

        if config.pipeline_id.trim().is_empty() {
            config.pipeline_id = Uuid::new_v4().to_string();
        }
        let pipeline_id = config.pipeline_id.clone();

        {
            let mut pipelines = self.store.pipelines.write().await;

            if pipelines.contains_key(&pipeline_id) {
                return Err(MockError::IdExists(pipeline_id));
            }

            if self.single_active_pipeline {
                if let Some(active) = pipelines.values().find(|pipeline| pipeline.status.is_active()) {
                    return Err(MockError::AlreadyRunning(active.pipeline_id.clone()));
                }
            }

            pipelines.insert(
                pipeline_id.clone(),
                Pipeline::from_config(config, PipelineStatus::Created, Utc::now()),
            );
        }

        self.store
            .dlq
            .write()
            .await
            .insert(pipeline_id.clone(), DlqQueue::seeded(fixtures::dlq_messages(&pipeline_id)));

        info!("Created mock pipeline {pipeline_id}");

        self.simulator.simulate_transition(
            &pipeline_id,
            PipelineStatus::Created,
            PipelineStatus::Running,
            self.delays.start,
        );

        Ok(pipeline_id)
    }

    pub async fn list_pipelines(&self) -> Vec<PipelineListItem> {
        let mut pipelines: Vec<PipelineListItem> = self
            .store
            .pipelines
            .read()
            .await
            .values()
            .map(Pipeline::list_item)
            .collect();

        pipelines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pipelines
    }

    pub async fn get_pipeline(&self, pipeline_id: &str) -> Result<Pipeline> {
        self.store
            .pipelines
            .read()
            .await
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| MockError::NotFound(pipeline_id.to_string()))
    }

    pub async fn update_pipeline_name(&self, pipeline_id: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MockError::BadRequest("pipeline name must not be empty".to_string()));
        }

        let mut pipelines = self.store.pipelines.write().await;
        let pipeline = pipelines
            .get_mut(pipeline_id)
            .ok_or_else(|| MockError::NotFound(pipeline_id.to_string()))?;

        pipeline.name = name.to_string();
        pipeline.updated_at = Utc::now();

        Ok(())
    }

    pub async fn edit_pipeline(&self, pipeline_id: &str, config: PipelineConfig) -> Result<()> {
        config.validate().map_err(MockError::InvalidConfig)?;

        let mut pipelines = self.store.pipelines.write().await;
        let pipeline = pipelines
            .get_mut(pipeline_id)
            .ok_or_else(|| MockError::NotFound(pipeline_id.to_string()))?;

        if !can_edit(pipeline.status) {
            return Err(MockError::BadRequest(format!(
                "pipeline can only be edited if it's stopped, current status: {}",
                pipeline.status
            )));
        }

        pipeline.apply_config(config, Utc::now());
        info!("Edited mock pipeline {pipeline_id}");

        Ok(())
    }

    pub async fn delete_pipeline(&self, pipeline_id: &str) -> Result<()> {
        {
            let mut pipelines = self.store.pipelines.write().await;
            let status = pipelines
                .get(pipeline_id)
                .map(|pipeline| pipeline.status)
                .ok_or_else(|| MockError::NotFound(pipeline_id.to_string()))?;

            if !can_delete(status) {
                return Err(MockError::BadRequest(format!(
                    "pipeline can only be deleted if it's stopped, current status: {status}"
                )));
            }

            pipelines.remove(pipeline_id);
        }

        self.store.dlq.write().await.remove(pipeline_id);
        info!("Deleted mock pipeline {pipeline_id}");

        Ok(())
    }

    /// Moves the pipeline into the action's in-between status right away and
    /// schedules the final one.
    pub async fn apply_action(
        &self,
        pipeline_id: &str,
        action: LifecycleAction,
    ) -> Result<PipelineStatus> {
        let current = {
            let mut pipelines = self.store.pipelines.write().await;
            let pipeline = pipelines
                .get_mut(pipeline_id)
                .ok_or_else(|| MockError::NotFound(pipeline_id.to_string()))?;

            let current = pipeline.status;
            if !action.is_allowed(current) {
                return Err(MockError::InvalidTransition {
                    pipeline_id: pipeline_id.to_string(),
                    error: StatusValidationError::new(current, action.optimistic_status()),
                });
            }

            pipeline.status = action.optimistic_status();
            pipeline.updated_at = Utc::now();
            current
        };

        debug!(
            "Mock pipeline {pipeline_id}: {action} requested, {current} -> {}",
            action.optimistic_status()
        );

        self.simulator.simulate_transition(
            pipeline_id,
            action.optimistic_status(),
            action.final_status(),
            self.delays.for_action(action),
        );

        Ok(action.optimistic_status())
    }

    /// Terminates everything that can still be terminated.
    pub async fn terminate_all(&self) -> Vec<String> {
        let candidates: Vec<String> = self
            .store
            .pipelines
            .read()
            .await
            .values()
            .filter(|pipeline| LifecycleAction::Terminate.is_allowed(pipeline.status))
            .map(|pipeline| pipeline.pipeline_id.clone())
            .collect();

        let mut terminated = Vec::new();
        for pipeline_id in candidates {
            if self
                .apply_action(&pipeline_id, LifecycleAction::Terminate)
                .await
                .is_ok()
            {
                terminated.push(pipeline_id);
            }
        }

        terminated.sort();
        terminated
    }

    pub async fn pipeline_health(&self, pipeline_id: &str) -> Result<PipelineHealth> {
        let pipeline = self.get_pipeline(pipeline_id).await?;

        Ok(PipelineHealth {
            pipeline_id: pipeline.pipeline_id,
            pipeline_name: pipeline.name,
            overall_status: pipeline.status,
            created_at: pipeline.created_at,
            updated_at: Utc::now(),
        })
    }

    pub fn platform(&self) -> PlatformInfo {
        PlatformInfo {
            orchestrator: MOCK_ORCHESTRATOR.to_string(),
            api_version: Some("v1".to_string()),
        }
    }

    async fn ensure_exists(&self, pipeline_id: &str) -> Result<()> {
        if self.store.pipelines.read().await.contains_key(pipeline_id) {
            Ok(())
        } else {
            Err(MockError::NotFound(pipeline_id.to_string()))
        }
    }

    pub async fn dlq_state(&self, pipeline_id: &str) -> Result<DlqState> {
        self.ensure_exists(pipeline_id).await?;

        Ok(self
            .store
            .dlq
            .read()
            .await
            .get(pipeline_id)
            .map(|queue| queue.state.clone())
            .unwrap_or_default())
    }

    pub async fn dlq_consume(
        &self,
        pipeline_id: &str,
        batch_size: Option<usize>,
    ) -> Result<Vec<DlqMessage>> {
        let batch_size = dlq_batch_size(batch_size).map_err(MockError::BadRequest)?;
        self.ensure_exists(pipeline_id).await?;

        Ok(self
            .store
            .dlq
            .write()
            .await
            .entry(pipeline_id.to_string())
            .or_default()
            .consume(batch_size))
    }

    pub async fn dlq_purge(&self, pipeline_id: &str) -> Result<()> {
        self.ensure_exists(pipeline_id).await?;

        if let Some(queue) = self.store.dlq.write().await.get_mut(pipeline_id) {
            queue.purge();
        }

        Ok(())
    }

    pub fn validate_filter(&self, request: &FilterValidationRequest) -> Result<()> {
        expression::validate_filter(&request.expression, &request.fields)
            .map_err(MockError::FilterValidation)
    }

    pub fn evaluate_transform(&self, request: &TransformEvaluationRequest) -> Result<Value> {
        if request.kind != EXPR_LANG_TRANSFORM {
            return Err(MockError::InvalidTransformationType);
        }

        expression::evaluate_transforms(&request.config.transform, &request.sample)
            .map_err(MockError::Transformation)
    }

    pub async fn list_notifications(&self, query: &NotificationQuery) -> Vec<Notification> {
        let mut notifications: Vec<Notification> = self
            .store
            .notifications
            .read()
            .await
            .iter()
            .filter(|notification| query.matches(notification))
            .cloned()
            .collect();

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    pub async fn get_notification(&self, notification_id: &str) -> Result<Notification> {
        self.store
            .notifications
            .read()
            .await
            .iter()
            .find(|notification| notification.notification_id == notification_id)
            .cloned()
            .ok_or_else(|| MockError::NotificationNotFound(notification_id.to_string()))
    }

    pub async fn delete_notification(&self, notification_id: &str) -> Result<()> {
        let mut notifications = self.store.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|notification| notification.notification_id != notification_id);

        if notifications.len() == before {
            return Err(MockError::NotificationNotFound(notification_id.to_string()));
        }

        Ok(())
    }

    pub async fn mark_notifications_read(&self, notification_ids: &[String]) -> usize {
        let mut updated = 0;
        for notification in self.store.notifications.write().await.iter_mut() {
            if !notification.read && notification_ids.contains(&notification.notification_id) {
                notification.read = true;
                updated += 1;
            }
        }
        updated
    }

    pub fn clickhouse_databases(&self) -> Vec<String> {
        fixtures::clickhouse_databases()
    }

    pub fn clickhouse_tables(&self, database: &str) -> Vec<String> {
        fixtures::clickhouse_tables(database)
    }

    pub fn clickhouse_schema(&self, database: &str, table: &str) -> Result<Vec<ColumnSchema>> {
        fixtures::clickhouse_schema(database, table).ok_or_else(|| {
            MockError::BadRequest(format!("table {database}.{table} does not exist"))
        })
    }

    pub fn kafka_topics(&self) -> Vec<String> {
        fixtures::kafka_topics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::dtos::PipelineMetadata;
    use serde_json::json;
    use std::time::Duration;

    fn config(id: &str) -> PipelineConfig {
        PipelineConfig {
            pipeline_id: id.to_string(),
            name: format!("Pipeline {id}"),
            source: json!({ "type": "kafka", "topics": [{ "name": "user_events" }] }),
            sink: json!({ "type": "clickhouse", "table": "events" }),
            join: None,
            filter: None,
            stateless_transformation: None,
            schema: None,
            metadata: PipelineMetadata::default(),
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_runs() {
        let service = MockPipelineService::default();
        let id = service.create_pipeline(config("orders")).await.unwrap();

        assert_eq!(service.get_pipeline(&id).await.unwrap().status, PipelineStatus::Created);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        settle().await;

        assert_eq!(
            service.pipeline_health(&id).await.unwrap().overall_status,
            PipelineStatus::Running
        );
    }

    #[tokio::test]
    async fn second_pipeline_is_forbidden_while_one_is_active() {
        let service = MockPipelineService::new(TransitionDelays::immediate());
        service.create_pipeline(config("first")).await.unwrap();

        let error = service.create_pipeline(config("second")).await.unwrap_err();
        assert_eq!(error.status(), 403);
        assert!(error.to_string().contains("already running"));
    }

    #[tokio::test]
    async fn duplicate_id_is_forbidden() {
        let service = MockPipelineService::new(TransitionDelays::immediate()).allow_concurrent_pipelines();
        service.create_pipeline(config("orders")).await.unwrap();

        assert!(matches!(
            service.create_pipeline(config("orders")).await,
            Err(MockError::IdExists(_))
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_unprocessable() {
        let service = MockPipelineService::default();
        let mut bad = config("orders");
        bad.source = json!({});

        let error = service.create_pipeline(bad).await.unwrap_err();
        assert_eq!(error.status(), 422);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_goes_through_pausing() {
        let service = MockPipelineService::default();
        let id = service.create_pipeline(config("orders")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1001)).await;
        settle().await;

        let status = service.apply_action(&id, LifecycleAction::Pause).await.unwrap();
        assert_eq!(status, PipelineStatus::Pausing);

        tokio::time::sleep(Duration::from_millis(1501)).await;
        settle().await;
        assert_eq!(service.get_pipeline(&id).await.unwrap().status, PipelineStatus::Paused);
    }

    #[tokio::test]
    async fn guards_reject_disallowed_actions() {
        let service = MockPipelineService::default();
        let id = service.create_pipeline(config("orders")).await.unwrap();

        // Still Created, pausing is not an option yet.
        let error = service.apply_action(&id, LifecycleAction::Pause).await.unwrap_err();
        assert_eq!(error.status(), 400);
        assert_eq!(error.code(), "invalid_status_transition");

        service
            .store()
            .pipelines
            .write()
            .await
            .get_mut(&id)
            .unwrap()
            .status = PipelineStatus::Running;

        let error = service.edit_pipeline(&id, config("orders")).await.unwrap_err();
        assert_eq!(error.status(), 400);

        let error = service.delete_pipeline(&id).await.unwrap_err();
        assert!(error.to_string().contains("current status: Running"));
        assert_eq!(
            service.get_pipeline(&id).await.unwrap().status,
            PipelineStatus::Running
        );
    }

    #[tokio::test]
    async fn edit_and_delete_once_stopped() {
        let service = MockPipelineService::new(TransitionDelays::immediate());
        let id = service.create_pipeline(config("orders")).await.unwrap();

        service
            .store()
            .pipelines
            .write()
            .await
            .get_mut(&id)
            .unwrap()
            .status = PipelineStatus::Stopped;

        let mut edited = config("orders");
        edited.name = "Renamed by edit".to_string();
        service.edit_pipeline(&id, edited).await.unwrap();
        assert_eq!(service.get_pipeline(&id).await.unwrap().name, "Renamed by edit");

        service.delete_pipeline(&id).await.unwrap();
        assert!(matches!(
            service.get_pipeline(&id).await,
            Err(MockError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn dlq_consume_and_purge() {
        let service = MockPipelineService::new(TransitionDelays::immediate());
        let id = service.create_pipeline(config("orders")).await.unwrap();

        let batch = service.dlq_consume(&id, Some(2)).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(service.dlq_state(&id).await.unwrap().unconsumed_messages, 1);

        service.dlq_purge(&id).await.unwrap();
        assert_eq!(service.dlq_state(&id).await.unwrap().unconsumed_messages, 0);

        assert!(service.dlq_consume(&id, Some(1000)).await.is_err());
        assert!(service.dlq_state("missing").await.is_err());
    }

    #[tokio::test]
    async fn notifications_can_be_read_and_deleted() {
        let service = MockPipelineService::default();
        let unread = service
            .list_notifications(&NotificationQuery {
                pipeline_id: None,
                unread_only: Some(true),
            })
            .await;
        assert_eq!(unread.len(), 1);

        let ids = vec![unread[0].notification_id.clone()];
        assert_eq!(service.mark_notifications_read(&ids).await, 1);
        assert_eq!(service.mark_notifications_read(&ids).await, 0);

        service.delete_notification(&ids[0]).await.unwrap();
        assert!(service.get_notification(&ids[0]).await.is_err());
    }

    #[test]
    fn transform_type_is_checked() {
        let service = MockPipelineService::default();
        let request = TransformEvaluationRequest {
            kind: "jq".to_string(),
            config: Default::default(),
            sample: json!({}),
        };
        assert!(matches!(
            service.evaluate_transform(&request),
            Err(MockError::InvalidTransformationType)
        ));
    }
}
