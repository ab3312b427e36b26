use chrono::Utc;
use domain::dtos::{NotificationSeverity, PipelineStatus};
use domain::lifecycle::validate_transition;
use domain::LifecycleAction;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::MockStore;

#[derive(Debug, Clone)]
pub struct TransitionDelays {
    pub start: Duration,
    pub pause: Duration,
    pub resume: Duration,
    pub stop: Duration,
    pub terminate: Duration,
}

impl Default for TransitionDelays {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(1000),
            pause: Duration::from_millis(1500),
            resume: Duration::from_millis(1500),
            stop: Duration::from_millis(2000),
            terminate: Duration::from_millis(2000),
        }
    }
}

impl TransitionDelays {
    pub fn immediate() -> Self {
        Self {
            start: Duration::ZERO,
            pause: Duration::ZERO,
            resume: Duration::ZERO,
            stop: Duration::ZERO,
            terminate: Duration::ZERO,
        }
    }

    pub fn for_action(&self, action: LifecycleAction) -> Duration {
        match action {
            LifecycleAction::Pause => self.pause,
            LifecycleAction::Resume => self.resume,
            LifecycleAction::Stop => self.stop,
            LifecycleAction::Terminate => self.terminate,
        }
    }
}

/// Schedules the delayed half of every lifecycle action so the UI sees the
/// in-between status for a while.
#[derive(Clone)]
pub struct LifecycleSimulator {
    store: Arc<MockStore>,
}

impl LifecycleSimulator {
    pub fn new(store: Arc<MockStore>) -> Self {
        Self { store }
    }

    /// One-shot `from -> to` change after `delay`. Resolves to `true` when
    /// the change was applied; a pipeline that moved on (or vanished) in the
    /// meantime is left alone.
    pub fn simulate_transition(
        &self,
        pipeline_id: &str,
        from: PipelineStatus,
        to: PipelineStatus,
        delay: Duration,
    ) -> JoinHandle<bool> {
        let store = self.store.clone();
        let pipeline_id = pipeline_id.to_string();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            apply_transition(&store, &pipeline_id, from, to).await
        })
    }
}

pub async fn apply_transition(
    store: &MockStore,
    pipeline_id: &str,
    from: PipelineStatus,
    to: PipelineStatus,
) -> bool {
    if let Err(error) = validate_transition(from, to) {
        warn!("Refusing simulated transition for {pipeline_id}: {error}");
        return false;
    }

    {
        let mut pipelines = store.pipelines.write().await;

        let Some(pipeline) = pipelines.get_mut(pipeline_id) else {
            debug!("Pipeline {pipeline_id} is gone, dropping {from} -> {to}");
            return false;
        };

        if pipeline.status != from {
            debug!(
                "Pipeline {pipeline_id} is {} now, dropping stale {from} -> {to}",
                pipeline.status
            );
            return false;
        }

        pipeline.status = to;
        pipeline.updated_at = Utc::now();
    }

    info!("Pipeline {pipeline_id} transitioned {from} -> {to}");

    let severity = if to.is_failed() {
        NotificationSeverity::Error
    } else {
        NotificationSeverity::Info
    };

    store
        .notify(
            Some(pipeline_id),
            severity,
            format!("Pipeline {to}"),
            format!("Pipeline {pipeline_id} is now {to}"),
        )
        .await;

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::dtos::{Pipeline, PipelineConfig, PipelineMetadata};
    use serde_json::json;

    async fn store_with(status: PipelineStatus) -> Arc<MockStore> {
        let store = Arc::new(MockStore::new());
        let config = PipelineConfig {
            pipeline_id: "orders".to_string(),
            name: "Orders".to_string(),
            source: json!({ "topics": [{ "name": "orders" }] }),
            sink: json!({}),
            join: None,
            filter: None,
            stateless_transformation: None,
            schema: None,
            metadata: PipelineMetadata::default(),
        };
        store.pipelines.write().await.insert(
            "orders".to_string(),
            Pipeline::from_config(config, status, Utc::now()),
        );
        store
    }

    async fn status_of(store: &MockStore) -> PipelineStatus {
        store.pipelines.read().await["orders"].status
    }

    #[tokio::test(start_paused = true)]
    async fn applies_after_delay() {
        let store = store_with(PipelineStatus::Pausing).await;
        let simulator = LifecycleSimulator::new(store.clone());

        let handle = simulator.simulate_transition(
            "orders",
            PipelineStatus::Pausing,
            PipelineStatus::Paused,
            Duration::from_millis(1500),
        );

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(status_of(&store).await, PipelineStatus::Pausing);

        assert!(handle.await.unwrap());
        assert_eq!(status_of(&store).await, PipelineStatus::Paused);
        assert_eq!(store.notifications.read().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_clobber() {
        let store = store_with(PipelineStatus::Pausing).await;
        let simulator = LifecycleSimulator::new(store.clone());

        let handle = simulator.simulate_transition(
            "orders",
            PipelineStatus::Pausing,
            PipelineStatus::Paused,
            Duration::from_millis(1500),
        );

        store.pipelines.write().await.get_mut("orders").unwrap().status =
            PipelineStatus::Terminating;

        assert!(!handle.await.unwrap());
        assert_eq!(status_of(&store).await, PipelineStatus::Terminating);
    }

    #[tokio::test]
    async fn refuses_edges_outside_the_state_machine() {
        let store = store_with(PipelineStatus::Stopped).await;
        assert!(
            !apply_transition(&store, "orders", PipelineStatus::Stopped, PipelineStatus::Running)
                .await
        );
        assert_eq!(status_of(&store).await, PipelineStatus::Stopped);
    }
}
