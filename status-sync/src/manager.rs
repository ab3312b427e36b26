use domain::dtos::PipelineStatus;
use domain::LifecycleAction;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::cache::{StatusCache, StatusEntry, StatusNotification};
use crate::config::SyncConfig;
use crate::reconciler::Reconciler;
use crate::transport::{HealthSource, TransportAdapter, TransportMode, TransportUpdate};

const MIN_EXPIRY_PERIOD: Duration = Duration::from_millis(100);

/// Keeps a live status view for a set of pipelines.
///
/// ```rust,ignore
/// let source = Arc::new(HttpHealthSource::new("http://localhost:8080"));
/// let sync = StatusSync::start(source, SyncConfig::default(), ["orders".to_string()]);
///
/// let mut notifications = sync.subscribe();
/// sync.report_action("orders", LifecycleAction::Pause);
/// while let Ok(notification) = notifications.recv().await {
///     println!("{notification:?}");
/// }
/// ```
pub struct StatusSync {
    adapter: TransportAdapter,
    cache: Arc<StatusCache>,
    reconciler: Arc<Reconciler>,
    watched: Arc<RwLock<HashSet<String>>>,
    pump: JoinHandle<()>,
}

impl StatusSync {
    pub fn start(
        source: Arc<dyn HealthSource>,
        config: SyncConfig,
        pipeline_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let cache = Arc::new(StatusCache::new());
        let reconciler = Arc::new(Reconciler::new(cache.clone(), config.optimistic_ttl));
        let pipeline_ids: HashSet<String> = pipeline_ids.into_iter().collect();
        let watched = Arc::new(RwLock::new(pipeline_ids.clone()));
        let (adapter, updates) = TransportAdapter::spawn(source, config.transport, pipeline_ids);

        let pump = tokio::spawn(pump(reconciler.clone(), watched.clone(), updates));

        Self {
            adapter,
            cache,
            reconciler,
            watched,
            pump,
        }
    }

    pub fn watch(&self, pipeline_id: impl Into<String>) {
        let pipeline_id = pipeline_id.into();
        self.watched
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pipeline_id.clone());
        self.adapter.watch(pipeline_id);
    }

    /// Stops tracking the id and drops its cache entry. Updates for it that
    /// are still queued are discarded by the pump.
    pub fn unwatch(&self, pipeline_id: &str) {
        let mut watched = self.watched.write().unwrap_or_else(PoisonError::into_inner);
        watched.remove(pipeline_id);
        self.adapter.unwatch(pipeline_id);
        self.cache.remove(pipeline_id);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusNotification> {
        self.cache.subscribe()
    }

    pub fn status(&self, pipeline_id: &str) -> Option<PipelineStatus> {
        self.cache.status(pipeline_id)
    }

    pub fn entry(&self, pipeline_id: &str) -> Option<StatusEntry> {
        self.cache.get(pipeline_id)
    }

    pub fn mode(&self) -> TransportMode {
        self.adapter.mode()
    }

    pub fn report_optimistic_update(&self, pipeline_id: &str, status: PipelineStatus) {
        self.reconciler.report_optimistic_update(pipeline_id, status);
    }

    /// Shorthand for reporting the in-between status of a user action.
    pub fn report_action(&self, pipeline_id: &str, action: LifecycleAction) {
        self.reconciler
            .report_optimistic_update(pipeline_id, action.optimistic_status());
    }

    pub fn revert_optimistic_update(&self, pipeline_id: &str) {
        self.reconciler.revert_optimistic_update(pipeline_id);
    }

    pub fn shutdown(&self) {
        self.adapter.shutdown();
        self.pump.abort();
    }
}

impl Drop for StatusSync {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn tick(expiry: &mut Option<Interval>) {
    match expiry {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn pump(
    reconciler: Arc<Reconciler>,
    watched: Arc<RwLock<HashSet<String>>>,
    mut updates: mpsc::UnboundedReceiver<TransportUpdate>,
) {
    let mut expiry = reconciler.optimistic_ttl().map(|ttl| {
        let mut interval = tokio::time::interval((ttl / 2).max(MIN_EXPIRY_PERIOD));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };

                // Held while applying so an unwatch cannot slip in between.
                let watched = watched.read().unwrap_or_else(PoisonError::into_inner);
                match update {
                    TransportUpdate::Status { pipeline_id, status } => {
                        if watched.contains(&pipeline_id) {
                            reconciler.apply_confirmed(&pipeline_id, status);
                        }
                    }
                    TransportUpdate::Failed { pipeline_id, error } => {
                        if watched.contains(&pipeline_id) {
                            reconciler.record_failure(&pipeline_id, error);
                        }
                    }
                }
            }
            () = tick(&mut expiry) => {
                reconciler.expire_stale();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::dtos::ApiErrorBody;

    #[tokio::test]
    async fn queued_updates_for_unwatched_ids_are_dropped() {
        let cache = Arc::new(StatusCache::new());
        let reconciler = Arc::new(Reconciler::new(cache.clone(), None));
        let watched = Arc::new(RwLock::new(HashSet::from(["orders".to_string()])));
        let mut notifications = cache.subscribe();

        let (updates, update_rx) = mpsc::unbounded_channel();
        updates
            .send(TransportUpdate::Status {
                pipeline_id: "gone".to_string(),
                status: PipelineStatus::Running,
            })
            .unwrap();
        updates
            .send(TransportUpdate::Failed {
                pipeline_id: "gone".to_string(),
                error: ApiErrorBody::new(404, "not found"),
            })
            .unwrap();
        updates
            .send(TransportUpdate::Status {
                pipeline_id: "orders".to_string(),
                status: PipelineStatus::Paused,
            })
            .unwrap();
        drop(updates);

        pump(reconciler, watched, update_rx).await;

        assert!(cache.get("gone").is_none());
        assert_eq!(cache.status("orders"), Some(PipelineStatus::Paused));

        assert_eq!(
            notifications.try_recv().unwrap(),
            StatusNotification::Changed {
                pipeline_id: "orders".to_string(),
                status: Some(PipelineStatus::Paused),
                optimistic: false,
            }
        );
        assert!(notifications.try_recv().is_err());
    }
}
