use domain::dtos::{ApiErrorBody, PipelineStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{OptimisticStatus, StatusCache, StatusNotification};

/// Merges statuses guessed from user actions with statuses the backend
/// confirms.
pub struct Reconciler {
    cache: Arc<StatusCache>,
    optimistic_ttl: Option<Duration>,
}

impl Reconciler {
    pub fn new(cache: Arc<StatusCache>, optimistic_ttl: Option<Duration>) -> Self {
        Self {
            cache,
            optimistic_ttl,
        }
    }

    pub fn optimistic_ttl(&self) -> Option<Duration> {
        self.optimistic_ttl
    }

    /// Shows `status` for the pipeline right away, until the backend
    /// confirms something.
    pub fn report_optimistic_update(&self, pipeline_id: &str, status: PipelineStatus) {
        debug!("Optimistic status for {pipeline_id}: {status}");

        self.cache.update(pipeline_id, |entry| {
            entry.optimistic = Some(OptimisticStatus {
                status,
                set_at: Instant::now(),
            });
        });
    }

    /// Drops the override, e.g. when the action it stood for was rejected.
    pub fn revert_optimistic_update(&self, pipeline_id: &str) {
        debug!("Reverting optimistic status for {pipeline_id}");

        self.cache.update(pipeline_id, |entry| entry.optimistic = None);
    }

    /// The latest confirmed status wins and clears any override.
    pub fn apply_confirmed(&self, pipeline_id: &str, status: PipelineStatus) {
        self.cache.update(pipeline_id, |entry| {
            entry.confirmed = Some(status);
            entry.optimistic = None;
            entry.error = None;
        });
    }

    pub fn record_failure(&self, pipeline_id: &str, error: ApiErrorBody) {
        info!("Status of {pipeline_id} is unavailable: {error}");

        self.cache
            .update(pipeline_id, |entry| entry.error = Some(error.clone()));
        self.cache.notify(StatusNotification::Failed {
            pipeline_id: pipeline_id.to_string(),
            error,
        });
    }

    /// Drops overrides older than the configured TTL and returns their ids.
    /// Without a TTL nothing ever expires.
    pub fn expire_stale(&self) -> Vec<String> {
        let Some(ttl) = self.optimistic_ttl else {
            return Vec::new();
        };

        let stale = self.cache.optimistic_older_than(ttl);
        for pipeline_id in &stale {
            debug!("Optimistic status for {pipeline_id} expired");

            self.cache.update(pipeline_id, |entry| {
                if entry
                    .optimistic
                    .is_some_and(|optimistic| optimistic.set_at.elapsed() >= ttl)
                {
                    entry.optimistic = None;
                }
            });
        }

        stale
    }
}
