use chrono::{DateTime, Utc};
use domain::dtos::{ApiErrorBody, PipelineStatus};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

const NOTIFICATION_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticStatus {
    pub status: PipelineStatus,
    pub set_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub confirmed: Option<PipelineStatus>,
    pub optimistic: Option<OptimisticStatus>,
    pub error: Option<ApiErrorBody>,
    pub updated_at: DateTime<Utc>,
}

impl StatusEntry {
    fn empty() -> Self {
        Self {
            confirmed: None,
            optimistic: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// What subscribers should display: the override while one is pending,
    /// the confirmed status otherwise.
    pub fn effective(&self) -> Option<PipelineStatus> {
        self.optimistic
            .map(|optimistic| optimistic.status)
            .or(self.confirmed)
    }

    pub fn is_optimistic(&self) -> bool {
        self.optimistic.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusNotification {
    Changed {
        pipeline_id: String,
        status: Option<PipelineStatus>,
        optimistic: bool,
    },
    Failed {
        pipeline_id: String,
        error: ApiErrorBody,
    },
}

/// Last known status per pipeline. The map lock is never held across an
/// await; subscribers hear about changes through a broadcast channel.
pub struct StatusCache {
    entries: RwLock<HashMap<String, StatusEntry>>,
    notifier: broadcast::Sender<StatusNotification>,
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCache {
    pub fn new() -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            entries: RwLock::new(HashMap::new()),
            notifier,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusNotification> {
        self.notifier.subscribe()
    }

    pub fn get(&self, pipeline_id: &str) -> Option<StatusEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pipeline_id)
            .cloned()
    }

    pub fn status(&self, pipeline_id: &str) -> Option<PipelineStatus> {
        self.get(pipeline_id).and_then(|entry| entry.effective())
    }

    pub fn snapshot(&self) -> HashMap<String, PipelineStatus> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|(pipeline_id, entry)| {
                entry.effective().map(|status| (pipeline_id.clone(), status))
            })
            .collect()
    }

    pub fn remove(&self, pipeline_id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pipeline_id);
    }

    /// Ids whose optimistic override is at least `ttl` old.
    pub fn optimistic_older_than(&self, ttl: Duration) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| {
                entry
                    .optimistic
                    .is_some_and(|optimistic| optimistic.set_at.elapsed() >= ttl)
            })
            .map(|(pipeline_id, _)| pipeline_id.clone())
            .collect()
    }

    /// Runs `update` on the entry for `pipeline_id` (creating it if needed)
    /// and notifies subscribers when what they see has changed.
    pub fn update(&self, pipeline_id: &str, update: impl FnOnce(&mut StatusEntry)) {
        let notification = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let entry = entries
                .entry(pipeline_id.to_string())
                .or_insert_with(StatusEntry::empty);

            let before = (entry.effective(), entry.is_optimistic());
            update(entry);
            entry.updated_at = Utc::now();
            let after = (entry.effective(), entry.is_optimistic());

            (before != after).then(|| StatusNotification::Changed {
                pipeline_id: pipeline_id.to_string(),
                status: after.0,
                optimistic: after.1,
            })
        };

        if let Some(notification) = notification {
            self.notify(notification);
        }
    }

    pub fn notify(&self, notification: StatusNotification) {
        if self.notifier.send(notification).is_err() {
            debug!("No status subscribers");
        }
    }
}
