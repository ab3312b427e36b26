use chrono::Utc;
use domain::dtos::{DlqMessage, DlqState, Notification, NotificationSeverity, Pipeline};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::fixtures;

/// Oldest notifications are dropped once the list grows past this.
pub const MAX_NOTIFICATIONS: usize = 500;

#[derive(Debug, Default)]
pub struct DlqQueue {
    pub messages: VecDeque<DlqMessage>,
    pub state: DlqState,
}

impl DlqQueue {
    pub fn seeded(messages: Vec<DlqMessage>) -> Self {
        let count = messages.len() as u64;
        Self {
            messages: messages.into(),
            state: DlqState {
                last_received_at: (count > 0).then(Utc::now),
                last_consumed_at: None,
                total_messages: count,
                unconsumed_messages: count,
            },
        }
    }

    pub fn consume(&mut self, batch_size: usize) -> Vec<DlqMessage> {
        let take = batch_size.min(self.messages.len());
        let batch: Vec<DlqMessage> = self.messages.drain(..take).collect();

        if !batch.is_empty() {
            self.state.last_consumed_at = Some(Utc::now());
            self.state.unconsumed_messages = self.messages.len() as u64;
        }

        batch
    }

    pub fn purge(&mut self) {
        self.messages.clear();
        self.state.unconsumed_messages = 0;
    }
}

/// Everything the mock backend knows, shared between the service and the
/// simulator's timers.
#[derive(Debug, Default)]
pub struct MockStore {
    pub pipelines: RwLock<HashMap<String, Pipeline>>,
    pub dlq: RwLock<HashMap<String, DlqQueue>>,
    pub notifications: RwLock<Vec<Notification>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixtures() -> Self {
        Self {
            notifications: RwLock::new(fixtures::notifications()),
            ..Self::default()
        }
    }

    pub async fn notify(
        &self,
        pipeline_id: Option<&str>,
        severity: NotificationSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        let mut notifications = self.notifications.write().await;
        notifications.push(Notification {
            notification_id: Uuid::new_v4().to_string(),
            pipeline_id: pipeline_id.map(str::to_string),
            severity,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        });

        let overflow = notifications.len().saturating_sub(MAX_NOTIFICATIONS);
        notifications.drain(..overflow);
    }
}
