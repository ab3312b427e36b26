use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    pub severity: NotificationSeverity,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub unread_only: Option<bool>,
}

impl NotificationQuery {
    pub fn matches(&self, notification: &Notification) -> bool {
        if let Some(pipeline_id) = &self.pipeline_id {
            if notification.pipeline_id.as_ref() != Some(pipeline_id) {
                return false;
            }
        }

        !(self.unread_only.unwrap_or(false) && notification.read)
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(pipeline_id) = &self.pipeline_id {
            pairs.push(("pipeline_id", pipeline_id.clone()));
        }
        if let Some(unread_only) = self.unread_only {
            pairs.push(("unread_only", unread_only.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkNotificationsReadParams {
    pub notification_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkNotificationsReadResponse {
    pub success: bool,
    pub updated: usize,
}
