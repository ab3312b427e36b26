use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PipelineStatus;

pub const STATUS_UPDATE_EVENT: &str = "status_update";
pub const BATCH_UPDATE_EVENT: &str = "batch_update";
pub const HEARTBEAT_EVENT: &str = "heartbeat";
pub const ERROR_EVENT: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<PipelineStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    pub pipeline_id: String,
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<PipelineStatus>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdatePayload {
    pub updates: Vec<StatusChange>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    pub code: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One `event:`/`data:` block of the status stream. The event name selects
/// the variant, the data line carries the payload as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusStreamEvent {
    StatusUpdate(StatusUpdatePayload),
    BatchUpdate(BatchUpdatePayload),
    Heartbeat(HeartbeatPayload),
    Error(StreamErrorPayload),
}

#[derive(Debug, thiserror::Error)]
pub enum StatusStreamEventError {
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl StatusStreamEvent {
    /// Collapses a tick's worth of changes into the event the stream emits.
    pub fn from_changes(mut changes: Vec<StatusChange>, timestamp: DateTime<Utc>) -> Option<Self> {
        match changes.len() {
            0 => None,
            1 => changes.pop().map(|change| {
                StatusStreamEvent::StatusUpdate(StatusUpdatePayload {
                    pipeline_id: change.pipeline_id,
                    status: change.status,
                    previous_status: change.previous_status,
                    timestamp,
                })
            }),
            _ => Some(StatusStreamEvent::BatchUpdate(BatchUpdatePayload {
                updates: changes,
                timestamp,
            })),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            StatusStreamEvent::StatusUpdate(_) => STATUS_UPDATE_EVENT,
            StatusStreamEvent::BatchUpdate(_) => BATCH_UPDATE_EVENT,
            StatusStreamEvent::Heartbeat(_) => HEARTBEAT_EVENT,
            StatusStreamEvent::Error(_) => ERROR_EVENT,
        }
    }

    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            StatusStreamEvent::StatusUpdate(payload) => serde_json::to_string(payload),
            StatusStreamEvent::BatchUpdate(payload) => serde_json::to_string(payload),
            StatusStreamEvent::Heartbeat(payload) => serde_json::to_string(payload),
            StatusStreamEvent::Error(payload) => serde_json::to_string(payload),
        }
    }

    pub fn parse(event: &str, data: &str) -> Result<Self, StatusStreamEventError> {
        let event = match event {
            STATUS_UPDATE_EVENT => {
                StatusStreamEvent::StatusUpdate(serde_json::from_str(data)?)
            }
            BATCH_UPDATE_EVENT => {
                StatusStreamEvent::BatchUpdate(serde_json::from_str(data)?)
            }
            HEARTBEAT_EVENT => {
                StatusStreamEvent::Heartbeat(serde_json::from_str(data)?)
            }
            ERROR_EVENT => {
                StatusStreamEvent::Error(serde_json::from_str(data)?)
            }
            other => return Err(StatusStreamEventError::UnknownEvent(other.to_string())),
        };

        Ok(event)
    }

    /// Status changes carried by this event, if any.
    pub fn changes(&self) -> Vec<StatusChange> {
        match self {
            StatusStreamEvent::StatusUpdate(payload) => vec![StatusChange {
                pipeline_id: payload.pipeline_id.clone(),
                status: payload.status,
                previous_status: payload.previous_status,
            }],
            StatusStreamEvent::BatchUpdate(payload) => payload.updates.clone(),
            StatusStreamEvent::Heartbeat(_) | StatusStreamEvent::Error(_) => Vec::new(),
        }
    }
}
