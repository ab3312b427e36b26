use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PipelineStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineHealth {
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub overall_status: PipelineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
