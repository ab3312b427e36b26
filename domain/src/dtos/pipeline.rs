use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PipelineStatus;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Wizard output. Stage configurations are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub pipeline_id: String,
    pub name: String,
    pub source: Value,
    pub sink: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateless_transformation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default)]
    pub metadata: PipelineMetadata,
}

impl PipelineConfig {
    /// Structural checks the wizard is expected to have enforced already.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("pipeline name must not be empty".to_string());
        }

        let topics = self
            .source
            .get("topics")
            .and_then(Value::as_array)
            .ok_or_else(|| "source.topics must be an array".to_string())?;

        if topics.is_empty() {
            return Err("source must declare at least one topic".to_string());
        }

        if topics.len() > 2 {
            return Err("pipeline can have a maximum of 2 sources and 1 sink".to_string());
        }

        if !self.sink.is_object() {
            return Err("sink must be an object".to_string());
        }

        let join_enabled = self
            .join
            .as_ref()
            .and_then(|join| join.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if join_enabled && topics.len() != 2 {
            return Err("join requires exactly 2 source topics".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub pipeline_id: String,
    pub name: String,
    pub status: PipelineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source: Value,
    pub sink: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateless_transformation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default)]
    pub metadata: PipelineMetadata,
}

impl Pipeline {
    pub fn from_config(config: PipelineConfig, status: PipelineStatus, now: DateTime<Utc>) -> Self {
        Self {
            pipeline_id: config.pipeline_id,
            name: config.name,
            status,
            created_at: now,
            updated_at: now,
            source: config.source,
            sink: config.sink,
            join: config.join,
            filter: config.filter,
            stateless_transformation: config.stateless_transformation,
            schema: config.schema,
            metadata: config.metadata,
        }
    }

    pub fn apply_config(&mut self, config: PipelineConfig, now: DateTime<Utc>) {
        self.name = config.name;
        self.source = config.source;
        self.sink = config.sink;
        self.join = config.join;
        self.filter = config.filter;
        self.stateless_transformation = config.stateless_transformation;
        self.schema = config.schema;
        self.metadata = config.metadata;
        self.updated_at = now;
    }

    pub fn list_item(&self) -> PipelineListItem {
        PipelineListItem {
            pipeline_id: self.pipeline_id.clone(),
            name: self.name.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineListItem {
    pub pipeline_id: String,
    pub name: String,
    pub status: PipelineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePipelineNameParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePipelineResponse {
    pub success: bool,
    pub pipeline_id: String,
    pub status: String,
}

impl CreatePipelineResponse {
    pub fn active(pipeline_id: impl Into<String>) -> Self {
        Self {
            success: true,
            pipeline_id: pipeline_id.into(),
            status: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineActionResponse {
    pub success: bool,
    pub pipeline_id: String,
    pub status: PipelineStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminateAllResponse {
    pub success: bool,
    pub terminated: Vec<String>,
}
