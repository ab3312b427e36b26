use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXPR_LANG_TRANSFORM: &str = "expr_lang_transform";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDataField {
    pub field_name: String,
    pub field_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterValidationRequest {
    pub expression: String,
    #[serde(default)]
    pub fields: Vec<StreamDataField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub expression: String,
    pub output_name: String,
    pub output_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub transform: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformEvaluationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: TransformConfig,
    pub sample: Value,
}
