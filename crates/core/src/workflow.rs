//! Workflow metadata and workflow-document validation for the editor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Metadata of one workflow as listed by `GET /api/workflows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default)]
    pub author: String,
}

/// Accept a string, a number or null (workflow files are hand-written and
/// `version` shows up as either).
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Prefix → metadata, ordered by prefix.
pub type WorkflowIndex = BTreeMap<String, WorkflowMeta>;

/// `{success, message}` acknowledgement returned by mutating admin
/// endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionResponse {
    /// The backend's explanation, preferring `message` over `error`.
    pub fn reason(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Parse workflow JSON typed into the editor.
///
/// The document must be a JSON object with a non-empty string `prefix`.
pub fn parse_workflow(text: &str) -> Result<serde_json::Value, CoreError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| CoreError::MalformedJson(e.to_string()))?;
    workflow_prefix(&value)?;
    Ok(value)
}

/// Pretty-print workflow JSON with two-space indentation.
pub fn format_workflow(text: &str) -> Result<String, CoreError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| CoreError::MalformedJson(e.to_string()))?;
    serde_json::to_string_pretty(&value).map_err(|e| CoreError::MalformedJson(e.to_string()))
}

/// The `prefix` of a workflow document.
pub fn workflow_prefix(workflow: &serde_json::Value) -> Result<&str, CoreError> {
    let obj = workflow
        .as_object()
        .ok_or_else(|| CoreError::Validation("Workflow must be a JSON object".into()))?;
    match obj.get("prefix") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        _ => Err(CoreError::Validation(
            "Workflow requires a non-empty string field 'prefix'".into(),
        )),
    }
}

/// Metadata view of a full workflow document.
pub fn workflow_meta(workflow: &serde_json::Value) -> WorkflowMeta {
    serde_json::from_value(workflow.clone()).unwrap_or_default()
}
