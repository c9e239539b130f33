//! Provisioning results and output summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message attached to a successful run.
pub const SUCCESS_MESSAGE: &str = "Deployment completed successfully.";

/// Message attached to a run whose provisioning tool failed.
pub const TOOL_FAILURE_MESSAGE: &str = "Terraform execution failed.";

/// Outputs keyed by output name, in name order.
pub type Outputs = BTreeMap<String, OutputValue>;

/// A single declared output as reported by the provisioning tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputValue {
    /// The output's value.
    #[serde(default)]
    pub value: Value,
    /// The output's declared type, if reported.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<Value>,
    /// Whether the output was declared sensitive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
}

impl OutputValue {
    /// Create an output holding a value with no type information.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            value_type: None,
            sensitive: None,
        }
    }
}

/// Final status of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// All stages completed.
    Success,
    /// A stage failed; `error` carries the diagnostic.
    Failed,
}

/// The single JSON object the runner prints to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningResult {
    /// Outcome of the run.
    pub status: ResultStatus,
    /// Short human-readable message.
    pub message: String,
    /// Rendered output summary (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Outputs by name. Only meaningful on success, but always present.
    #[serde(default)]
    pub outputs: Outputs,
    /// Raw diagnostic text (failure only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal problems encountered after provisioning succeeded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProvisioningResult {
    /// A successful result with a rendered summary.
    #[must_use]
    pub fn success(outputs: Outputs) -> Self {
        Self {
            status: ResultStatus::Success,
            message: SUCCESS_MESSAGE.to_owned(),
            summary: Some(render_summary(&outputs)),
            outputs,
            error: None,
            warnings: Vec::new(),
        }
    }

    /// A failed result.
    ///
    /// A failed result always carries a non-empty diagnostic; when `error`
    /// is blank the message is used in its place.
    #[must_use]
    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        let message = message.into();
        let error = error.into();
        let error = if error.trim().is_empty() {
            message.clone()
        } else {
            error
        };

        Self {
            status: ResultStatus::Failed,
            message,
            summary: None,
            outputs: Outputs::new(),
            error: Some(error),
            warnings: Vec::new(),
        }
    }

    /// Attach warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Returns true for a successful result.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Render the human-readable summary for a set of outputs.
///
/// ```text
/// Deployment Status : Success
/// Output Parameters :
/// region : us-east-1
/// ```
#[must_use]
pub fn render_summary(outputs: &Outputs) -> String {
    let mut summary = String::from("Deployment Status : Success\nOutput Parameters :\n");
    let lines: Vec<String> = outputs
        .iter()
        .map(|(name, output)| format!("{name} : {}", render_value(&output.value)))
        .collect();
    summary.push_str(&lines.join("\n"));
    summary
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_owned(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
