//! Status reports.

use serde::{Deserialize, Serialize};
use terraport_core::Outputs;

/// What `status` can say about a deployment.
///
/// Without an outputs artifact there is no way to tell a run still in
/// progress from one that failed before publishing, so both are reported
/// as [`StatusReport::PendingOrFailed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StatusReport {
    /// No outputs have been published.
    PendingOrFailed,
    /// Outputs were published by a successful run.
    Success {
        /// Rendered output summary.
        summary: String,
        /// Outputs by name.
        outputs: Outputs,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use terraport_core::{render_summary, OutputValue};

    #[test]
    fn wire_format() {
        assert_eq!(
            serde_json::to_value(StatusReport::PendingOrFailed).unwrap(),
            json!({"status": "pending-or-failed"})
        );

        let mut outputs = Outputs::new();
        outputs.insert("region".to_owned(), OutputValue::new("us-east-1"));
        let report = StatusReport::Success {
            summary: render_summary(&outputs),
            outputs,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["outputs"]["region"]["value"], "us-east-1");
        assert!(value["summary"]
            .as_str()
            .unwrap()
            .ends_with("region : us-east-1"));
    }
}
