//! Shapes exchanged with the GitLab collaborator.

use serde::{Deserialize, Serialize};

/// A GitLab project as resolved from its full path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Full path, e.g. `acme/widgets`.
    pub path: String,
    pub name: String,
}

/// Summary of a pipeline as surfaced to the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub id: String,
    /// Project-scoped pipeline number — what humans see in the UI.
    pub iid: String,
    pub web_url: String,
    pub status: String,
}

/// CI variable passed along with a pipeline trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVariable {
    pub key: String,
    pub value: String,
}

impl PipelineVariable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of a pipeline trigger.
///
/// GitLab reports domain-level problems (unknown ref, missing CI config)
/// as `errors` on a successful transport call — `pipeline` is `None` in
/// that case and the errors must be surfaced verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerOutcome {
    pub pipeline: Option<PipelineSummary>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Latest pipeline status for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub status: String,
    pub message: String,
}

/// A failed CI job with enough context for failure analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJob {
    pub id: String,
    pub name: String,
    /// Trailing portion of the job log.
    pub log: String,
    /// The job's CI configuration, serialized.
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_outcome_with_domain_errors() {
        let json = r#"{"pipeline": null, "errors": ["branch not found"]}"#;
        let outcome: TriggerOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.pipeline.is_none());
        assert_eq!(outcome.errors, vec!["branch not found"]);
    }

    #[test]
    fn trigger_outcome_errors_default_empty() {
        let json = r#"{"pipeline": {"id": "1", "iid": "42", "webUrl": "https://gitlab.example/p/-/pipelines/1", "status": "pending"}}"#;
        let outcome: TriggerOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.pipeline.unwrap().iid, "42");
    }

    #[test]
    fn pipeline_summary_uses_camel_case() {
        let summary = PipelineSummary {
            id: "gid://gitlab/Ci::Pipeline/789".into(),
            iid: "12".into(),
            web_url: "https://gitlab.example/acme/widgets/-/pipelines/789".into(),
            status: "pending".into(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains(r#""webUrl""#));
    }
}
