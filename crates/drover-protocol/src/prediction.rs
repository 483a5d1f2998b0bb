//! Deployment-outcome prediction contract.

use serde::{Deserialize, Serialize};

/// Structured input for the prediction entry point.
///
/// `hour_of_day` and `day_of_week` default to the current UTC time when
/// absent. `day_of_week` is Sunday-based (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub project_path: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub commit_files_count: u32,
    #[serde(default)]
    pub hour_of_day: Option<u32>,
    #[serde(default)]
    pub day_of_week: Option<u32>,
}

/// Predicted outcome for a deployment.
///
/// `failure_probability` is always clamped to at most 0.95 — the engine
/// never asserts certain failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Seconds, rounded.
    pub estimated_duration: u64,
    /// 0.0–0.95.
    pub failure_probability: f64,
    /// USD.
    pub estimated_cost: f64,
    /// 0.0–1.0.
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_ref_field_renamed() {
        let json = r#"{"projectPath": "acme/widgets", "ref": "main", "commitFilesCount": 12}"#;
        let input: PredictionInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.ref_name, "main");
        assert!(input.hour_of_day.is_none());
        assert!(input.day_of_week.is_none());
    }

    #[test]
    fn prediction_serializes_camel_case() {
        let p = Prediction {
            estimated_duration: 600,
            failure_probability: 0.1,
            estimated_cost: 0.04,
            confidence: 0.8,
            risk_factors: vec![],
            recommendations: vec![],
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""estimatedDuration":600"#));
        assert!(json.contains(r#""failureProbability":0.1"#));
    }
}
