//! Shapes exchanged with the analytics warehouse and the generative
//! analysis collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Duration aggregate for a project/ref over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStats {
    pub avg_duration_secs: f64,
    pub sample_size: i64,
    pub stddev_duration: Option<f64>,
}

/// Historical failure rate for one hour-of-day/day-of-week bucket.
///
/// `day_of_week` is Sunday-based (0 = Sunday .. 6 = Saturday), matching
/// the warehouse schema. `failure_rate` is a percentage (0–100).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePattern {
    pub hour_of_day: i32,
    pub day_of_week: i32,
    pub total_runs: i64,
    pub failures: i64,
    pub failure_rate: f64,
}

/// Aggregate pipeline metrics for a reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub total_runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    /// Percentage, 0–100.
    pub success_rate: f64,
    pub avg_duration_mins: f64,
}

/// One week of trend data, with lag columns for week-over-week deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendWeek {
    pub week: DateTime<Utc>,
    pub total_runs: i64,
    pub avg_duration_secs: f64,
    /// Percentage, 0–100.
    pub success_rate: f64,
    pub avg_cost_usd: f64,
    pub prev_week_duration: Option<f64>,
    pub prev_week_success_rate: Option<f64>,
}

/// Free-text insights produced from metrics by the generative analyst.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrendInsights {
    pub insights: Vec<String>,
    pub anomalies: Vec<String>,
    pub bottlenecks: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Cost breakdown with projected savings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostAnalysis {
    pub current_cost: f64,
    pub potential_savings: f64,
    pub savings_percentage: f64,
    pub recommendations: Vec<String>,
    /// ROI horizon as a human-readable string (e.g. "2 months").
    pub roi: String,
}

impl Default for CostAnalysis {
    fn default() -> Self {
        Self {
            current_cost: 100.0,
            potential_savings: 40.0,
            savings_percentage: 40.0,
            recommendations: vec![
                "Enable advanced caching strategies".into(),
                "Use spot instances for non-critical jobs".into(),
                "Optimize Docker image layers".into(),
            ],
            roi: "2 months".into(),
        }
    }
}

/// Pipeline optimization analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationAnalysis {
    pub original_cost: f64,
    pub optimized_cost: f64,
    /// Percentage saved, 0–100.
    pub savings: f64,
    pub recommendations: Vec<String>,
}

impl Default for OptimizationAnalysis {
    fn default() -> Self {
        Self {
            original_cost: 100.0,
            optimized_cost: 40.0,
            savings: 60.0,
            recommendations: vec![
                "Use spot instances for non-critical jobs".into(),
                "Enable caching for dependencies".into(),
                "Parallelize test execution".into(),
                "Use smaller container images".into(),
            ],
        }
    }
}

/// Root-cause analysis and suggested fix for a failed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixSuggestion {
    pub root_cause: String,
    pub recommendation: String,
    /// Language tag for the fenced code block (defaults to yaml).
    pub language: Option<String>,
    pub code: String,
    /// Percentage, 0–100.
    pub confidence: f64,
}

impl Default for FixSuggestion {
    fn default() -> Self {
        Self {
            root_cause: "Unable to determine".into(),
            recommendation: "Check job logs for more details".into(),
            language: None,
            code: String::new(),
            confidence: 0.0,
        }
    }
}

/// Recommended deployment window with its risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentWindow {
    pub suggested_time: DateTime<Utc>,
    pub reason: String,
    /// low / medium / high.
    pub traffic_impact: String,
    /// Percentage, 0–100.
    pub success_probability: f64,
    pub estimated_rollback_mins: u32,
    pub alternative_times: Vec<DateTime<Utc>>,
}

/// A week-over-week anomaly detected in the trend data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub week: DateTime<Utc>,
    /// Relative change for durations, percentage-point delta for rates.
    pub change: f64,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Duration,
    SuccessRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}
