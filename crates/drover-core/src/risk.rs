//! Deployment risk and cost scoring.
//!
//! The heuristic starts from historical aggregates (mean duration,
//! failure rate for the same hour/day bucket) and applies additive rule
//! adjustments. Every adjustment both perturbs the score and appends a
//! human-readable factor with a matching recommendation; all rules are
//! evaluated, never short-circuited. A trained model, when configured,
//! overrides duration and failure probability but the heuristic always
//! runs first so its factors and recommendations survive the override.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::sync::Arc;

use drover_protocol::analytics::{Anomaly, AnomalyKind, DeploymentWindow, Severity, TrendWeek};
use drover_protocol::prediction::{Prediction, PredictionInput};
use drover_warehouse::WarehouseClient;

/// Tunable adjustment constants. A policy value, not inline literals,
/// so the numbers can be recalibrated without touching scoring logic.
#[derive(Debug, Clone)]
pub struct RiskPolicy {
    /// Changed-files count above which a commit counts as large.
    pub large_change_threshold: u32,
    pub large_change_duration_factor: f64,
    pub large_change_failure_delta: f64,
    pub friday_failure_delta: f64,
    /// Hour of day (UTC) at or after which a deployment is "late".
    pub late_day_hour: u32,
    pub late_day_failure_delta: f64,
    /// Failure probability is never reported above this.
    pub failure_probability_cap: f64,
    /// USD per compute hour.
    pub compute_rate_per_hour: f64,
    /// Fixed USD overhead per pipeline.
    pub overhead_cost: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            large_change_threshold: 50,
            large_change_duration_factor: 1.5,
            large_change_failure_delta: 0.10,
            friday_failure_delta: 0.15,
            late_day_hour: 16,
            late_day_failure_delta: 0.10,
            failure_probability_cap: 0.95,
            compute_rate_per_hour: 0.10,
            overhead_cost: 0.02,
        }
    }
}

/// Scores from a trained model endpoint.
#[derive(Debug, Clone)]
pub struct ModelScores {
    pub duration_secs: f64,
    pub failure_probability: f64,
}

/// Optional trained-model override for the heuristic scores.
#[async_trait]
pub trait PredictionModel: Send + Sync {
    async fn predict(
        &self,
        input: &PredictionInput,
        historical_avg_duration: f64,
        historical_failure_rate: f64,
    ) -> anyhow::Result<ModelScores>;
}

/// Risk/cost scoring engine over the warehouse aggregates.
#[derive(Clone)]
pub struct RiskScoringEngine {
    warehouse: Arc<dyn WarehouseClient>,
    model: Option<Arc<dyn PredictionModel>>,
    policy: RiskPolicy,
}

impl RiskScoringEngine {
    pub fn new(warehouse: Arc<dyn WarehouseClient>) -> Self {
        Self {
            warehouse,
            model: None,
            policy: RiskPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn PredictionModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_policy(mut self, policy: RiskPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Score a deployment. Never fails: a warehouse that cannot answer
    /// yields the conservative default prediction.
    pub async fn score_deployment(&self, input: &PredictionInput) -> Prediction {
        let now = Utc::now();
        let hour = input.hour_of_day.unwrap_or_else(|| now.hour());
        let day = input
            .day_of_week
            .unwrap_or_else(|| now.weekday().num_days_from_sunday());

        let stats = match self
            .warehouse
            .get_average_duration(&input.project_path, &input.ref_name, 30)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "duration history unavailable");
                return default_prediction();
            }
        };

        let patterns = match self.warehouse.get_failure_patterns(&input.project_path).await {
            Ok(patterns) => patterns,
            Err(e) => {
                tracing::warn!(error = %e, "failure patterns unavailable");
                return default_prediction();
            }
        };

        let bucket = patterns
            .iter()
            .find(|p| p.hour_of_day == hour as i32 && p.day_of_week == day as i32);

        let historical_duration = stats.as_ref().map(|s| s.avg_duration_secs);
        let historical_rate = bucket.map(|b| b.failure_rate);

        let mut duration = historical_duration.unwrap_or(600.0);
        let mut failure_probability = historical_rate.map(|r| r / 100.0).unwrap_or(0.1);
        let mut confidence = match &stats {
            Some(s) if s.sample_size >= 10 => 0.8,
            Some(_) => 0.5,
            None => 0.3,
        };

        let mut risk_factors = Vec::new();
        let mut recommendations = Vec::new();

        if input.commit_files_count > self.policy.large_change_threshold {
            duration *= self.policy.large_change_duration_factor;
            failure_probability += self.policy.large_change_failure_delta;
            risk_factors.push("Large number of files changed".to_string());
            recommendations.push("Consider breaking into smaller commits".to_string());
        }

        if day == 5 {
            failure_probability += self.policy.friday_failure_delta;
            risk_factors
                .push("Friday deployment - historically higher failure rate".to_string());
            recommendations.push("Consider deploying on Monday-Thursday".to_string());
        }

        if hour >= self.policy.late_day_hour {
            failure_probability += self.policy.late_day_failure_delta;
            risk_factors.push("Late day deployment".to_string());
            recommendations
                .push("Deploy earlier in the day for better support coverage".to_string());
        }

        if day == 0 || day == 6 {
            // Factor only, no probability change.
            risk_factors.push("Weekend deployment - limited support available".to_string());
            recommendations.push("Schedule for business hours if possible".to_string());
        }

        if let Some(model) = &self.model {
            match model
                .predict(
                    input,
                    historical_duration.unwrap_or(0.0),
                    historical_rate.unwrap_or(0.0),
                )
                .await
            {
                Ok(scores) => {
                    duration = scores.duration_secs;
                    failure_probability = scores.failure_probability;
                    confidence = 0.9;
                }
                Err(e) => {
                    // Heuristic values stand; the override is best-effort.
                    tracing::warn!(error = %e, "trained model unavailable, keeping heuristic");
                }
            }
        }

        let cost =
            duration / 3600.0 * self.policy.compute_rate_per_hour + self.policy.overhead_cost;
        failure_probability = failure_probability.min(self.policy.failure_probability_cap);

        Prediction {
            estimated_duration: duration.round() as u64,
            failure_probability: round2(failure_probability),
            estimated_cost: round2(cost),
            confidence: round2(confidence),
            risk_factors,
            recommendations,
        }
    }

    /// Recommend a deployment window for a project.
    ///
    /// An explicit RFC 3339 `preferred_time` is honored as-is. Otherwise
    /// the historically safest hour/day bucket wins, and with no usable
    /// history the next 03:00 UTC maintenance window is suggested.
    pub async fn optimal_deployment_window(
        &self,
        project_path: &str,
        preferred_time: &str,
    ) -> DeploymentWindow {
        let now = Utc::now();

        if let Ok(requested) = DateTime::parse_from_rfc3339(preferred_time) {
            return DeploymentWindow {
                suggested_time: requested.with_timezone(&Utc),
                reason: "Requested deployment time".into(),
                traffic_impact: "medium".into(),
                success_probability: 90.0,
                estimated_rollback_mins: 5,
                alternative_times: vec![next_maintenance_window(now)],
            };
        }

        let patterns = match self.warehouse.get_failure_patterns(project_path).await {
            Ok(patterns) => patterns,
            Err(e) => {
                tracing::warn!(error = %e, "failure patterns unavailable, using maintenance window");
                Vec::new()
            }
        };

        let safest = patterns
            .iter()
            .min_by(|a, b| a.failure_rate.total_cmp(&b.failure_rate));

        match safest {
            Some(bucket) => DeploymentWindow {
                suggested_time: next_bucket_time(now, bucket.day_of_week, bucket.hour_of_day),
                reason: format!(
                    "Historically safest window ({:.0}% failure rate over {} runs)",
                    bucket.failure_rate, bucket.total_runs
                ),
                traffic_impact: "low".into(),
                success_probability: (100.0 - bucket.failure_rate).max(0.0),
                estimated_rollback_mins: 5,
                alternative_times: vec![next_maintenance_window(now)],
            },
            None => DeploymentWindow {
                suggested_time: next_maintenance_window(now),
                reason: "Low traffic period with high success rate".into(),
                traffic_impact: "low".into(),
                success_probability: 98.0,
                estimated_rollback_mins: 5,
                alternative_times: vec![],
            },
        }
    }
}

/// Conservative fallback when history cannot be read at all.
fn default_prediction() -> Prediction {
    Prediction {
        estimated_duration: 600,
        failure_probability: 0.1,
        estimated_cost: 0.10,
        confidence: 0.3,
        risk_factors: vec!["Unable to analyze historical data".into()],
        recommendations: vec!["Proceed with standard precautions".into()],
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Next 03:00 UTC after `now`.
fn next_maintenance_window(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(3, 0, 0)
        .unwrap_or_else(|| now.naive_utc())
        .and_utc();
    if today > now { today } else { today + Duration::days(1) }
}

/// Next occurrence of a Sunday-based day-of-week/hour bucket after `now`.
fn next_bucket_time(now: DateTime<Utc>, day_of_week: i32, hour_of_day: i32) -> DateTime<Utc> {
    let hour = hour_of_day.clamp(0, 23) as u32;
    for offset in 0..=7 {
        let date = now.date_naive() + Duration::days(offset);
        if date.weekday().num_days_from_sunday() as i32 != day_of_week.rem_euclid(7) {
            continue;
        }
        if let Some(candidate) = date.and_hms_opt(hour, 0, 0) {
            let candidate = candidate.and_utc();
            if candidate > now {
                return candidate;
            }
        }
    }
    next_maintenance_window(now)
}

/// Week-over-week anomalies in the trend rows: duration swings above
/// 50% and success-rate swings above 20 points.
pub fn detect_anomalies(trends: &[TrendWeek]) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for week in trends {
        if let Some(prev_duration) = week.prev_week_duration
            && prev_duration > 0.0
        {
            let change = (week.avg_duration_secs - prev_duration) / prev_duration;
            if change.abs() > 0.5 {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::Duration,
                    week: week.week,
                    change,
                    message: format!(
                        "Pipeline duration {} by {:.0}%",
                        if change > 0.0 { "increased" } else { "decreased" },
                        change.abs() * 100.0
                    ),
                    severity: if change.abs() > 1.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                });
            }
        }

        if let Some(prev_rate) = week.prev_week_success_rate {
            let change = week.success_rate - prev_rate;
            if change.abs() > 20.0 {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::SuccessRate,
                    week: week.week,
                    change,
                    message: format!(
                        "Success rate {} by {:.0}%",
                        if change < 0.0 { "dropped" } else { "improved" },
                        change.abs()
                    ),
                    severity: if change < -30.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                });
            }
        }
    }

    anomalies
}
