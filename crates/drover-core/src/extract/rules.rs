//! Deterministic keyword classifier — the tier of last resort.
//!
//! Pure substring matching over the lower-cased command. The keyword
//! chain is strictly ordered because commands routinely contain more
//! than one trigger word ("fix the failed deploy" must hit the deploy
//! branch, not the fix branch). Reordering the chain changes behavior.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use drover_protocol::commands::{Entities, ExtractionResult, Intent};

use super::{ExtractEngine, ExtractError, RULES_CONFIDENCE};

/// Explicit `branch <name>` mention.
static RE_BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)branch\s+(\S+)").unwrap());

/// Feature-branch-shaped token (`feature-x`, `feature/login`, ...).
/// Matched whole so the slot keeps the full branch name.
static RE_FEATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)feature[-/]?[\w./-]+").unwrap());

/// Classify a command without any I/O. Always succeeds.
pub fn classify(text: &str) -> (Intent, Entities) {
    let lower = text.to_lowercase();

    let mut entities = Entities::default();

    if let Some(caps) = RE_BRANCH.captures(text) {
        entities.branch = Some(caps[1].to_string());
    } else if let Some(m) = RE_FEATURE.find(text) {
        entities.branch = Some(m.as_str().to_string());
    }

    if lower.contains("staging") {
        entities.environment = Some("staging".into());
    } else if lower.contains("production") {
        entities.environment = Some("production".into());
    } else if lower.contains("dev") {
        entities.environment = Some("dev".into());
    }

    if lower.contains("last week") {
        entities.time_range = Some("last_7_days".into());
    } else if lower.contains("last month") {
        entities.time_range = Some("last_30_days".into());
    } else if lower.contains("today") {
        entities.time_range = Some("today".into());
    }

    // First match wins. Order is load-bearing.
    let intent = if lower.contains("deploy") {
        Intent::DeployRequest
    } else if lower.contains("status") {
        Intent::StatusCheck
    } else if lower.contains("create") && lower.contains("pipeline") {
        Intent::PipelineCreate
    } else if lower.contains("rollback") {
        Intent::RollbackRequest
    } else if lower.contains("optimize") || lower.contains("slow") {
        Intent::OptimizationRequest
    } else if lower.contains("cost") || lower.contains("expensive") {
        Intent::CostAnalysis
    } else if lower.contains("performance") || lower.contains("report") {
        Intent::PerformanceReport
    } else if lower.contains("fix") || lower.contains("failed") {
        Intent::AutoFix
    } else if lower.contains("schedule") {
        Intent::ScheduleDeployment
    } else if lower.contains("help") {
        Intent::HelpRequest
    } else {
        Intent::Unknown
    };

    (intent, entities)
}

/// [`ExtractEngine`] wrapper around [`classify`]. Infallible.
pub struct RulesClassifier;

#[async_trait]
impl ExtractEngine for RulesClassifier {
    async fn extract(
        &self,
        text: &str,
        _context: Option<&str>,
    ) -> Result<ExtractionResult, ExtractError> {
        let (intent, entities) = classify(text);
        Ok(ExtractionResult {
            intent,
            entities,
            confidence: RULES_CONFIDENCE,
        })
    }

    fn tier_name(&self) -> &str {
        "rules"
    }
}
