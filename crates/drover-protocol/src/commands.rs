use serde::{Deserialize, Serialize};

/// Closed set of command intents the companion understands.
///
/// Produced exactly once per command by the intent extractor and
/// consumed exactly once by the dispatcher. Wire tags are the
/// SCREAMING_SNAKE names the chat frontend already speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    DeployRequest,
    StatusCheck,
    RollbackRequest,
    OptimizationRequest,
    PipelineCreate,
    CostAnalysis,
    PerformanceReport,
    AutoFix,
    ScheduleDeployment,
    HelpRequest,
    #[default]
    Unknown,
}

impl Intent {
    /// All intents a generative extractor is allowed to emit.
    pub const ALL: [Intent; 11] = [
        Intent::DeployRequest,
        Intent::StatusCheck,
        Intent::RollbackRequest,
        Intent::OptimizationRequest,
        Intent::PipelineCreate,
        Intent::CostAnalysis,
        Intent::PerformanceReport,
        Intent::AutoFix,
        Intent::ScheduleDeployment,
        Intent::HelpRequest,
        Intent::Unknown,
    ];

    /// Wire tag for this intent (e.g. `DEPLOY_REQUEST`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::DeployRequest => "DEPLOY_REQUEST",
            Intent::StatusCheck => "STATUS_CHECK",
            Intent::RollbackRequest => "ROLLBACK_REQUEST",
            Intent::OptimizationRequest => "OPTIMIZATION_REQUEST",
            Intent::PipelineCreate => "PIPELINE_CREATE",
            Intent::CostAnalysis => "COST_ANALYSIS",
            Intent::PerformanceReport => "PERFORMANCE_REPORT",
            Intent::AutoFix => "AUTO_FIX",
            Intent::ScheduleDeployment => "SCHEDULE_DEPLOYMENT",
            Intent::HelpRequest => "HELP_REQUEST",
            Intent::Unknown => "UNKNOWN",
        }
    }

    /// Look up an intent by its wire tag. Used to validate model output;
    /// anything outside the closed set is `None`, never coerced.
    pub fn from_name(name: &str) -> Option<Intent> {
        Intent::ALL.iter().copied().find(|i| i.as_str() == name)
    }
}

/// Entity slots extracted from a command.
///
/// Every slot is always present in the serialized form (`null` when the
/// command didn't mention it) — downstream consumers may index any key
/// without an existence check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entities {
    pub project: Option<String>,
    pub branch: Option<String>,
    pub environment: Option<String>,
    pub job_id: Option<String>,
    pub time_range: Option<String>,
    pub time: Option<String>,
}

/// Output of the intent extractor: classification plus slots.
///
/// `confidence` is informational only — it is a fixed constant per
/// extraction tier and dispatch never branches on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub intent: Intent,
    pub entities: Entities,
    pub confidence: f64,
}

/// Normalized response returned for every processed command.
///
/// Invariant: `executed == true` means the described side effect was
/// attempted against a real collaborator and did not itself error;
/// `false` means validation failure, collaborator error, or a
/// deliberately unimplemented action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub intent: Intent,
    /// Free-form outcome tag (e.g. `pipeline_triggered`, `error`).
    pub action: String,
    /// Human-readable summary shown in the chat UI.
    pub message: String,
    /// Serialized JSON payload for the frontend, when there is one.
    pub data: Option<String>,
    pub executed: bool,
}
