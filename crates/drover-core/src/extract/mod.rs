//! Intent/entity extraction from free-text commands.
//!
//! Two tiers behind one trait:
//! - **Generative** — prompts a text model with the closed intent set
//!   and parses its JSON answer. May fail in every way a remote model
//!   can.
//! - **Rules** — deterministic keyword classifier, pure, infallible.
//!
//! [`TieredExtractor`] composes them: generative first, rules on any
//! failure, so extraction as a whole never fails.

pub mod generative;
pub mod rules;
pub mod tiered;

use async_trait::async_trait;
use thiserror::Error;

use drover_protocol::commands::ExtractionResult;

/// Confidence reported for the generative tier. Fixed per path, never
/// derived from input features.
pub const GENERATIVE_CONFIDENCE: f64 = 0.85;

/// Confidence reported for the deterministic fallback tier.
pub const RULES_CONFIDENCE: f64 = 0.5;

/// Ways a fallible extraction tier can fail. The tiered extractor
/// treats every variant the same way: degrade to the next tier.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model call failed: {0}")]
    Model(#[from] anyhow::Error),

    #[error("no JSON object in model output")]
    NoJson,

    #[error("model output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("model returned intent outside the closed set: {0}")]
    UnknownIntent(String),
}

/// One extraction tier.
#[async_trait]
pub trait ExtractEngine: Send + Sync {
    /// Classify `text` (with optional caller context, e.g. the active
    /// project path) into an intent plus entity slots.
    async fn extract(&self, text: &str, context: Option<&str>)
    -> Result<ExtractionResult, ExtractError>;

    /// Name of this tier, for logging.
    fn tier_name(&self) -> &str;
}

pub use generative::GenerativeExtractor;
pub use rules::RulesClassifier;
pub use tiered::TieredExtractor;
