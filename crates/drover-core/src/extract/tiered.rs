//! Tiered extraction — generative first, keyword rules as the floor.
//!
//! The composite never fails: any error from the primary tier is
//! logged and silently degraded to the deterministic classifier, which
//! always produces an answer. Degradation is not user-visible.

use drover_protocol::commands::ExtractionResult;

use super::rules::classify;
use super::{ExtractEngine, RULES_CONFIDENCE};

/// Composite extractor with an optional fallible primary tier.
pub struct TieredExtractor {
    primary: Option<Box<dyn ExtractEngine>>,
}

impl TieredExtractor {
    /// Both tiers: try `primary`, degrade to the rules on any failure.
    pub fn new(primary: Box<dyn ExtractEngine>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    /// Rules only — used when no generative collaborator is configured.
    pub fn rules_only() -> Self {
        Self { primary: None }
    }

    /// Extract an intent and entities from `text`. Never fails.
    pub async fn extract(&self, text: &str, context: Option<&str>) -> ExtractionResult {
        if let Some(primary) = &self.primary {
            match primary.extract(text, context).await {
                Ok(result) => {
                    tracing::debug!(
                        tier = primary.tier_name(),
                        intent = result.intent.as_str(),
                        "extraction succeeded"
                    );
                    return result;
                }
                Err(e) => {
                    tracing::warn!(
                        tier = primary.tier_name(),
                        error = %e,
                        "extraction degraded to rules"
                    );
                }
            }
        }

        let (intent, entities) = classify(text);
        ExtractionResult {
            intent,
            entities,
            confidence: RULES_CONFIDENCE,
        }
    }
}
