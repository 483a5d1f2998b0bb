//! Generative extraction tier.
//!
//! Prompts the text model with the closed intent set and the slot
//! names, then parses the first JSON object out of whatever came back.
//! Models wrap JSON in markdown fences, prepend prose, invent intent
//! names — everything suspicious is an error here and a fallback for
//! the tiered extractor.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use drover_protocol::commands::{Entities, ExtractionResult, Intent};

use super::{ExtractEngine, ExtractError, GENERATIVE_CONFIDENCE};
use crate::llm::TextGenerator;

const PROMPT_TEMPLATE: &str = r#"You are a DevOps assistant for GitLab CI/CD pipelines.
Analyze this command and extract the intent and entities.

Command: "{command}"
Context: {context}

Possible intents:
- DEPLOY_REQUEST: User wants to deploy code
- STATUS_CHECK: User wants to check pipeline status
- ROLLBACK_REQUEST: User wants to rollback
- OPTIMIZATION_REQUEST: User wants to optimize performance/costs
- PIPELINE_CREATE: User wants to create a new pipeline
- COST_ANALYSIS: User wants cost breakdown
- PERFORMANCE_REPORT: User wants performance metrics
- AUTO_FIX: User wants to fix failed jobs
- SCHEDULE_DEPLOYMENT: User wants to schedule deployment
- HELP_REQUEST: User needs help
- UNKNOWN: None of the above

Respond ONLY with valid JSON in this exact format:
{
  "intent": "INTENT_NAME",
  "entities": {
    "project": "project path or null",
    "branch": "branch name or null",
    "environment": "staging/production/dev or null",
    "jobId": "job id or null",
    "timeRange": "time range or null",
    "time": "schedule time or null"
  }
}"#;

/// Raw model output before validation. `intent` is a free string until
/// it survives the closed-set check.
#[derive(Deserialize)]
struct RawExtraction {
    intent: String,
    #[serde(default)]
    entities: Entities,
}

/// Extraction tier backed by a [`TextGenerator`].
pub struct GenerativeExtractor {
    model: Arc<dyn TextGenerator>,
}

impl GenerativeExtractor {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    fn build_prompt(command: &str, context: Option<&str>) -> String {
        PROMPT_TEMPLATE
            .replace("{command}", command)
            .replace("{context}", context.unwrap_or("none"))
    }
}

/// Pull the first JSON object out of model output. Markdown fences are
/// stripped first, then everything from the first `{` to the last `}`.
fn extract_json(text: &str) -> Result<&str, ExtractError> {
    let body = text
        .split("```")
        .map(|chunk| chunk.strip_prefix("json").unwrap_or(chunk))
        .find(|chunk| chunk.contains('{'))
        .unwrap_or(text);

    let start = body.find('{').ok_or(ExtractError::NoJson)?;
    let end = body.rfind('}').ok_or(ExtractError::NoJson)?;
    if end < start {
        return Err(ExtractError::NoJson);
    }
    Ok(&body[start..=end])
}

#[async_trait]
impl ExtractEngine for GenerativeExtractor {
    async fn extract(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<ExtractionResult, ExtractError> {
        let prompt = Self::build_prompt(text, context);
        let output = self.model.generate(&prompt).await?;

        let json = extract_json(&output)?;
        let raw: RawExtraction = serde_json::from_str(json)?;

        let intent = Intent::from_name(&raw.intent)
            .ok_or_else(|| ExtractError::UnknownIntent(raw.intent.clone()))?;

        Ok(ExtractionResult {
            intent,
            entities: raw.entities,
            confidence: GENERATIVE_CONFIDENCE,
        })
    }

    fn tier_name(&self) -> &str {
        "generative"
    }
}
