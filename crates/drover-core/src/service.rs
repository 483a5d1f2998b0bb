//! Entry points: one per invocation surface.
//!
//! `process_command` is the chat path (free text in, response contract
//! out); `predict_outcome` is the structured prediction path. Both are
//! request-scoped: every call builds its own values and shares only the
//! long-lived collaborator handles.

use drover_protocol::commands::CommandResponse;
use drover_protocol::prediction::{Prediction, PredictionInput};

use crate::dispatch::ActionDispatcher;
use crate::extract::TieredExtractor;
use crate::risk::RiskScoringEngine;

/// Ties extraction, dispatch and risk scoring together.
pub struct CommandService {
    extractor: TieredExtractor,
    dispatcher: ActionDispatcher,
    risk: RiskScoringEngine,
}

impl CommandService {
    pub fn new(
        extractor: TieredExtractor,
        dispatcher: ActionDispatcher,
        risk: RiskScoringEngine,
    ) -> Self {
        Self {
            extractor,
            dispatcher,
            risk,
        }
    }

    /// Process one free-text command. Never fails: extraction degrades
    /// internally and dispatch folds every failure into the response.
    pub async fn process_command(
        &self,
        command: &str,
        context: Option<&str>,
    ) -> CommandResponse {
        tracing::info!(%command, "processing command");

        let extraction = self.extractor.extract(command, context).await;
        tracing::debug!(
            intent = extraction.intent.as_str(),
            confidence = extraction.confidence,
            "command classified"
        );

        self.dispatcher
            .dispatch(extraction.intent, &extraction.entities, context)
            .await
    }

    /// Score a structured deployment prediction request.
    pub async fn predict_outcome(&self, input: &PredictionInput) -> Prediction {
        self.risk.score_deployment(input).await
    }
}
