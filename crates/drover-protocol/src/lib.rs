//! Shared types for Drover — the AI DevOps companion core.
//!
//! Everything here is a plain serde value: the command vocabulary
//! (intents + entity slots), the normalized response contract, the
//! shapes returned by the GitLab and warehouse collaborators, and the
//! risk-prediction contract. No I/O lives in this crate.

pub mod analytics;
pub mod commands;
pub mod pipelines;
pub mod prediction;
