//! Command interpretation and action dispatch for the DevOps companion.
//!
//! The pipeline for one chat command:
//!
//! 1. [`extract`] classifies the free text into an [`Intent`] with entity
//!    slots — generative model first, deterministic keyword rules as the
//!    fallback tier.
//! 2. [`dispatch`] maps the intent to one orchestration routine against
//!    the GitLab and warehouse collaborators and normalizes the outcome
//!    into a [`CommandResponse`].
//! 3. [`risk`] scores deployment outcomes from historical aggregates
//!    plus additive rule adjustments.
//!
//! [`service::CommandService`] ties the three together behind the two
//! public entry points. Everything here is request-scoped: no state
//! survives a call, collaborators are shared read-only handles.
//!
//! [`Intent`]: drover_protocol::commands::Intent
//! [`CommandResponse`]: drover_protocol::commands::CommandResponse

pub mod analyst;
pub mod dispatch;
pub mod extract;
pub mod llm;
pub mod risk;
pub mod service;

pub use dispatch::ActionDispatcher;
pub use extract::TieredExtractor;
pub use risk::RiskScoringEngine;
pub use service::CommandService;
