//! GitLab collaborator boundary.
//!
//! The core only depends on the [`GitLabClient`] trait; the real
//! GraphQL/REST implementation and the scripted mock both live here so
//! every consumer tests against the same seam.

pub mod client;
pub mod error;
pub mod mock;

use async_trait::async_trait;

use drover_protocol::pipelines::{
    FailedJob, PipelineStatus, PipelineVariable, Project, TriggerOutcome,
};

use crate::error::GitLabResult;

/// Operations the companion needs from the CI/CD provider.
#[async_trait]
pub trait GitLabClient: Send + Sync {
    /// Resolve a project by its full path (e.g. `acme/widgets`).
    async fn get_project(&self, path: &str) -> GitLabResult<Project>;

    /// Trigger a pipeline on `ref_name` with the given CI variables.
    ///
    /// Domain-level failures (unknown ref, missing CI config) come back
    /// as `errors` inside the outcome, not as an `Err`.
    async fn trigger_pipeline(
        &self,
        path: &str,
        ref_name: &str,
        variables: &[PipelineVariable],
    ) -> GitLabResult<TriggerOutcome>;

    /// Status of the most recent pipeline for a project.
    async fn get_pipeline_status(&self, path: &str) -> GitLabResult<PipelineStatus>;

    /// Most recent failed job with its log and CI config, if any.
    async fn get_last_failed_job(&self, path: &str) -> GitLabResult<Option<FailedJob>>;
}

pub use client::{GitLabConfig, GitLabHttp};
pub use error::GitLabError;
pub use mock::MockGitLab;
