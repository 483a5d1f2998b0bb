use thiserror::Error;

/// Errors from the GitLab collaborator.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("gitlab request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gitlab returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected gitlab response shape: {0}")]
    Schema(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),
}

pub type GitLabResult<T> = Result<T, GitLabError>;
