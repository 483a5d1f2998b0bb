//! Scripted GitLab mock for tests.
//!
//! Records every call so tests can assert on call counts and the exact
//! arguments the dispatcher sent (e.g. "validation failures must not
//! contact GitLab at all").

use async_trait::async_trait;
use std::sync::Mutex;

use drover_protocol::pipelines::{
    FailedJob, PipelineStatus, PipelineSummary, PipelineVariable, Project, TriggerOutcome,
};

use crate::GitLabClient;
use crate::error::{GitLabError, GitLabResult};

/// A recorded `trigger_pipeline` call.
#[derive(Debug, Clone)]
pub struct TriggerCall {
    pub path: String,
    pub ref_name: String,
    pub variables: Vec<PipelineVariable>,
}

/// Scripted GitLab client.
pub struct MockGitLab {
    trigger_result: Mutex<Option<GitLabResult<TriggerOutcome>>>,
    status_result: Mutex<Option<GitLabResult<PipelineStatus>>>,
    failed_job: Mutex<Option<GitLabResult<Option<FailedJob>>>>,
    trigger_calls: Mutex<Vec<TriggerCall>>,
    status_calls: Mutex<Vec<String>>,
    failed_job_calls: Mutex<Vec<String>>,
}

impl MockGitLab {
    pub fn new() -> Self {
        Self {
            trigger_result: Mutex::new(None),
            status_result: Mutex::new(None),
            failed_job: Mutex::new(None),
            trigger_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            failed_job_calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a successful trigger returning a pending pipeline.
    pub fn with_pipeline(iid: &str) -> Self {
        let mock = Self::new();
        mock.set_trigger(Ok(TriggerOutcome {
            pipeline: Some(PipelineSummary {
                id: format!("gid://gitlab/Ci::Pipeline/{iid}"),
                iid: iid.to_string(),
                web_url: format!("https://gitlab.example/acme/widgets/-/pipelines/{iid}"),
                status: "pending".into(),
            }),
            errors: vec![],
        }));
        mock
    }

    pub fn set_trigger(&self, result: GitLabResult<TriggerOutcome>) {
        *self.trigger_result.lock().unwrap() = Some(result);
    }

    pub fn set_status(&self, result: GitLabResult<PipelineStatus>) {
        *self.status_result.lock().unwrap() = Some(result);
    }

    pub fn set_failed_job(&self, result: GitLabResult<Option<FailedJob>>) {
        *self.failed_job.lock().unwrap() = Some(result);
    }

    pub fn trigger_calls(&self) -> Vec<TriggerCall> {
        self.trigger_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn failed_job_calls(&self) -> Vec<String> {
        self.failed_job_calls.lock().unwrap().clone()
    }
}

impl Default for MockGitLab {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone a scripted result. `GitLabError` is not `Clone`, so scripted
/// errors are replayed as `Api` errors carrying the original text.
fn replay<T: Clone>(slot: &Mutex<Option<GitLabResult<T>>>) -> Option<GitLabResult<T>> {
    slot.lock().unwrap().as_ref().map(|r| match r {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(GitLabError::Api {
            status: 500,
            body: e.to_string(),
        }),
    })
}

#[async_trait]
impl GitLabClient for MockGitLab {
    async fn get_project(&self, path: &str) -> GitLabResult<Project> {
        Ok(Project {
            id: "1".into(),
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
        })
    }

    async fn trigger_pipeline(
        &self,
        path: &str,
        ref_name: &str,
        variables: &[PipelineVariable],
    ) -> GitLabResult<TriggerOutcome> {
        self.trigger_calls.lock().unwrap().push(TriggerCall {
            path: path.to_string(),
            ref_name: ref_name.to_string(),
            variables: variables.to_vec(),
        });
        replay(&self.trigger_result).unwrap_or_else(|| {
            Ok(TriggerOutcome {
                pipeline: None,
                errors: vec!["no trigger result scripted".into()],
            })
        })
    }

    async fn get_pipeline_status(&self, path: &str) -> GitLabResult<PipelineStatus> {
        self.status_calls.lock().unwrap().push(path.to_string());
        replay(&self.status_result).unwrap_or_else(|| {
            Ok(PipelineStatus {
                status: "running".into(),
                message: "Pipeline is currently running".into(),
            })
        })
    }

    async fn get_last_failed_job(&self, path: &str) -> GitLabResult<Option<FailedJob>> {
        self.failed_job_calls.lock().unwrap().push(path.to_string());
        replay(&self.failed_job).unwrap_or(Ok(None))
    }
}
