//! HTTP implementation of [`GitLabClient`].
//!
//! Uses the GraphQL API for project lookup and pipeline creation (its
//! `pipelineCreate` mutation reports domain errors alongside the
//! pipeline, which maps directly onto [`TriggerOutcome`]) and the REST
//! v4 API for failed-job lookup and log retrieval.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use drover_protocol::pipelines::{
    FailedJob, PipelineStatus, PipelineVariable, Project, TriggerOutcome,
};

use crate::error::{GitLabError, GitLabResult};
use crate::GitLabClient;

/// How much of a job log is kept for failure analysis.
const LOG_TAIL_LINES: usize = 100;

/// Configuration for the GitLab HTTP client.
#[derive(Debug, Clone)]
pub struct GitLabConfig {
    /// Instance base URL (e.g. "https://gitlab.com").
    pub base_url: String,
    /// Personal/project access token. Anonymous access works for public
    /// projects but cannot trigger pipelines.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GitLabConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GITLAB_URL").unwrap_or_else(|_| "https://gitlab.com".into());
        let token = std::env::var("GITLAB_TOKEN").ok().filter(|t| !t.is_empty());
        let timeout_secs: u64 = std::env::var("GITLAB_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        Self {
            base_url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.com".into(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// GitLab client backed by reqwest.
pub struct GitLabHttp {
    client: reqwest::Client,
    config: GitLabConfig,
}

impl GitLabHttp {
    pub fn new(config: GitLabConfig) -> GitLabResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Run a GraphQL query and return the `data` object.
    async fn graphql(&self, query: &str, variables: Value) -> GitLabResult<Value> {
        let url = format!("{}/api/graphql", self.config.base_url);
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitLabError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(GitLabError::Schema(format!(
                "graphql errors: {}",
                messages.join("; ")
            )));
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| GitLabError::Schema("response has no data object".into()))
    }

    /// Run a REST v4 GET and parse the JSON body.
    async fn rest_get(&self, path_and_query: &str) -> GitLabResult<reqwest::Response> {
        let url = format!("{}/api/v4/{}", self.config.base_url, path_and_query);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitLabError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GitLabClient for GitLabHttp {
    async fn get_project(&self, path: &str) -> GitLabResult<Project> {
        const QUERY: &str = r#"
            query ($fullPath: ID!) {
                project(fullPath: $fullPath) { id name fullPath }
            }"#;

        let data = self.graphql(QUERY, json!({ "fullPath": path })).await?;
        let project = &data["project"];
        if project.is_null() {
            return Err(GitLabError::ProjectNotFound(path.to_string()));
        }
        Ok(Project {
            id: require_str(project, "id")?.to_string(),
            path: require_str(project, "fullPath")?.to_string(),
            name: require_str(project, "name")?.to_string(),
        })
    }

    async fn trigger_pipeline(
        &self,
        path: &str,
        ref_name: &str,
        variables: &[PipelineVariable],
    ) -> GitLabResult<TriggerOutcome> {
        const MUTATION: &str = r#"
            mutation ($input: PipelineCreateInput!) {
                pipelineCreate(input: $input) {
                    pipeline { id iid status path }
                    errors
                }
            }"#;

        let vars: Vec<Value> = variables
            .iter()
            .map(|v| json!({ "key": v.key, "value": v.value, "variableType": "ENV_VAR" }))
            .collect();
        let input = json!({
            "input": {
                "projectPath": path,
                "ref": ref_name,
                "variables": vars,
            }
        });

        tracing::info!(%path, %ref_name, "triggering pipeline");
        let data = self.graphql(MUTATION, input).await?;
        let create = &data["pipelineCreate"];
        if create.is_null() {
            return Err(GitLabError::Schema("pipelineCreate missing".into()));
        }

        let errors: Vec<String> = create["errors"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let pipeline = match &create["pipeline"] {
            Value::Null => None,
            node => Some(drover_protocol::pipelines::PipelineSummary {
                id: require_str(node, "id")?.to_string(),
                iid: require_str(node, "iid")?.to_string(),
                web_url: format!(
                    "{}{}",
                    self.config.base_url,
                    node["path"].as_str().unwrap_or_default()
                ),
                status: node["status"].as_str().unwrap_or("pending").to_lowercase(),
            }),
        };

        Ok(TriggerOutcome { pipeline, errors })
    }

    async fn get_pipeline_status(&self, path: &str) -> GitLabResult<PipelineStatus> {
        const QUERY: &str = r#"
            query ($fullPath: ID!) {
                project(fullPath: $fullPath) {
                    pipelines(first: 1) { nodes { status } }
                }
            }"#;

        let data = self.graphql(QUERY, json!({ "fullPath": path })).await?;
        let project = &data["project"];
        if project.is_null() {
            return Err(GitLabError::ProjectNotFound(path.to_string()));
        }

        let status = project["pipelines"]["nodes"]
            .as_array()
            .and_then(|nodes| nodes.first())
            .and_then(|n| n["status"].as_str())
            .map(str::to_lowercase);

        Ok(match status {
            Some(status) => PipelineStatus {
                message: status_message(&status),
                status,
            },
            None => PipelineStatus {
                status: "none".into(),
                message: "No pipelines have run for this project yet".into(),
            },
        })
    }

    async fn get_last_failed_job(&self, path: &str) -> GitLabResult<Option<FailedJob>> {
        let encoded = encode_path(path);
        let response = self
            .rest_get(&format!(
                "projects/{encoded}/jobs?scope[]=failed&per_page=1"
            ))
            .await?;
        let jobs: Vec<Value> = response.json().await?;
        let Some(job) = jobs.into_iter().next() else {
            return Ok(None);
        };

        let id = job["id"]
            .as_i64()
            .ok_or_else(|| GitLabError::Schema("job id missing".into()))?;
        let name = job["name"].as_str().unwrap_or("unknown").to_string();

        // Job log can be large — keep only the tail for analysis.
        let trace = self
            .rest_get(&format!("projects/{encoded}/jobs/{id}/trace"))
            .await?
            .text()
            .await?;
        let log = tail_lines(&trace, LOG_TAIL_LINES);
        tracing::debug!(%path, job_id = id, "fetched failed job log tail");

        Ok(Some(FailedJob {
            id: id.to_string(),
            name,
            log,
            config: job.to_string(),
        }))
    }
}

/// URL-encode a project path for the REST API (`acme/widgets` → `acme%2Fwidgets`).
fn encode_path(path: &str) -> String {
    path.replace('/', "%2F")
}

/// Keep the last `n` lines of a log.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn require_str<'a>(node: &'a Value, key: &str) -> GitLabResult<&'a str> {
    node[key]
        .as_str()
        .ok_or_else(|| GitLabError::Schema(format!("missing field {key}")))
}

fn status_message(status: &str) -> String {
    match status {
        "running" => "Pipeline is currently running".into(),
        "pending" => "Pipeline is queued and waiting for a runner".into(),
        "success" => "Latest pipeline finished successfully".into(),
        "failed" => "Latest pipeline failed".into(),
        "canceled" => "Latest pipeline was canceled".into(),
        other => format!("Latest pipeline is {other}"),
    }
}
