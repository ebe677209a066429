//! Deployment operation endpoints: start, persisted logs, incremental
//! polling.

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::deploy::phase::DeployOp;

use super::projects::CloudProvider;
use super::{read_json, ApiClient};

pub fn start_path(provider: CloudProvider, project_id: &str, op: DeployOp) -> String {
    format!(
        "{}/projects/{}/{}",
        provider.deployment_prefix(),
        project_id,
        op.as_path()
    )
}

/// SSE endpoint carrying the project's deployment logs.
pub fn logs_stream_path(provider: CloudProvider, project_id: &str) -> String {
    format!(
        "{}/projects/{}/logs/stream",
        provider.deployment_prefix(),
        project_id
    )
}

fn logs_path(provider: CloudProvider, project_id: &str) -> String {
    format!(
        "{}/projects/{}/logs",
        provider.deployment_prefix(),
        project_id
    )
}

#[derive(Deserialize)]
struct StartResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Kick off an operation and wait for the backend's acknowledgement.
/// Used for the short operations (build, plan).
pub async fn start(
    api: &ApiClient,
    provider: CloudProvider,
    project_id: &str,
    op: DeployOp,
) -> Result<()> {
    let response = api
        .post_empty(&start_path(provider, project_id, op))
        .await?;
    let status = response.status();
    if !status.is_success() {
        bail!("starting {op} failed with status {status}");
    }
    let body: StartResponse = read_json(response, "start operation").await?;
    if !body.success {
        match body.errors.first() {
            Some(err) => bail!("failed to start {op}: {err}"),
            None => bail!("failed to start {op}"),
        }
    }
    Ok(())
}

/// Kick off a long operation (apply, destroy) without waiting on the HTTP
/// response; the request routinely outlives proxy timeouts and the SSE
/// stream carries the real outcome.
pub fn start_detached(api: &ApiClient, provider: CloudProvider, project_id: &str, op: DeployOp) {
    let api = api.clone();
    let project_id = project_id.to_string();
    tokio::spawn(async move {
        let _ = api
            .post_empty(&start_path(provider, &project_id, op))
            .await;
    });
}

/// Persisted logs of a finished operation, used to restore state on load.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub operation_type: String,
    #[serde(default)]
    pub logs: Vec<String>,
    pub status: String,
    pub duration_seconds: Option<u64>,
}

#[derive(Deserialize)]
struct LogRecordsData {
    #[serde(default)]
    logs: Vec<LogRecord>,
}

#[derive(Deserialize)]
struct LogRecordsResponse {
    success: bool,
    data: Option<LogRecordsData>,
}

pub async fn log_records(
    api: &ApiClient,
    provider: CloudProvider,
    project_id: &str,
) -> Result<Vec<LogRecord>> {
    let response = api.get(&logs_path(provider, project_id)).await?;
    let body: LogRecordsResponse = read_json(response, "fetch deployment logs").await?;
    if !body.success {
        bail!("backend returned an unsuccessful deployment log response");
    }
    Ok(body.data.map(|d| d.logs).unwrap_or_default())
}

/// One batch of incremental operation logs.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationLogs {
    #[serde(default)]
    pub logs: Vec<String>,
    pub next_index: u64,
    #[serde(default)]
    pub completed: bool,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct OperationLogsResponse {
    success: bool,
    data: Option<OperationLogs>,
}

/// Fetch operation logs past `since_index` (the polling fallback when the
/// SSE stream is unavailable).
pub async fn operation_logs(
    api: &ApiClient,
    operation_id: &str,
    since_index: u64,
) -> Result<OperationLogs> {
    let response = api
        .get(&format!(
            "/deployment/operations/{operation_id}/logs?since_index={since_index}"
        ))
        .await?;
    let body: OperationLogsResponse = read_json(response, "poll operation logs").await?;
    match body.data {
        Some(data) if body.success => Ok(data),
        _ => bail!("backend returned an unsuccessful operation log response"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_paths_are_provider_specific() {
        assert_eq!(
            start_path(CloudProvider::Gcp, "p-1", DeployOp::Build),
            "/gcp/deployment/projects/p-1/build_image"
        );
        assert_eq!(
            start_path(CloudProvider::Aws, "p-1", DeployOp::Apply),
            "/deployment/projects/p-1/apply"
        );
    }

    #[test]
    fn stream_path_is_provider_specific() {
        assert_eq!(
            logs_stream_path(CloudProvider::Gcp, "p-9"),
            "/gcp/deployment/projects/p-9/logs/stream"
        );
        assert_eq!(
            logs_stream_path(CloudProvider::Aws, "p-9"),
            "/deployment/projects/p-9/logs/stream"
        );
    }
}
