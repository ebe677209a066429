//! Generation workflow endpoints and stream URL construction.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::projects::{CloudProvider, Generation};
use super::{read_json, ApiClient};

/// Deployment template driving the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    CloudRun,
    GkeAutopilot,
    EcsFargate,
    Lambda,
}

impl TemplateType {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud-run" => Ok(TemplateType::CloudRun),
            "gke-autopilot" => Ok(TemplateType::GkeAutopilot),
            "ecs-fargate" => Ok(TemplateType::EcsFargate),
            "lambda" => Ok(TemplateType::Lambda),
            _ => bail!(
                "invalid template '{}' (expected cloud-run, gke-autopilot, ecs-fargate or lambda)",
                s
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::CloudRun => "cloud-run",
            TemplateType::GkeAutopilot => "gke-autopilot",
            TemplateType::EcsFargate => "ecs-fargate",
            TemplateType::Lambda => "lambda",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartWorkflowRequest {
    pub repository_url: String,
    pub installation_id: i64,
    pub template_type: TemplateType,
    pub cloud_provider: CloudProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartWorkflowResponse {
    pub session_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub stream_url: Option<String>,
}

pub async fn start(api: &ApiClient, request: &StartWorkflowRequest) -> Result<StartWorkflowResponse> {
    let response = api.post("/workflows/start", request).await?;
    read_json(response, "start workflow").await
}

/// SSE endpoint for a session's workflow events.
pub fn stream_path(session_id: &str) -> String {
    format!("/workflows/stream/{session_id}")
}

/// SSE endpoint for a session's agent-activity ("thinking") logs.
pub fn agent_logs_path(session_id: &str) -> String {
    format!("/workflows/agent-logs/{session_id}")
}

pub async fn status(api: &ApiClient, session_id: &str) -> Result<serde_json::Value> {
    let response = api.get(&format!("/workflows/status/{session_id}")).await?;
    read_json(response, "workflow status").await
}

/// The latest generation record for a project, or `None` when the backend
/// has nothing (or returns an unexpected shape).
pub async fn generation_by_project(
    api: &ApiClient,
    project_id: &str,
) -> Result<Option<Generation>> {
    let response = api
        .get(&format!("/workflows/generation/by-project/{project_id}"))
        .await?;
    if !response.status().is_success() {
        return Ok(None);
    }
    Ok(response.json::<Generation>().await.ok())
}
