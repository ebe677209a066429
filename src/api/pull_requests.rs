//! Pull request creation and status.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{read_json, ApiClient};

#[derive(Debug, Clone, Serialize)]
pub struct CreatePrRequest {
    pub project_id: String,
    pub generation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrResponse {
    pub pr_number: u64,
    pub pr_url: String,
    pub branch: String,
    #[serde(default)]
    pub validation_warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrStatus {
    pub pr_number: u64,
    pub pr_url: String,
    pub state: String,
    pub merged: bool,
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Open a pull request containing the generated infrastructure files.
pub async fn create(api: &ApiClient, request: &CreatePrRequest) -> Result<CreatePrResponse> {
    let response = api.post("/pull-requests/create", request).await?;
    read_json(response, "create pull request").await
}

pub async fn status(api: &ApiClient, project_id: &str) -> Result<PrStatus> {
    let response = api
        .get(&format!("/pull-requests/{project_id}/status"))
        .await?;
    read_json(response, "pull request status").await
}
