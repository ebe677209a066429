//! Cloud account endpoints: GCP credential probing and AWS role
//! verification.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::{read_json, ApiClient};

#[derive(Debug, Clone, Deserialize)]
pub struct GcpCredentialStatus {
    pub valid: bool,
    pub needs_reconnect: bool,
    pub message: String,
    pub project_id: Option<String>,
    pub status_code: String,
}

/// Probe GCP credential freshness. Probe failures are reported as statuses
/// rather than errors so callers can always render something actionable.
pub async fn gcp_credential_status(api: &ApiClient) -> GcpCredentialStatus {
    match api.get("/gcp/credentials/status").await {
        Ok(response) if response.status().is_success() => {
            match response.json::<GcpCredentialStatus>().await {
                Ok(status) => status,
                Err(_) => missing_status(),
            }
        }
        Ok(_) => GcpCredentialStatus {
            valid: false,
            needs_reconnect: true,
            message: "Could not verify GCP credentials. Please reconnect.".to_string(),
            project_id: None,
            status_code: "error".to_string(),
        },
        Err(_) => missing_status(),
    }
}

fn missing_status() -> GcpCredentialStatus {
    GcpCredentialStatus {
        valid: false,
        needs_reconnect: false,
        message: "Could not verify GCP credentials. Please connect your GCP account.".to_string(),
        project_id: None,
        status_code: "missing".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsStatus {
    pub aws_connected: bool,
    #[serde(default)]
    pub aws_connection_id: Option<String>,
    #[serde(default)]
    pub aws_role_arn: Option<String>,
    pub aws_status: String,
}

pub async fn aws_status(api: &ApiClient, project_id: &str) -> Result<AwsStatus> {
    let response = api
        .get(&format!("/projects/{project_id}/aws-status"))
        .await?;
    read_json(response, "AWS status").await
}

#[derive(Serialize)]
struct ConnectAwsRequest<'a> {
    deployment_status: &'a str,
    aws_role_arn: &'a str,
}

/// Mark a project's AWS role as verified so deployment unlocks.
pub async fn connect_aws(api: &ApiClient, project_id: &str, role_arn: &str) -> Result<()> {
    let response = api
        .patch(
            &format!("/projects/{project_id}"),
            &ConnectAwsRequest {
                deployment_status: "aws_verified",
                aws_role_arn: role_arn,
            },
        )
        .await?;
    let status = response.status();
    if !status.is_success() {
        bail!("connecting AWS failed with status {status}");
    }
    Ok(())
}
