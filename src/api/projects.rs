//! Project endpoints: import, lookup, environment variables.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::{read_json, ApiClient};

/// Cloud provider a project deploys to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Gcp,
    Aws,
}

impl CloudProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "gcp" => Ok(CloudProvider::Gcp),
            "aws" => Ok(CloudProvider::Aws),
            _ => bail!("invalid cloud provider '{}'", s),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Gcp => "gcp",
            CloudProvider::Aws => "aws",
        }
    }

    /// Deployment endpoints are namespaced per provider.
    pub fn deployment_prefix(&self) -> &'static str {
        match self {
            CloudProvider::Gcp => "/gcp/deployment",
            CloudProvider::Aws => "/deployment",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub repository_url: String,
    #[serde(default)]
    pub repository_name: Option<String>,
    pub installation_id: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub cloud_provider: Option<CloudProvider>,
    pub deployment_status: Option<String>,
    pub deployment_error: Option<String>,
    pub application_url: Option<String>,
    pub terraform_outputs: Option<TerraformOutputs>,
    #[serde(default)]
    pub created_at: String,
}

impl Project {
    pub fn provider(&self) -> CloudProvider {
        self.cloud_provider.unwrap_or(CloudProvider::Gcp)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerraformOutputs {
    // GCP outputs
    pub cloud_run_service_url: Option<String>,
    pub artifact_registry_url: Option<String>,
    // AWS outputs
    pub alb_dns_name: Option<String>,
    pub ecs_cluster_name: Option<String>,
    pub ecs_service_name: Option<String>,
    pub ecr_repository_url: Option<String>,
    pub cloudwatch_log_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub id: String,
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub files: Vec<serde_json::Value>,
    #[serde(default)]
    pub created_at: String,
}

pub struct ProjectDetail {
    pub project: Project,
    pub generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct ProjectsResponse {
    success: bool,
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct ProjectResponse {
    success: bool,
    project: Option<Project>,
}

#[derive(Deserialize)]
struct ProjectDetailResponse {
    success: bool,
    project: Option<Project>,
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    full_name: &'a str,
    installation_id: i64,
}

pub async fn import_repository(
    api: &ApiClient,
    full_name: &str,
    installation_id: i64,
) -> Result<Project> {
    let response = api
        .post(
            "/projects/import",
            &ImportRequest {
                full_name,
                installation_id,
            },
        )
        .await?;
    let body: ProjectResponse = read_json(response, "import repository").await?;
    match body.project {
        Some(project) if body.success => Ok(project),
        _ => bail!("backend refused to import '{}'", full_name),
    }
}

pub async fn list(api: &ApiClient) -> Result<Vec<Project>> {
    let response = api.get("/projects").await?;
    let body: ProjectsResponse = read_json(response, "list projects").await?;
    if !body.success {
        bail!("backend returned an unsuccessful project list");
    }
    Ok(body.projects)
}

pub async fn get_by_slug(api: &ApiClient, slug: &str) -> Result<Option<ProjectDetail>> {
    let response = api.get(&format!("/projects/{slug}")).await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let body: ProjectDetailResponse = read_json(response, "fetch project").await?;
    Ok(body.success.then_some(()).and(body.project).map(|project| {
        ProjectDetail {
            project,
            generations: body.generations,
        }
    }))
}

pub async fn get_by_id(api: &ApiClient, id: &str) -> Result<Option<Project>> {
    let response = api.get(&format!("/projects/{id}")).await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let body: ProjectResponse = read_json(response, "fetch project").await?;
    Ok(body.success.then_some(()).and(body.project))
}

/// Slugified project name, matching the backend's URL scheme.
pub fn normalized_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Find a project by slug or by its normalized display name.
pub async fn find(api: &ApiClient, slug: &str) -> Result<Option<Project>> {
    let projects = list(api).await?;
    Ok(projects
        .into_iter()
        .find(|p| p.slug == slug || normalized_name(&p.name) == slug))
}

/// One environment variable record. Secret values come back masked (null)
/// from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub async fn env_vars(api: &ApiClient, project_id: &str) -> Result<Vec<EnvVar>> {
    let response = api.get(&format!("/projects/{project_id}/env-vars")).await?;
    read_json(response, "fetch environment variables").await
}

#[derive(Serialize)]
struct SaveEnvVarsRequest<'a> {
    env_vars: &'a [EnvVar],
}

pub async fn save_env_vars(api: &ApiClient, project_id: &str, vars: &[EnvVar]) -> Result<()> {
    let response = api
        .post(
            &format!("/projects/{project_id}/env-vars"),
            &SaveEnvVarsRequest { env_vars: vars },
        )
        .await?;
    let status = response.status();
    if !status.is_success() {
        bail!("saving environment variables failed with status {status}");
    }
    Ok(())
}

/// Parse dotenv-style `KEY=value` lines. Quoted values are unwrapped,
/// comments and blank lines skipped, everything imported as secret.
pub fn parse_dotenv(input: &str) -> Vec<EnvVar> {
    input
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let mut value = value.trim();
            if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
                || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
            {
                value = &value[1..value.len() - 1];
            }
            Some(EnvVar {
                key: key.to_string(),
                value: Some(value.to_string()),
                is_secret: true,
                description: None,
            })
        })
        .collect()
}
