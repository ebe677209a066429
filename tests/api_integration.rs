//! REST client tests against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sirpi::api::workflow::{self, StartWorkflowRequest, TemplateType};
use sirpi::api::{cloud, deployment, projects, pull_requests, ApiClient, CloudProvider};
use sirpi::auth::StaticTokenProvider;
use sirpi::deploy::DeployOp;
use sirpi::poll::LogPoller;

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(
        server.uri(),
        "/api/v1",
        Arc::new(StaticTokenProvider::new("test-token")),
    )
}

fn project_json(id: &str, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "My App",
        "slug": slug,
        "repository_url": "https://github.com/acme/my-app",
        "repository_name": "acme/my-app",
        "installation_id": 77,
        "language": "python",
        "description": null,
        "status": "imported",
        "cloud_provider": "gcp",
        "deployment_status": "deployed",
        "created_at": "2025-06-01T00:00:00Z"
    })
}

#[tokio::test]
async fn list_projects_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "projects": [project_json("p-1", "my-app")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let list = projects::list(&api).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].slug, "my-app");
    assert_eq!(list[0].provider(), CloudProvider::Gcp);
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "projects": []})),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    assert!(projects::list(&api).await.is_err());
}

#[tokio::test]
async fn missing_project_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/nope"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server);
    assert!(projects::get_by_slug(&api, "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn find_matches_normalized_project_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "projects": [project_json("p-1", "weird-slug")]
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    // "My App" normalizes to "my-app".
    let found = projects::find(&api, "my-app").await.unwrap();
    assert_eq!(found.unwrap().id, "p-1");
}

#[tokio::test]
async fn start_deployment_uses_provider_specific_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/gcp/deployment/projects/p-1/build_image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deployment/projects/p-1/plan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    deployment::start(&api, CloudProvider::Gcp, "p-1", DeployOp::Build)
        .await
        .unwrap();
    deployment::start(&api, CloudProvider::Aws, "p-1", DeployOp::Plan)
        .await
        .unwrap();
}

#[tokio::test]
async fn start_deployment_surfaces_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/gcp/deployment/projects/p-1/apply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": ["gcp_credentials_expired"]
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let err = deployment::start(&api, CloudProvider::Gcp, "p-1", DeployOp::Apply)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("apply"));
}

#[tokio::test]
async fn log_records_restore_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/gcp/deployment/projects/p-1/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "logs": [
                    {
                        "operation_type": "build_image",
                        "logs": ["Build complete!"],
                        "status": "success",
                        "duration_seconds": 41
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let records = deployment::log_records(&api, CloudProvider::Gcp, "p-1")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].operation_type, "build_image");
    assert_eq!(records[0].duration_seconds, Some(41));
}

#[tokio::test]
async fn poller_advances_cursor_and_latches_on_completion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployment/operations/op-1/logs"))
        .and(query_param("since_index", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "logs": ["line 1", "line 2"],
                "next_index": 2,
                "completed": false,
                "status": null,
                "error": null
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployment/operations/op-1/logs"))
        .and(query_param("since_index", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "logs": ["line 3"],
                "next_index": 3,
                "completed": true,
                "status": "completed",
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let mut poller = LogPoller::new("op-1");
    let mut lines = Vec::new();
    let result = poller
        .follow(&api, Duration::from_millis(10), |line| lines.push(line))
        .await;

    assert_eq!(lines, vec!["line 1", "line 2", "line 3"]);
    assert_eq!(result.status.as_deref(), Some("completed"));
    assert!(poller.is_completed());
    assert_eq!(poller.next_index(), 3);
}

#[tokio::test]
async fn start_workflow_posts_request_and_reads_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workflows/start"))
        .and(body_json(json!({
            "repository_url": "https://github.com/acme/my-app",
            "installation_id": 77,
            "template_type": "cloud-run",
            "cloud_provider": "gcp",
            "project_id": "p-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-42",
            "status": "started",
            "message": "Workflow started",
            "stream_url": "/api/v1/workflows/stream/s-42"
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let response = workflow::start(
        &api,
        &StartWorkflowRequest {
            repository_url: "https://github.com/acme/my-app".to_string(),
            installation_id: 77,
            template_type: TemplateType::CloudRun,
            cloud_provider: CloudProvider::Gcp,
            project_id: Some("p-1".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.session_id, "s-42");
}

#[tokio::test]
async fn generation_lookup_tolerates_missing_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/generation/by-project/p-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server);
    assert!(workflow::generation_by_project(&api, "p-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn create_pr_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pull-requests/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pr_number": 7,
            "pr_url": "https://github.com/acme/my-app/pull/7",
            "branch": "sirpi/infrastructure",
            "validation_warnings": ["Dockerfile overwrites an existing file"]
        })))
        .mount(&server)
        .await;

    let api = client(&server);
    let response = pull_requests::create(
        &api,
        &pull_requests::CreatePrRequest {
            project_id: "p-1".to_string(),
            generation_id: "g-1".to_string(),
            base_branch: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.pr_number, 7);
    assert_eq!(response.validation_warnings.len(), 1);
}

#[tokio::test]
async fn env_vars_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects/p-1/env-vars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"key": "DATABASE_URL", "value": null, "is_secret": true},
            {"key": "PORT", "value": "8080", "is_secret": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/projects/p-1/env-vars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let vars = projects::env_vars(&api, "p-1").await.unwrap();
    assert_eq!(vars.len(), 2);
    // Secret values come back masked.
    assert!(vars[0].value.is_none());

    projects::save_env_vars(&api, "p-1", &projects::parse_dotenv("NEW=value"))
        .await
        .unwrap();
}

#[tokio::test]
async fn gcp_probe_failure_synthesizes_reconnect_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/gcp/credentials/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = client(&server);
    let status = cloud::gcp_credential_status(&api).await;
    assert!(!status.valid);
    assert!(status.needs_reconnect);
    assert_eq!(status.status_code, "error");
}

#[tokio::test]
async fn connect_aws_patches_project() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/projects/p-1"))
        .and(body_json(json!({
            "deployment_status": "aws_verified",
            "aws_role_arn": "arn:aws:iam::123:role/deploy"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    cloud::connect_aws(&api, "p-1", "arn:aws:iam::123:role/deploy")
        .await
        .unwrap();
}
