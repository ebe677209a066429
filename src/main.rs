//! Sirpi - terminal client for the Sirpi infrastructure generation service

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use sirpi::api::projects::Project;
use sirpi::api::workflow::TemplateType;
use sirpi::api::{cloud, projects, pull_requests, ApiClient, CloudProvider};
use sirpi::auth::EnvTokenProvider;
use sirpi::cli::{
    Args, AwsAction, Command, DeployAction, EnvAction, GcpAction, PrAction, ProjectAction,
};
use sirpi::config::{self, Config};
use sirpi::deploy::{self, DeployOp, DeploymentTracker, Outcome};
use sirpi::output::formatter;
use sirpi::poll::LogPoller;
use sirpi::ui::LogView;
use sirpi::workflow::{self, GenerationOutcome, GenerationTracker};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let args = Args::parse_args();

    let Some(command) = args.command else {
        // Bare `sirpi` with no subcommand prints help
        Args::parse_from(["sirpi", "--help"]);
        return Ok(ExitCode::SUCCESS);
    };

    if let Command::Init = command {
        config::init()?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(args.api_url)?;
    let api = ApiClient::new(
        &config.api_url,
        &config.api_prefix,
        Arc::new(EnvTokenProvider::new(&config.token_env)),
    );

    match command {
        Command::Init => unreachable!("handled above"),
        Command::Projects { action } => run_projects(&api, action).await,
        Command::Generate {
            project,
            template,
            provider,
            agent_logs,
        } => run_generate(&api, &config, &project, &template, &provider, agent_logs).await,
        Command::Deploy { action } => run_deploy(&api, &config, action).await,
        Command::Logs { project } => {
            let project = find_project(&api, &project).await?;
            deploy::session::tail_logs(&api, &config, &project).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Pr { action } => run_pr(&api, action).await,
        Command::Env { action } => run_env(&api, action).await,
        Command::Gcp {
            action: GcpAction::Status,
        } => {
            let status = cloud::gcp_credential_status(&api).await;
            println!("{} ({})", status.message, status.status_code);
            if let Some(gcp_project) = &status.project_id {
                println!("GCP project: {gcp_project}");
            }
            Ok(if status.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Aws { action } => run_aws(&api, action).await,
    }
}

async fn find_project(api: &ApiClient, slug: &str) -> Result<Project> {
    projects::find(api, slug)
        .await?
        .with_context(|| format!("project '{}' not found", slug))
}

async fn run_projects(api: &ApiClient, action: ProjectAction) -> Result<ExitCode> {
    match action {
        ProjectAction::List { json } => {
            let list = projects::list(api).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("No projects. Import one with: sirpi projects import <owner/repo>");
            } else {
                for project in &list {
                    formatter::print_project_summary(project);
                }
            }
        }
        ProjectAction::Show { project, json } => {
            let detail = projects::get_by_slug(api, &project)
                .await?
                .with_context(|| format!("project '{}' not found", project))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail.project)?);
            } else {
                formatter::print_project_summary(&detail.project);
                println!("  repository: {}", detail.project.repository_url);
                for generation in &detail.generations {
                    println!(
                        "  generation {} {} ({})",
                        generation.id, generation.status, generation.created_at
                    );
                }
            }
        }
        ProjectAction::Import {
            full_name,
            installation_id,
        } => {
            let project = projects::import_repository(api, &full_name, installation_id).await?;
            println!("Imported {} as '{}'", full_name, project.slug);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_generate(
    api: &ApiClient,
    config: &Config,
    project: &str,
    template: &str,
    provider: &str,
    agent_logs: bool,
) -> Result<ExitCode> {
    let project = find_project(api, project).await?;
    let template = TemplateType::from_str(template)?;
    let provider = CloudProvider::from_str(provider)?;

    let mut tracker = GenerationTracker::new();
    let outcome = workflow::session::run_generation(
        api,
        config,
        &project,
        template,
        provider,
        agent_logs,
        &mut tracker,
    )
    .await?;

    Ok(match outcome {
        GenerationOutcome::Completed => ExitCode::SUCCESS,
        GenerationOutcome::Failed => ExitCode::FAILURE,
        GenerationOutcome::Interrupted => ExitCode::from(130),
    })
}

async fn run_deploy(api: &ApiClient, config: &Config, action: DeployAction) -> Result<ExitCode> {
    let (slug, op) = match &action {
        DeployAction::Build { project } => (project.clone(), DeployOp::Build),
        DeployAction::Plan { project } => (project.clone(), DeployOp::Plan),
        DeployAction::Apply { project } => (project.clone(), DeployOp::Apply),
        DeployAction::Destroy { project, yes } => {
            if !yes && !confirm_destroy(project)? {
                println!("Aborted.");
                return Ok(ExitCode::SUCCESS);
            }
            (project.clone(), DeployOp::Destroy)
        }
        DeployAction::Poll { operation_id } => {
            let mut poller = LogPoller::new(operation_id.clone());
            let result = poller
                .follow(api, config.poll_interval, |line| println!("{line}"))
                .await;
            return Ok(match result.status.as_deref() {
                Some("failed") => {
                    if let Some(error) = result.error {
                        formatter::print_error(&error);
                    }
                    ExitCode::FAILURE
                }
                _ => ExitCode::SUCCESS,
            });
        }
    };

    let mut project = find_project(api, &slug).await?;
    let mut tracker = DeploymentTracker::new();
    deploy::session::restore_state(api, &project, &mut tracker).await;
    formatter::print_phase(tracker.phase());
    let mut view = LogView::new();

    let outcome =
        deploy::session::run_operation(api, config, &mut project, op, &mut tracker, &mut view)
            .await?;

    Ok(match outcome {
        Outcome::Succeeded => ExitCode::SUCCESS,
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::Interrupted => ExitCode::from(130),
    })
}

async fn run_pr(api: &ApiClient, action: PrAction) -> Result<ExitCode> {
    match action {
        PrAction::Create {
            project,
            base_branch,
        } => {
            let project = find_project(api, &project).await?;
            let generation = sirpi::api::workflow::generation_by_project(api, &project.id)
                .await?
                .context("no generation found; run 'sirpi generate' first")?;
            if generation.status != "completed" {
                bail!(
                    "latest generation is '{}'; wait for it to complete",
                    generation.status
                );
            }
            let response = pull_requests::create(
                api,
                &pull_requests::CreatePrRequest {
                    project_id: project.id.clone(),
                    generation_id: generation.id,
                    base_branch,
                },
            )
            .await?;
            println!("Created PR #{}: {}", response.pr_number, response.pr_url);
            for warning in &response.validation_warnings {
                println!("  warning: {warning}");
            }
        }
        PrAction::Status { project } => {
            let project = find_project(api, &project).await?;
            let status = pull_requests::status(api, &project.id).await?;
            println!(
                "PR #{} {} (merged: {}) {}",
                status.pr_number, status.state, status.merged, status.pr_url
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_env(api: &ApiClient, action: EnvAction) -> Result<ExitCode> {
    match action {
        EnvAction::List { project } => {
            let project = find_project(api, &project).await?;
            let vars = projects::env_vars(api, &project.id).await?;
            if vars.is_empty() {
                println!("No environment variables set.");
            }
            for var in &vars {
                let value = match (&var.value, var.is_secret) {
                    (Some(value), false) => value.clone(),
                    (Some(_), true) | (None, true) => "••••••".to_string(),
                    (None, false) => String::new(),
                };
                println!("{}={}", var.key, value);
            }
        }
        EnvAction::Set {
            project,
            vars,
            file,
        } => {
            let project = find_project(api, &project).await?;
            let mut env_vars = Vec::new();
            if let Some(path) = file {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {path}"))?;
                env_vars.extend(projects::parse_dotenv(&content));
            }
            env_vars.extend(projects::parse_dotenv(&vars.join("\n")));
            if env_vars.is_empty() {
                bail!("nothing to set; pass KEY=value pairs or --file");
            }
            projects::save_env_vars(api, &project.id, &env_vars).await?;
            println!("Saved {} variable(s).", env_vars.len());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_aws(api: &ApiClient, action: AwsAction) -> Result<ExitCode> {
    match action {
        AwsAction::Connect { project, role_arn } => {
            let project = find_project(api, &project).await?;
            cloud::connect_aws(api, &project.id, &role_arn).await?;
            println!("AWS connected. You can now deploy.");
        }
        AwsAction::Status { project } => {
            let project = find_project(api, &project).await?;
            let status = cloud::aws_status(api, &project.id).await?;
            println!(
                "connected: {} status: {} role: {}",
                status.aws_connected,
                status.aws_status,
                status.aws_role_arn.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Destroy is irreversible; require an interactive yes unless --yes.
fn confirm_destroy(slug: &str) -> Result<bool> {
    use std::io::{IsTerminal, Write};
    if !std::io::stdin().is_terminal() {
        return Ok(false);
    }
    print!("Destroy all infrastructure for '{slug}'? [y/N] ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let trimmed = input.trim().to_lowercase();
    Ok(trimmed == "y" || trimmed == "yes")
}
