//! CLI argument parsing using clap.

use clap::{Parser, Subcommand};

/// Terminal client for the Sirpi infrastructure generation service.
///
/// Import a repository, run the AI generation workflow, open a pull request
/// with the generated files, and drive build/plan/apply/destroy against a
/// cloud provider while following streamed logs.
#[derive(Parser, Debug)]
#[command(name = "sirpi", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Backend API base URL
    #[arg(long, global = true, value_name = "URL", env = "SIRPI_API_URL")]
    pub api_url: Option<String>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a .sirpi.toml with commented defaults
    Init,
    /// Manage projects (list, show, import)
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Run the AI generation workflow for a project
    Generate {
        /// Project slug
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Deployment template: cloud-run, gke-autopilot, ecs-fargate, lambda
        #[arg(long, value_name = "TEMPLATE", default_value = "cloud-run")]
        template: String,

        /// Cloud provider: gcp, aws
        #[arg(long, value_name = "PROVIDER", default_value = "gcp")]
        provider: String,

        /// Also stream agent thinking logs
        #[arg(long)]
        agent_logs: bool,
    },
    /// Run deployment operations with streamed logs
    Deploy {
        #[command(subcommand)]
        action: DeployAction,
    },
    /// Follow a project's general deployment log stream
    Logs {
        /// Project slug
        #[arg(value_name = "PROJECT")]
        project: String,
    },
    /// Manage pull requests for generated files
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },
    /// Read and write project environment variables
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },
    /// GCP credential status
    Gcp {
        #[command(subcommand)]
        action: GcpAction,
    },
    /// AWS account connection
    Aws {
        #[command(subcommand)]
        action: AwsAction,
    },
}

/// Project subcommands.
#[derive(Subcommand, Debug)]
pub enum ProjectAction {
    /// List all projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one project with its generation history
    Show {
        /// Project slug
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a repository as a new project
    Import {
        /// Repository full name (owner/repo)
        #[arg(value_name = "FULL_NAME")]
        full_name: String,

        /// GitHub App installation id
        #[arg(long, value_name = "ID")]
        installation_id: i64,
    },
}

/// Deployment subcommands.
#[derive(Subcommand, Debug)]
pub enum DeployAction {
    /// Build and push the container image
    Build {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
    /// Generate the deployment plan
    Plan {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
    /// Apply the plan and deploy
    Apply {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
    /// Destroy all deployed infrastructure
    Destroy {
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Follow an operation's logs via polling instead of SSE
    Poll {
        /// Operation id
        #[arg(value_name = "OPERATION_ID")]
        operation_id: String,
    },
}

/// Pull request subcommands.
#[derive(Subcommand, Debug)]
pub enum PrAction {
    /// Open a PR with the latest generated files
    Create {
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Base branch for the PR
        #[arg(long, value_name = "BRANCH")]
        base_branch: Option<String>,
    },
    /// Show PR status for a project
    Status {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
}

/// Environment variable subcommands.
#[derive(Subcommand, Debug)]
pub enum EnvAction {
    /// List a project's environment variables
    List {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
    /// Set environment variables from KEY=value pairs or a dotenv file
    Set {
        #[arg(value_name = "PROJECT")]
        project: String,

        /// KEY=value pairs
        #[arg(value_name = "VARS")]
        vars: Vec<String>,

        /// Read variables from a dotenv-style file
        #[arg(long, value_name = "FILE")]
        file: Option<String>,
    },
}

/// GCP subcommands.
#[derive(Subcommand, Debug)]
pub enum GcpAction {
    /// Check whether GCP credentials are fresh
    Status,
}

/// AWS subcommands.
#[derive(Subcommand, Debug)]
pub enum AwsAction {
    /// Verify and attach an AWS role to a project
    Connect {
        #[arg(value_name = "PROJECT")]
        project: String,

        /// IAM role ARN to deploy with
        #[arg(value_name = "ROLE_ARN")]
        role_arn: String,
    },
    /// Show a project's AWS connection status
    Status {
        #[arg(value_name = "PROJECT")]
        project: String,
    },
}
