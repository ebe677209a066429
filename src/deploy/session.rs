//! End-to-end deployment operations: start via REST, pump the SSE stream
//! into tracker and view, settle, then refetch project state wholesale.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::api::projects::Project;
use crate::api::{deployment, projects, ApiClient};
use crate::config::Config;
use crate::interrupt;
use crate::logs::{LogBuffer, GENERAL_LOG_CAP};
use crate::output::{formatter, logger};
use crate::stream::{Classified, StreamEvent, StreamManager, StreamTarget, Terminal};
use crate::ui::{LogView, PanelState};

use super::phase::DeployOp;
use super::tracker::{DeploymentTracker, StageStatus};

/// Outcome of one streamed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
    Interrupted,
}

/// How often the pump checks for Ctrl+C while waiting on stream events.
const INTERRUPT_POLL: Duration = Duration::from_millis(200);

/// Run one deployment operation to completion.
pub async fn run_operation(
    api: &ApiClient,
    config: &Config,
    project: &mut Project,
    op: DeployOp,
    tracker: &mut DeploymentTracker,
    view: &mut LogView,
) -> Result<Outcome> {
    interrupt::register_signal_handler().context("Failed to register signal handler")?;

    tracker.begin(op)?;
    view.activate(op);
    formatter::print_stage_header(op);

    let provider = project.provider();
    let mut manager = open_deploy_stream(api, config, provider, &project.id).await?;

    // Long operations routinely outlive proxy timeouts; fire the request and
    // let the stream carry the outcome. Short operations wait for the ack.
    match op {
        DeployOp::Apply | DeployOp::Destroy => {
            deployment::start_detached(api, provider, &project.id, op);
        }
        DeployOp::Build | DeployOp::Plan => {
            if let Err(err) = deployment::start(api, provider, &project.id, op).await {
                manager.close();
                tracker.fail(op, err.to_string());
                view.deactivate();
                formatter::print_error(&format!("Failed to start {op}: {err:#}"));
                return Ok(Outcome::Failed);
            }
        }
    }

    let outcome = pump(op, &mut manager, tracker, view).await;

    match outcome {
        Outcome::Succeeded => {
            tracker.succeed(op)?;
            let stage = tracker.stage(op);
            formatter::print_stage_result(op, stage.status, stage.duration_secs);
            settle_and_refetch(api, config, project, op).await;
            if op == DeployOp::Apply {
                if let Some(url) = &project.application_url {
                    println!("Application URL: {url}");
                }
            }
        }
        Outcome::Failed => {
            formatter::print_stage_result(op, StageStatus::Error, None);
            if let Some(error) = tracker.error() {
                formatter::print_error(error);
            }
        }
        Outcome::Interrupted => {
            manager.close();
            tracker.fail(op, "interrupted");
            interrupt::clear_interrupt();
        }
    }
    view.deactivate();
    Ok(outcome)
}

async fn open_deploy_stream(
    api: &ApiClient,
    config: &Config,
    provider: projects::CloudProvider,
    project_id: &str,
) -> Result<StreamManager> {
    let diagnostics = logger::setup_log_file();
    println!("Raw stream log: ");
    formatter::hyperlink(&diagnostics.display().to_string());

    let mut manager = StreamManager::new(api.http(), config.classifier(), config.timings)
        .with_diagnostics(diagnostics);
    let target = StreamTarget {
        id: project_id.to_string(),
        url: api.url(&deployment::logs_stream_path(provider, project_id)),
        token: api.bearer().await?,
    };
    manager.sync(true, Some(target));
    Ok(manager)
}

/// Drain classified events into the tracker and view until the stream ends.
async fn pump(
    op: DeployOp,
    manager: &mut StreamManager,
    tracker: &mut DeploymentTracker,
    view: &mut LogView,
) -> Outcome {
    let mut succeeded = false;
    let mut transport_error: Option<String> = None;

    loop {
        if interrupt::is_interrupted() {
            return Outcome::Interrupted;
        }
        let Some(handle) = manager.handle_mut() else {
            break;
        };
        let event = tokio::select! {
            event = handle.next_event() => event,
            _ = tokio::time::sleep(INTERRUPT_POLL) => continue,
        };
        let Some(Classified { event, terminal }) = event else {
            // Channel drained: the connection closed.
            break;
        };

        match event {
            StreamEvent::Log(entry) => {
                if view.on_append(op, 0) {
                    formatter::print_deploy_line(&entry);
                }
                tracker.append(op, entry);
            }
            StreamEvent::Error { message } => {
                if terminal.is_none() {
                    transport_error = Some(message);
                }
            }
            StreamEvent::Connected | StreamEvent::Status { .. } | StreamEvent::Complete(_) => {}
        }

        match terminal {
            Some(Terminal::Success { .. }) => {
                succeeded = true;
                manager.mark_complete();
            }
            Some(Terminal::Failure { message }) => {
                manager.mark_complete();
                tracker.fail(op, message);
                return Outcome::Failed;
            }
            None => {}
        }
    }

    if succeeded {
        Outcome::Succeeded
    } else {
        let message = transport_error.unwrap_or_else(|| "Connection lost".to_string());
        tracker.fail(op, message);
        Outcome::Failed
    }
}

/// Wait out the settle window, then replace project state wholesale (no
/// partial merge; a failed refetch keeps the stale copy).
async fn settle_and_refetch(api: &ApiClient, config: &Config, project: &mut Project, op: DeployOp) {
    let delay = match op {
        DeployOp::Apply => config.settle_after_apply(),
        DeployOp::Destroy => config.settle_after_destroy(),
        DeployOp::Build | DeployOp::Plan => return,
    };
    tokio::time::sleep(delay).await;
    if let Ok(Some(updated)) = projects::get_by_id(api, &project.id).await {
        *project = updated;
    }
}

/// Rehydrate tracker state from the backend's persisted operation logs.
/// Missing or unavailable records leave the tracker untouched.
pub async fn restore_state(api: &ApiClient, project: &Project, tracker: &mut DeploymentTracker) {
    if let Ok(records) = deployment::log_records(api, project.provider(), &project.id).await {
        if !records.is_empty() {
            tracker.restore(&records);
        }
    }
}

/// Follow the project's general deployment log tail. The buffer is capped
/// to bound memory for this long-lived stream.
pub async fn tail_logs(api: &ApiClient, config: &Config, project: &Project) -> Result<()> {
    interrupt::register_signal_handler().context("Failed to register signal handler")?;

    let mut buffer = LogBuffer::capped(GENERAL_LOG_CAP);
    let mut panel = PanelState::new("Deployment Logs");
    let mut manager = open_deploy_stream(api, config, project.provider(), &project.id).await?;

    loop {
        if interrupt::is_interrupted() {
            manager.close();
            interrupt::clear_interrupt();
            break;
        }
        let Some(handle) = manager.handle_mut() else {
            break;
        };
        let event = tokio::select! {
            event = handle.next_event() => event,
            _ = tokio::time::sleep(INTERRUPT_POLL) => continue,
        };
        let Some(Classified { event, terminal }) = event else {
            break;
        };

        match event {
            StreamEvent::Log(entry) => {
                let dropped = buffer.append(entry.clone());
                panel.on_trimmed(dropped);
                if panel.is_following() {
                    formatter::print_deploy_line(&entry);
                }
            }
            StreamEvent::Error { message } => {
                if terminal.is_none() {
                    formatter::print_error(&format!("{message} (re-run to reconnect)"));
                }
            }
            _ => {}
        }

        if let Some(terminal) = terminal {
            manager.mark_complete();
            if let Terminal::Failure { message } = terminal {
                formatter::print_error(&message);
            }
        }
    }
    Ok(())
}
