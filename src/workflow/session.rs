//! Generation workflow session: start the run, then stream workflow events
//! and agent activity concurrently until a terminal signal.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::api::projects::{CloudProvider, Project};
use crate::api::workflow::{self, StartWorkflowRequest, TemplateType};
use crate::api::ApiClient;
use crate::config::Config;
use crate::interrupt;
use crate::logs::LogBuffer;
use crate::output::{formatter, logger};
use crate::stream::{Classified, StreamEvent, StreamHandle, StreamManager, StreamTarget, Terminal};

use super::phase::GenerationPhase;
use super::tracker::GenerationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Failed,
    Interrupted,
}

const INTERRUPT_POLL: Duration = Duration::from_millis(200);

enum Incoming {
    Workflow(Option<Classified>),
    Agent(Option<Classified>),
    Tick,
}

/// Run one generation workflow to completion, streaming its logs.
pub async fn run_generation(
    api: &ApiClient,
    config: &Config,
    project: &Project,
    template: TemplateType,
    provider: CloudProvider,
    follow_agents: bool,
    tracker: &mut GenerationTracker,
) -> Result<GenerationOutcome> {
    interrupt::register_signal_handler().context("Failed to register signal handler")?;

    let installation_id = project
        .installation_id
        .context("project has no GitHub installation; re-import the repository")?;

    tracker.start()?;
    formatter::print_generation_status(tracker.message(), tracker.progress());

    let started = match workflow::start(
        api,
        &StartWorkflowRequest {
            repository_url: project.repository_url.clone(),
            installation_id,
            template_type: template,
            cloud_provider: provider,
            project_id: Some(project.id.clone()),
        },
    )
    .await
    {
        Ok(started) => started,
        Err(err) => {
            tracker.fail(err.to_string());
            formatter::print_error(&format!("Failed to start generation: {err:#}"));
            return Ok(GenerationOutcome::Failed);
        }
    };
    println!("Session: {}", started.session_id);

    let token = api.bearer().await?;
    let diagnostics = logger::setup_log_file();

    let mut wf = StreamManager::new(api.http(), config.classifier(), config.timings)
        .with_diagnostics(diagnostics.clone());
    wf.sync(
        true,
        Some(StreamTarget {
            id: started.session_id.clone(),
            url: api.url(&workflow::stream_path(&started.session_id)),
            token: token.clone(),
        }),
    );

    let mut agent_buffer = LogBuffer::new();
    let mut agents = if follow_agents {
        let mut manager = StreamManager::new(api.http(), config.classifier(), config.timings)
            .with_diagnostics(diagnostics);
        manager.sync(
            true,
            Some(StreamTarget {
                id: started.session_id.clone(),
                url: api.url(&workflow::agent_logs_path(&started.session_id)),
                token,
            }),
        );
        Some(manager)
    } else {
        None
    };

    let outcome = loop {
        if interrupt::is_interrupted() {
            wf.close();
            if let Some(manager) = &mut agents {
                manager.close();
            }
            interrupt::clear_interrupt();
            tracker.fail("interrupted");
            break GenerationOutcome::Interrupted;
        }

        let incoming = {
            let wf_handle = wf.handle_mut();
            let agent_handle = agents.as_mut().and_then(|m| m.handle_mut());
            tokio::select! {
                event = next_or_pending(wf_handle) => Incoming::Workflow(event),
                event = next_or_pending(agent_handle) => Incoming::Agent(event),
                _ = tokio::time::sleep(INTERRUPT_POLL) => Incoming::Tick,
            }
        };

        match incoming {
            Incoming::Tick => continue,
            Incoming::Agent(None) => {
                // Agent stream finished; the workflow stream drives the loop.
                agents = None;
            }
            Incoming::Agent(Some(Classified { event, terminal })) => {
                if let StreamEvent::Log(entry) = event {
                    agent_buffer.append(entry.clone());
                    formatter::print_agent_line(&entry);
                }
                if terminal.is_some() {
                    if let Some(manager) = &mut agents {
                        manager.mark_complete();
                    }
                }
            }
            Incoming::Workflow(None) => {
                // Stream closed; decide by where the tracker landed.
                break match tracker.phase() {
                    GenerationPhase::Completed => GenerationOutcome::Completed,
                    GenerationPhase::Failed => GenerationOutcome::Failed,
                    _ => {
                        tracker.fail("Lost connection to server");
                        GenerationOutcome::Failed
                    }
                };
            }
            Incoming::Workflow(Some(Classified { event, terminal })) => {
                match event {
                    StreamEvent::Status { status, message } => {
                        tracker.on_status(&status, message.as_deref());
                        formatter::print_generation_status(tracker.message(), tracker.progress());
                    }
                    StreamEvent::Log(entry) => {
                        formatter::print_workflow_line(&entry);
                        tracker.on_log(entry);
                    }
                    StreamEvent::Complete(completion) => {
                        tracker.on_complete(&completion);
                    }
                    StreamEvent::Error { message } => {
                        if terminal.is_none() {
                            formatter::print_error(&message);
                        }
                    }
                    StreamEvent::Connected => {}
                }
                match terminal {
                    Some(Terminal::Success { .. }) => wf.mark_complete(),
                    Some(Terminal::Failure { message }) => {
                        wf.mark_complete();
                        if tracker.phase() != GenerationPhase::Failed {
                            tracker.fail(message);
                        }
                    }
                    None => {}
                }
            }
        }
    };

    match outcome {
        GenerationOutcome::Completed => {
            formatter::print_generation_status(tracker.message(), tracker.progress());
            formatter::print_generated_files(tracker.files());
            if let Some(secs) = tracker.duration_secs {
                println!("Finished in {secs}s");
            }
            if let Ok(Some(generation)) = workflow::generation_by_project(api, &project.id).await {
                println!("Generation {} — open a PR with: sirpi pr create {}", generation.id, project.slug);
            }
        }
        GenerationOutcome::Failed => {
            if let Some(error) = tracker.error() {
                formatter::print_error(error);
            }
        }
        GenerationOutcome::Interrupted => {}
    }

    Ok(outcome)
}

async fn next_or_pending(handle: Option<&mut StreamHandle>) -> Option<Classified> {
    match handle {
        Some(handle) => handle.next_event().await,
        None => std::future::pending().await,
    }
}
