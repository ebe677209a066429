//! Generation workflow state: phase, progress, logs, and generated files.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::logs::LogBuffer;
use crate::stream::{Completion, CompletionStatus, GeneratedFile, LogEntry};

use super::phase::{self, GenerationPhase};

/// State of one infrastructure-generation run.
#[derive(Debug, Clone)]
pub struct GenerationTracker {
    phase: GenerationPhase,
    message: String,
    progress: u8,
    logs: LogBuffer,
    files: Vec<GeneratedFile>,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<u64>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        GenerationTracker {
            phase: GenerationPhase::NotStarted,
            message: String::new(),
            progress: 0,
            logs: LogBuffer::new(),
            files: Vec::new(),
            error: None,
            started_at: None,
            duration_secs: None,
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            GenerationPhase::Started | GenerationPhase::Analyzing | GenerationPhase::Generating
        )
    }

    /// User action: begin a run. Valid from `not_started` (and from terminal
    /// states via `reset`).
    pub fn start(&mut self) -> Result<()> {
        phase::transition(&mut self.phase, GenerationPhase::Started)?;
        self.message = "Starting infrastructure generation...".to_string();
        self.progress = 5;
        self.logs.clear();
        self.files.clear();
        self.error = None;
        self.started_at = Some(Utc::now());
        self.duration_secs = None;
        Ok(())
    }

    /// Apply a `status` event. Unknown statuses and out-of-order repeats are
    /// dropped; the stream is free to re-announce the current stage.
    pub fn on_status(&mut self, status: &str, message: Option<&str>) {
        if let Some(next) = GenerationPhase::from_status(status) {
            if phase::transition(&mut self.phase, next).is_ok() {
                if let Some(message) = message {
                    self.message = message.to_string();
                }
            }
        }
    }

    /// Append a workflow log line and advance the per-agent progress bar.
    pub fn on_log(&mut self, entry: LogEntry) {
        if let Some(agent) = entry.agent.as_deref() {
            self.progress = phase::progress_for_agent(agent);
        }
        self.logs.append(entry);
    }

    /// Apply the terminal `complete` event.
    pub fn on_complete(&mut self, completion: &Completion) {
        match completion.status {
            CompletionStatus::Completed => {
                let _ = phase::transition(&mut self.phase, GenerationPhase::Completed);
                self.message = "Infrastructure generated successfully!".to_string();
                self.progress = 100;
                self.files = completion.files.clone();
            }
            CompletionStatus::Failed => {
                self.fail(
                    completion
                        .error
                        .clone()
                        .unwrap_or_else(|| "Generation failed".to_string()),
                );
            }
        }
        self.duration_secs = self
            .started_at
            .map(|started| (Utc::now() - started).num_seconds().max(0) as u64);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        let _ = phase::transition(&mut self.phase, GenerationPhase::Failed);
        self.message = "Generation failed".to_string();
        self.error = Some(message);
    }

    /// User retry after a terminal state: back to `not_started` with all
    /// run state cleared (generation failures do not resume mid-run).
    pub fn reset(&mut self) -> Result<()> {
        phase::transition(&mut self.phase, GenerationPhase::NotStarted)?;
        self.message.clear();
        self.progress = 0;
        self.logs.clear();
        self.files.clear();
        self.error = None;
        self.started_at = None;
        self.duration_secs = None;
        Ok(())
    }
}

impl Default for GenerationTracker {
    fn default() -> Self {
        GenerationTracker::new()
    }
}
