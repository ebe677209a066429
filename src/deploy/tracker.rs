//! Shared deployment state: per-stage log buffers, statuses, milestones,
//! and the phase machine driven by classified terminal events.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::api::deployment::LogRecord;
use crate::logs::LogBuffer;
use crate::stream::LogEntry;

use super::phase::{self, DeployOp, DeployPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Idle,
    Running,
    Success,
    Error,
}

/// One collapsible stage: a log buffer plus its lifecycle status.
#[derive(Debug, Clone)]
pub struct Stage {
    pub status: StageStatus,
    pub buffer: LogBuffer,
    pub duration_secs: Option<u64>,
    started_at: Option<DateTime<Utc>>,
}

impl Stage {
    fn new() -> Self {
        Stage {
            status: StageStatus::Idle,
            buffer: LogBuffer::new(),
            duration_secs: None,
            started_at: None,
        }
    }

    fn reset(&mut self) {
        self.status = StageStatus::Idle;
        self.buffer.clear();
        self.duration_secs = None;
        self.started_at = None;
    }

    fn finish(&mut self, status: StageStatus) {
        self.status = status;
        self.duration_secs = self
            .started_at
            .map(|started| (Utc::now() - started).num_seconds().max(0) as u64);
    }
}

/// Deployment state for one project.
///
/// Operations in the same family must not run concurrently; `begin` enforces
/// this with a busy guard. Phase moves only on classified terminal events
/// and explicit user actions (start, retry, destroy).
#[derive(Debug, Clone)]
pub struct DeploymentTracker {
    phase: DeployPhase,
    image_pushed: bool,
    plan_generated: bool,
    deployed: bool,
    error: Option<String>,
    build: Stage,
    plan: Stage,
    deploy: Stage,
    destroy: Stage,
}

impl DeploymentTracker {
    pub fn new() -> Self {
        DeploymentTracker {
            phase: DeployPhase::NotStarted,
            image_pushed: false,
            plan_generated: false,
            deployed: false,
            error: None,
            build: Stage::new(),
            plan: Stage::new(),
            deploy: Stage::new(),
            destroy: Stage::new(),
        }
    }

    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn image_pushed(&self) -> bool {
        self.image_pushed
    }

    pub fn plan_generated(&self) -> bool {
        self.plan_generated
    }

    pub fn deployed(&self) -> bool {
        self.deployed
    }

    pub fn stage(&self, op: DeployOp) -> &Stage {
        match op {
            DeployOp::Build => &self.build,
            DeployOp::Plan => &self.plan,
            DeployOp::Apply => &self.deploy,
            DeployOp::Destroy => &self.destroy,
        }
    }

    fn stage_mut(&mut self, op: DeployOp) -> &mut Stage {
        match op {
            DeployOp::Build => &mut self.build,
            DeployOp::Plan => &mut self.plan,
            DeployOp::Apply => &mut self.deploy,
            DeployOp::Destroy => &mut self.destroy,
        }
    }

    /// Whether any stage is currently streaming.
    pub fn is_busy(&self) -> bool {
        [&self.build, &self.plan, &self.deploy, &self.destroy]
            .iter()
            .any(|s| s.status == StageStatus::Running)
    }

    /// Start an operation: clears its previous logs and moves the phase to
    /// the operation's running state. Rejected while another operation is
    /// streaming or when the phase does not allow the operation.
    pub fn begin(&mut self, op: DeployOp) -> Result<()> {
        if self.is_busy() {
            bail!("another operation is still streaming");
        }
        if let Some(running) = op.running_phase() {
            phase::transition(&mut self.phase, running)
                .with_context(|| format!("cannot start {op}"))?;
        }
        self.error = None;
        let stage = self.stage_mut(op);
        stage.reset();
        stage.status = StageStatus::Running;
        stage.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn append(&mut self, op: DeployOp, entry: LogEntry) {
        self.stage_mut(op).buffer.append(entry);
    }

    /// Record a terminal success for the operation. Destroy success performs
    /// the full reset: phase back to `not_started`, milestones cleared, and
    /// the build/plan/deploy buffers emptied.
    pub fn succeed(&mut self, op: DeployOp) -> Result<()> {
        self.stage_mut(op).finish(StageStatus::Success);
        match op {
            DeployOp::Build => {
                phase::transition(&mut self.phase, DeployPhase::Built)?;
                self.image_pushed = true;
            }
            DeployOp::Plan => {
                phase::transition(&mut self.phase, DeployPhase::Planned)?;
                self.plan_generated = true;
            }
            DeployOp::Apply => {
                phase::transition(&mut self.phase, DeployPhase::Deployed)?;
                self.deployed = true;
            }
            DeployOp::Destroy => self.full_reset(),
        }
        Ok(())
    }

    /// Record a terminal failure. The stage's log lines stay untouched.
    pub fn fail(&mut self, op: DeployOp, message: impl Into<String>) {
        self.stage_mut(op).finish(StageStatus::Error);
        if self.phase != DeployPhase::Failed {
            phase::force(&mut self.phase, DeployPhase::Failed);
        }
        self.error = Some(message.into());
    }

    /// User retry after a failure: restore the last-good phase, except
    /// destroy failures which reset to `not_started`.
    pub fn retry(&mut self, op: DeployOp) -> Result<()> {
        if self.phase != DeployPhase::Failed {
            bail!("retry is only valid from the failed state");
        }
        let target = match op {
            DeployOp::Destroy => DeployPhase::NotStarted,
            _ => self.last_good_phase(),
        };
        phase::transition(&mut self.phase, target)?;
        self.error = None;
        self.stage_mut(op).status = StageStatus::Idle;
        Ok(())
    }

    /// The furthest milestone reached, used as the retry target.
    pub fn last_good_phase(&self) -> DeployPhase {
        if self.deployed {
            DeployPhase::Deployed
        } else if self.plan_generated {
            DeployPhase::Planned
        } else if self.image_pushed {
            DeployPhase::Built
        } else {
            DeployPhase::NotStarted
        }
    }

    fn full_reset(&mut self) {
        phase::force(&mut self.phase, DeployPhase::NotStarted);
        self.image_pushed = false;
        self.plan_generated = false;
        self.deployed = false;
        self.error = None;
        self.build.reset();
        self.plan.reset();
        self.deploy.reset();
        // The destroy stage keeps its own logs for review.
    }

    /// Rehydrate stages and phase from the backend's persisted log records.
    pub fn restore(&mut self, records: &[LogRecord]) {
        for record in records {
            let Some(op) = DeployOp::from_record_type(&record.operation_type) else {
                continue;
            };
            let stage = self.stage_mut(op);
            stage.buffer.clear();
            for line in &record.logs {
                stage.buffer.append(LogEntry::plain(line.clone()));
            }
            stage.status = match record.status.as_str() {
                "success" => StageStatus::Success,
                "error" => StageStatus::Error,
                _ => StageStatus::Idle,
            };
            stage.duration_secs = record.duration_seconds;

            if stage.status == StageStatus::Success {
                match op {
                    DeployOp::Build => self.image_pushed = true,
                    DeployOp::Plan => {
                        self.image_pushed = true;
                        self.plan_generated = true;
                    }
                    DeployOp::Apply => {
                        self.image_pushed = true;
                        self.plan_generated = true;
                        self.deployed = true;
                    }
                    DeployOp::Destroy => {}
                }
            }
        }
        let next = self.last_good_phase();
        phase::force(&mut self.phase, next);
    }
}

impl Default for DeploymentTracker {
    fn default() -> Self {
        DeploymentTracker::new()
    }
}
