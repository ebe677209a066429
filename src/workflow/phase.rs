//! Generation workflow phase machine.

use anyhow::{anyhow, Result};
use std::fmt;

/// Phase of one infrastructure-generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    NotStarted,
    Started,
    Analyzing,
    Generating,
    Completed,
    Failed,
}

impl GenerationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPhase::NotStarted => "not_started",
            GenerationPhase::Started => "started",
            GenerationPhase::Analyzing => "analyzing",
            GenerationPhase::Generating => "generating",
            GenerationPhase::Completed => "completed",
            GenerationPhase::Failed => "failed",
        }
    }

    /// Map a backend status string onto a phase. Unknown statuses return
    /// `None` and leave the tracker untouched.
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            "not_started" => Some(GenerationPhase::NotStarted),
            "started" => Some(GenerationPhase::Started),
            "analyzing" => Some(GenerationPhase::Analyzing),
            "generating" => Some(GenerationPhase::Generating),
            "completed" => Some(GenerationPhase::Completed),
            "failed" => Some(GenerationPhase::Failed),
            _ => None,
        }
    }

    /// Position in the happy path; `Failed` has no rank.
    fn rank(&self) -> Option<u8> {
        match self {
            GenerationPhase::NotStarted => Some(0),
            GenerationPhase::Started => Some(1),
            GenerationPhase::Analyzing => Some(2),
            GenerationPhase::Generating => Some(3),
            GenerationPhase::Completed => Some(4),
            GenerationPhase::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationPhase::Completed | GenerationPhase::Failed)
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid transitions: forward along the happy path (status events may skip
/// stages), failure from any non-terminal state, and reset from a terminal
/// state back to `not_started` for a fresh run.
fn is_valid_transition(from: GenerationPhase, to: GenerationPhase) -> bool {
    use GenerationPhase::*;
    if to == Failed {
        return !from.is_terminal();
    }
    if to == NotStarted {
        return from.is_terminal();
    }
    match (from.rank(), to.rank()) {
        (Some(a), Some(b)) => a < b,
        _ => false,
    }
}

pub fn transition(phase: &mut GenerationPhase, next: GenerationPhase) -> Result<()> {
    if !is_valid_transition(*phase, next) {
        return Err(anyhow!(
            "invalid generation transition from '{}' to '{}'",
            phase,
            next
        ));
    }
    *phase = next;
    Ok(())
}

/// Progress percentage shown while a given agent is reporting.
pub fn progress_for_agent(agent: &str) -> u8 {
    match agent {
        "orchestrator" => 10,
        "github_analyzer" => 25,
        "context_analyzer" => 50,
        "dockerfile_generator" => 75,
        "terraform_generator" => 90,
        _ => 50,
    }
}
