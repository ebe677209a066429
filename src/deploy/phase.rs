//! Deployment phase machine and transition validation.

use anyhow::{anyhow, Result};
use std::fmt;

/// One deployment operation kind, as named by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployOp {
    Build,
    Plan,
    Apply,
    Destroy,
}

impl DeployOp {
    /// Path segment used by the backend's operation endpoints and persisted
    /// log records.
    pub fn as_path(&self) -> &'static str {
        match self {
            DeployOp::Build => "build_image",
            DeployOp::Plan => "plan",
            DeployOp::Apply => "apply",
            DeployOp::Destroy => "destroy",
        }
    }

    pub fn from_record_type(s: &str) -> Option<Self> {
        match s {
            "build_image" => Some(DeployOp::Build),
            "plan" => Some(DeployOp::Plan),
            "apply" => Some(DeployOp::Apply),
            "destroy" => Some(DeployOp::Destroy),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DeployOp::Build => "Build Logs",
            DeployOp::Plan => "Deployment Summary",
            DeployOp::Apply => "Deployment Logs",
            DeployOp::Destroy => "Destroy Logs",
        }
    }

    /// Phase while this operation is streaming. Destroy runs as a sub-flow
    /// and leaves the phase untouched until it resolves.
    pub fn running_phase(&self) -> Option<DeployPhase> {
        match self {
            DeployOp::Build => Some(DeployPhase::Building),
            DeployOp::Plan => Some(DeployPhase::Planning),
            DeployOp::Apply => Some(DeployPhase::Deploying),
            DeployOp::Destroy => None,
        }
    }

    pub fn success_phase(&self) -> Option<DeployPhase> {
        match self {
            DeployOp::Build => Some(DeployPhase::Built),
            DeployOp::Plan => Some(DeployPhase::Planned),
            DeployOp::Apply => Some(DeployPhase::Deployed),
            DeployOp::Destroy => None,
        }
    }
}

impl fmt::Display for DeployOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Deployment workflow phase. Exactly one active value per project at a
/// time; `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    NotStarted,
    Building,
    Built,
    Planning,
    Planned,
    Deploying,
    Deployed,
    Failed,
}

impl DeployPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployPhase::NotStarted => "not_started",
            DeployPhase::Building => "building",
            DeployPhase::Built => "built",
            DeployPhase::Planning => "planning",
            DeployPhase::Planned => "planned",
            DeployPhase::Deploying => "deploying",
            DeployPhase::Deployed => "deployed",
            DeployPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid phase transitions:
/// - not_started -> building -> built -> planning -> planned -> deploying -> deployed
/// - any active state -> failed
/// - failed -> a milestone phase (retry restores the last-good state)
fn is_valid_transition(from: DeployPhase, to: DeployPhase) -> bool {
    use DeployPhase::*;
    matches!(
        (from, to),
        (NotStarted, Building)
            | (Building, Built)
            | (Built, Planning)
            | (Planning, Planned)
            | (Planned, Deploying)
            | (Deploying, Deployed)
            | (NotStarted, Failed)
            | (Building, Failed)
            | (Built, Failed)
            | (Planning, Failed)
            | (Planned, Failed)
            | (Deploying, Failed)
            // A destroy failure from the deployed state.
            | (Deployed, Failed)
            | (Failed, NotStarted)
            | (Failed, Built)
            | (Failed, Planned)
            | (Failed, Deployed)
    )
}

/// Apply a transition with validation.
pub fn transition(phase: &mut DeployPhase, next: DeployPhase) -> Result<()> {
    if !is_valid_transition(*phase, next) {
        return Err(anyhow!(
            "invalid deployment transition from '{}' to '{}'",
            phase,
            next
        ));
    }
    *phase = next;
    Ok(())
}

/// Force the phase to a known state, bypassing validation. Used when
/// restoring from persisted log records and for the destroy full-reset.
pub fn force(phase: &mut DeployPhase, next: DeployPhase) {
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeployPhase::*;

    #[test]
    fn happy_path_is_legal() {
        let mut phase = NotStarted;
        for next in [Building, Built, Planning, Planned, Deploying, Deployed] {
            transition(&mut phase, next).unwrap();
        }
        assert_eq!(phase, Deployed);
    }

    #[test]
    fn failure_reachable_from_active_states() {
        for from in [NotStarted, Building, Built, Planning, Planned, Deploying, Deployed] {
            let mut phase = from;
            transition(&mut phase, Failed).unwrap();
        }
    }

    #[test]
    fn retry_restores_milestone_phases() {
        for target in [NotStarted, Built, Planned, Deployed] {
            let mut phase = Failed;
            transition(&mut phase, target).unwrap();
        }
    }

    #[test]
    fn skipping_stages_is_rejected() {
        let mut phase = NotStarted;
        assert!(transition(&mut phase, Planning).is_err());
        assert!(transition(&mut phase, Deployed).is_err());
        assert_eq!(phase, NotStarted);
    }

    #[test]
    fn deployed_cannot_restart_without_reset() {
        let mut phase = Deployed;
        assert!(transition(&mut phase, Building).is_err());
        // The destroy full-reset uses force.
        force(&mut phase, NotStarted);
        transition(&mut phase, Building).unwrap();
    }

    #[test]
    fn op_paths_round_trip() {
        for op in [DeployOp::Build, DeployOp::Plan, DeployOp::Apply, DeployOp::Destroy] {
            assert_eq!(DeployOp::from_record_type(op.as_path()), Some(op));
        }
        assert_eq!(DeployOp::from_record_type("unknown"), None);
    }
}
