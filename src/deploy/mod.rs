//! Deployment operations: phase machine, shared tracker, and streamed
//! operation sessions.

pub mod phase;
pub mod session;
pub mod tracker;

pub use phase::{DeployOp, DeployPhase};
pub use session::Outcome;
pub use tracker::{DeploymentTracker, StageStatus};
