//! Infrastructure generation workflow: phase machine, run tracker, and the
//! streaming session.

pub mod phase;
pub mod session;
pub mod tracker;

pub use phase::GenerationPhase;
pub use session::GenerationOutcome;
pub use tracker::GenerationTracker;
