//! Terminal view state.

pub mod state;

pub use state::{LogView, PanelState};
