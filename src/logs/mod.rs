//! Log buffering and presentation filtering.

pub mod buffer;
pub mod filters;

pub use buffer::{LogBuffer, GENERAL_LOG_CAP};
