//! Event types for the backend's SSE streams.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Log phrases the backend emits when an operation finishes successfully.
///
/// The deployment streams do not always send an explicit `complete` event;
/// these substrings are the fallback detection. Overridable via
/// `[stream] completion_phrases` in `.sirpi.toml`.
pub const DEFAULT_COMPLETION_PHRASES: &[&str] = &[
    "Build complete!",
    "Image pushed successfully",
    "Terraform plan generated successfully",
    "Deployment completed successfully",
];

/// Classified event from one of the backend's push streams.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Log(LogEntry),
    Status {
        status: String,
        message: Option<String>,
    },
    Error {
        message: String,
    },
    Complete(Completion),
}

/// One log line, with optional structured fields on agent streams.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: String,
    pub agent: Option<String>,
    pub stage: Option<String>,
    pub level: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl LogEntry {
    /// A bare deployment log line with no structured fields.
    pub fn plain(message: impl Into<String>) -> Self {
        LogEntry {
            message: message.into(),
            agent: None,
            stage: None,
            level: None,
            received_at: Utc::now(),
        }
    }
}

/// Payload of a terminal `complete` event.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub status: CompletionStatus,
    pub files: Vec<GeneratedFile>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed,
    Failed,
}

/// Generated infrastructure file attached to a workflow completion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedFile {
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
}

/// How an operation reached its terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// `explicit` is false when success was detected from a completion
    /// phrase inside a log line rather than a tagged event.
    Success { explicit: bool },
    Failure { message: String },
}

/// Classifier output: the event plus its terminal disposition, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub event: StreamEvent,
    pub terminal: Option<Terminal>,
}

impl Classified {
    pub fn event(event: StreamEvent) -> Self {
        Classified {
            event,
            terminal: None,
        }
    }
}

/// Raw JSON structures for deserialization.

/// Untagged frame on the deployment log streams: `{"type": ..., "message": ...}`.
#[derive(Deserialize)]
pub(crate) struct RawLogFrame {
    #[serde(rename = "type")]
    pub frame_type: Option<String>,
    pub message: Option<String>,
}

/// Payload of `log` / `agent_log` events on the workflow and agent streams.
#[derive(Deserialize)]
pub(crate) struct RawAgentLog {
    pub agent: Option<String>,
    pub stage: Option<String>,
    pub message: Option<String>,
    pub content: Option<String>,
    pub level: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub(crate) struct RawStatus {
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RawError {
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RawComplete {
    pub status: Option<String>,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
    pub error: Option<String>,
}
