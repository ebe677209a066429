//! SSE stream consumption: frame parsing, event classification, and
//! connection lifecycle management.

pub mod classifier;
pub mod connection;
pub mod events;
pub mod parser;

pub use classifier::Classifier;
pub use connection::{
    ConnectionState, StreamHandle, StreamManager, StreamPhase, StreamTarget, StreamTimings,
};
pub use events::{
    Classified, Completion, CompletionStatus, GeneratedFile, LogEntry, StreamEvent, Terminal,
    DEFAULT_COMPLETION_PHRASES,
};
pub use parser::{ChunkDecoder, FrameParser, SseFrame};
