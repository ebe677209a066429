//! Classification of raw SSE frames into stream events.
//!
//! All completion detection lives here: explicit `complete`/`error` events,
//! orchestrator stage markers on agent streams, and the phrase heuristic on
//! plain deployment log lines. Malformed payloads classify to `None` and are
//! dropped by the connection without tearing down the stream.

use chrono::Utc;

use super::events::*;
use super::parser::SseFrame;

#[derive(Debug, Clone)]
pub struct Classifier {
    phrases: Vec<String>,
}

impl Classifier {
    pub fn new(phrases: Vec<String>) -> Self {
        Classifier { phrases }
    }

    pub fn with_default_phrases() -> Self {
        Classifier::new(
            DEFAULT_COMPLETION_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        )
    }

    /// Check a log message against the configured completion phrases.
    pub fn matches_completion_phrase(&self, message: &str) -> bool {
        self.phrases.iter().any(|p| message.contains(p))
    }

    /// Classify one frame. Returns `None` for malformed or unknown payloads.
    pub fn classify(&self, frame: &SseFrame) -> Option<Classified> {
        match frame.event.as_deref() {
            Some("connected") => Some(Classified::event(StreamEvent::Connected)),
            Some("status") => self.classify_status(&frame.data),
            Some("log") | Some("agent_log") => self.classify_agent_log(&frame.data),
            Some("complete") => self.classify_complete(&frame.data),
            Some("error") => self.classify_error(&frame.data),
            Some(_) => None,
            // Unnamed frames carry the deployment streams' `{"type": ...}` payload.
            None => self.classify_message(&frame.data),
        }
    }

    fn classify_status(&self, data: &str) -> Option<Classified> {
        let raw: RawStatus = serde_json::from_str(data).ok()?;
        Some(Classified::event(StreamEvent::Status {
            status: raw.status?,
            message: raw.message,
        }))
    }

    fn classify_agent_log(&self, data: &str) -> Option<Classified> {
        let raw: RawAgentLog = serde_json::from_str(data).ok()?;
        let entry = LogEntry {
            message: raw.message.or(raw.content).unwrap_or_default(),
            agent: raw.agent,
            stage: raw.stage,
            level: raw.level,
            received_at: raw.timestamp.unwrap_or_else(Utc::now),
        };

        // The orchestrator's completed/failed stages end the stream.
        let terminal = if entry.agent.as_deref() == Some("orchestrator") {
            match entry.stage.as_deref() {
                Some("completed") => Some(Terminal::Success { explicit: true }),
                Some("failed") => Some(Terminal::Failure {
                    message: entry.message.clone(),
                }),
                _ => None,
            }
        } else {
            None
        };
        let terminal = terminal.or_else(|| {
            self.matches_completion_phrase(&entry.message)
                .then_some(Terminal::Success { explicit: false })
        });

        Some(Classified {
            event: StreamEvent::Log(entry),
            terminal,
        })
    }

    fn classify_complete(&self, data: &str) -> Option<Classified> {
        let raw: RawComplete = serde_json::from_str(data).ok()?;
        let status = match raw.status.as_deref() {
            Some("failed") => CompletionStatus::Failed,
            _ => CompletionStatus::Completed,
        };
        let terminal = match status {
            CompletionStatus::Completed => Terminal::Success { explicit: true },
            CompletionStatus::Failed => Terminal::Failure {
                message: raw
                    .error
                    .clone()
                    .unwrap_or_else(|| "Stream error".to_string()),
            },
        };
        Some(Classified {
            event: StreamEvent::Complete(Completion {
                status,
                files: raw.files,
                error: raw.error,
            }),
            terminal: Some(terminal),
        })
    }

    fn classify_error(&self, data: &str) -> Option<Classified> {
        let raw: RawError = serde_json::from_str(data).ok()?;
        let message = raw
            .error
            .or(raw.message)
            .unwrap_or_else(|| "Stream error".to_string());
        Some(Classified {
            event: StreamEvent::Error {
                message: message.clone(),
            },
            terminal: Some(Terminal::Failure { message }),
        })
    }

    fn classify_message(&self, data: &str) -> Option<Classified> {
        let raw: RawLogFrame = serde_json::from_str(data).ok()?;
        match raw.frame_type.as_deref() {
            Some("connected") => Some(Classified::event(StreamEvent::Connected)),
            Some("log") => {
                let message = raw.message.unwrap_or_default();
                let terminal = self
                    .matches_completion_phrase(&message)
                    .then_some(Terminal::Success { explicit: false });
                Some(Classified {
                    event: StreamEvent::Log(LogEntry::plain(message)),
                    terminal,
                })
            }
            Some("complete") => Some(Classified {
                event: StreamEvent::Complete(Completion {
                    status: CompletionStatus::Completed,
                    files: Vec::new(),
                    error: None,
                }),
                terminal: Some(Terminal::Success { explicit: true }),
            }),
            Some("error") => {
                let message = raw.message.unwrap_or_else(|| "Stream error".to_string());
                Some(Classified {
                    event: StreamEvent::Error {
                        message: message.clone(),
                    },
                    terminal: Some(Terminal::Failure { message }),
                })
            }
            // Server-side idle timeout: transient, the consumer may reconnect.
            Some("timeout") => Some(Classified::event(StreamEvent::Error {
                message: raw
                    .message
                    .unwrap_or_else(|| "Stream timed out".to_string()),
            })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: Some(event.to_string()),
            data: data.to_string(),
        }
    }

    fn message(data: &str) -> SseFrame {
        SseFrame {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn plain_log_line_is_appended_without_terminal() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&message(r#"{"type":"log","message":"Building layer 1/5"}"#))
            .unwrap();
        assert_eq!(out.terminal, None);
        match out.event {
            StreamEvent::Log(entry) => assert_eq!(entry.message, "Building layer 1/5"),
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn completion_phrase_is_terminal_success_without_complete_tag() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&message(
                r#"{"type":"log","message":"Deployment completed successfully"}"#,
            ))
            .unwrap();
        assert_eq!(out.terminal, Some(Terminal::Success { explicit: false }));
        // The line itself still classifies as a log entry.
        assert!(matches!(out.event, StreamEvent::Log(_)));
    }

    #[test]
    fn all_default_phrases_detect_completion() {
        let c = Classifier::with_default_phrases();
        for phrase in DEFAULT_COMPLETION_PHRASES {
            assert!(
                c.matches_completion_phrase(&format!("...{phrase}...")),
                "phrase {phrase:?} should match"
            );
        }
    }

    #[test]
    fn explicit_complete_frame_is_terminal() {
        let c = Classifier::with_default_phrases();
        let out = c.classify(&message(r#"{"type":"complete"}"#)).unwrap();
        assert_eq!(out.terminal, Some(Terminal::Success { explicit: true }));
    }

    #[test]
    fn error_frame_is_terminal_failure_with_message() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&message(r#"{"type":"error","message":"disk full"}"#))
            .unwrap();
        assert_eq!(
            out.terminal,
            Some(Terminal::Failure {
                message: "disk full".to_string()
            })
        );
    }

    #[test]
    fn timeout_frame_is_transient() {
        let c = Classifier::with_default_phrases();
        let out = c.classify(&message(r#"{"type":"timeout"}"#)).unwrap();
        assert_eq!(out.terminal, None);
        assert!(matches!(out.event, StreamEvent::Error { .. }));
    }

    #[test]
    fn orchestrator_completed_stage_is_terminal() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "agent_log",
                r#"{"agent":"orchestrator","stage":"completed","content":"done"}"#,
            ))
            .unwrap();
        assert_eq!(out.terminal, Some(Terminal::Success { explicit: true }));
    }

    #[test]
    fn orchestrator_failed_stage_is_terminal_failure() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "agent_log",
                r#"{"agent":"orchestrator","stage":"failed","content":"boom"}"#,
            ))
            .unwrap();
        assert_eq!(
            out.terminal,
            Some(Terminal::Failure {
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn non_orchestrator_stages_do_not_terminate() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "agent_log",
                r#"{"agent":"dockerfile_generator","stage":"failed","content":"retrying"}"#,
            ))
            .unwrap();
        assert_eq!(out.terminal, None);
    }

    #[test]
    fn workflow_log_event_carries_structured_fields() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "log",
                r#"{"agent":"terraform_generator","message":"writing main.tf","level":"info"}"#,
            ))
            .unwrap();
        match out.event {
            StreamEvent::Log(entry) => {
                assert_eq!(entry.agent.as_deref(), Some("terraform_generator"));
                assert_eq!(entry.level.as_deref(), Some("info"));
                assert_eq!(entry.message, "writing main.tf");
            }
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn complete_event_with_failed_status() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "complete",
                r#"{"status":"failed","error":"generation failed"}"#,
            ))
            .unwrap();
        assert_eq!(
            out.terminal,
            Some(Terminal::Failure {
                message: "generation failed".to_string()
            })
        );
        match out.event {
            StreamEvent::Complete(c) => assert_eq!(c.status, CompletionStatus::Failed),
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn complete_event_with_files() {
        let c = Classifier::with_default_phrases();
        let out = c
            .classify(&named(
                "complete",
                r#"{"status":"completed","files":[{"filename":"Dockerfile","content":"FROM rust","type":"docker"}]}"#,
            ))
            .unwrap();
        match out.event {
            StreamEvent::Complete(completion) => {
                assert_eq!(completion.files.len(), 1);
                assert_eq!(completion.files[0].filename, "Dockerfile");
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let c = Classifier::with_default_phrases();
        assert!(c.classify(&message("not json")).is_none());
        assert!(c.classify(&named("log", "{broken")).is_none());
        assert!(c.classify(&named("unknown_event", "{}")).is_none());
    }

    #[test]
    fn custom_phrases_override_defaults() {
        let c = Classifier::new(vec!["All systems go".to_string()]);
        assert!(c.matches_completion_phrase("... All systems go ..."));
        assert!(!c.matches_completion_phrase("Build complete!"));
    }
}
