//! Push-stream connection lifecycle and reconnection guarding.
//!
//! Each logical operation owns one [`StreamManager`]. The manager opens at
//! most one connection at a time, latches once a terminal signal has been
//! observed so re-enabling the same instance is a no-op, and resets only for
//! a new stream id or an explicit [`StreamManager::clear`].

use anyhow::{bail, Result};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::output::logger;

use super::classifier::Classifier;
use super::events::{Classified, StreamEvent, Terminal};
use super::parser::ChunkDecoder;

/// Lifecycle of one stream connection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Connecting,
    Open,
    Complete,
    Errored,
}

/// Valid phase transitions:
/// - idle -> connecting
/// - connecting -> open
/// - connecting -> errored
/// - open -> complete
/// - open -> errored
/// - errored -> connecting (manual reconnect)
fn is_valid_transition(from: StreamPhase, to: StreamPhase) -> bool {
    use StreamPhase::*;
    matches!(
        (from, to),
        (Idle, Connecting)
            | (Connecting, Open)
            | (Connecting, Errored)
            | (Open, Complete)
            | (Open, Errored)
            | (Errored, Connecting)
    )
}

/// Observable connection state shared between the reader task and consumers.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    phase: StreamPhase,
    error: Option<String>,
}

impl ConnectionState {
    pub fn new() -> Self {
        ConnectionState {
            phase: StreamPhase::Idle,
            error: None,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.phase == StreamPhase::Open
    }

    pub fn is_complete(&self) -> bool {
        self.phase == StreamPhase::Complete
    }

    /// Apply a transition, rejecting any move the lifecycle does not allow.
    pub fn transition(&mut self, next: StreamPhase) -> Result<()> {
        if !is_valid_transition(self.phase, next) {
            bail!(
                "invalid stream transition {:?} -> {:?}",
                self.phase,
                next
            );
        }
        self.phase = next;
        Ok(())
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::new()
    }
}

/// Grace windows between a terminal signal and connection close, so trailing
/// messages still land before teardown.
#[derive(Debug, Clone, Copy)]
pub struct StreamTimings {
    /// After a phrase-detected completion (2s: the backend keeps printing
    /// summary lines after the marker).
    pub phrase_grace: Duration,
    /// After an explicit `complete` event.
    pub complete_grace: Duration,
}

impl Default for StreamTimings {
    fn default() -> Self {
        StreamTimings {
            phrase_grace: Duration::from_secs(2),
            complete_grace: Duration::from_secs(1),
        }
    }
}

/// Identity plus endpoint of one logical stream.
#[derive(Debug, Clone)]
pub struct StreamTarget {
    /// Logical instance id (project or session id). A change in id is a new
    /// instance and resets the completion latch.
    pub id: String,
    pub url: String,
    pub token: Option<String>,
}

/// A live (or finished) connection: classified events plus shared state.
pub struct StreamHandle {
    events: mpsc::Receiver<Classified>,
    state: Arc<Mutex<ConnectionState>>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Receive the next classified event; `None` once the stream has closed
    /// and the channel is drained.
    pub async fn next_event(&mut self) -> Option<Classified> {
        self.events.recv().await
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    pub fn phase(&self) -> StreamPhase {
        lock(&self.state).phase
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn is_complete(&self) -> bool {
        lock(&self.state).is_complete()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).is_connected()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn close(&self) {
        self.task.abort();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connection manager for one logical operation.
pub struct StreamManager {
    client: reqwest::Client,
    classifier: Classifier,
    timings: StreamTimings,
    diagnostics: Option<PathBuf>,
    current_id: Option<String>,
    completed: bool,
    handle: Option<StreamHandle>,
}

impl StreamManager {
    pub fn new(client: reqwest::Client, classifier: Classifier, timings: StreamTimings) -> Self {
        StreamManager {
            client,
            classifier,
            timings,
            diagnostics: None,
            current_id: None,
            completed: false,
            handle: None,
        }
    }

    /// Route dropped/malformed frames to a diagnostics file.
    pub fn with_diagnostics(mut self, path: PathBuf) -> Self {
        self.diagnostics = Some(path);
        self
    }

    /// Reconcile the desired `(enabled, target)` pair with the connection.
    ///
    /// Opens a connection only when enabled, a target is present, no prior
    /// connection exists, and this instance has not already completed. A
    /// changed target id is a new instance: the old connection closes and
    /// the completion latch resets. Returns true when a connection was
    /// opened by this call.
    pub fn sync(&mut self, enabled: bool, target: Option<StreamTarget>) -> bool {
        let next_id = target.as_ref().map(|t| t.id.clone());
        if next_id != self.current_id {
            self.drop_handle();
            self.completed = false;
            self.current_id = next_id;
        }

        self.absorb_completion();

        if !enabled || target.is_none() {
            self.drop_handle();
            return false;
        }
        if self.completed || self.handle.is_some() {
            return false;
        }

        let target = match target {
            Some(t) => t,
            None => return false,
        };
        self.handle = Some(open_stream(
            self.client.clone(),
            target,
            self.classifier.clone(),
            self.timings,
            self.diagnostics.clone(),
        ));
        true
    }

    /// Manual reconnect after a transport error. Refused once complete.
    pub fn reconnect(&mut self, target: StreamTarget) -> bool {
        self.absorb_completion();
        if self.completed {
            return false;
        }
        self.drop_handle();
        self.current_id = Some(target.id.clone());
        self.handle = Some(open_stream(
            self.client.clone(),
            target,
            self.classifier.clone(),
            self.timings,
            self.diagnostics.clone(),
        ));
        true
    }

    pub fn handle_mut(&mut self) -> Option<&mut StreamHandle> {
        self.handle.as_mut()
    }

    /// Latch completion for this instance (also picked up automatically
    /// from the connection state on the next `sync`).
    pub fn mark_complete(&mut self) {
        self.completed = true;
    }

    pub fn is_complete(&mut self) -> bool {
        self.absorb_completion();
        self.completed
    }

    /// Close the connection and reset the completion latch; the next `sync`
    /// for the same id may open a fresh connection.
    pub fn clear(&mut self) {
        self.drop_handle();
        self.completed = false;
    }

    /// Close the connection, keeping the latch.
    pub fn close(&mut self) {
        self.absorb_completion();
        self.drop_handle();
    }

    fn absorb_completion(&mut self) {
        if let Some(handle) = &self.handle {
            if handle.is_complete() {
                self.completed = true;
            }
        }
    }

    fn drop_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
        }
    }
}

fn open_stream(
    client: reqwest::Client,
    target: StreamTarget,
    classifier: Classifier,
    timings: StreamTimings,
    diagnostics: Option<PathBuf>,
) -> StreamHandle {
    let (tx, rx) = mpsc::channel(256);
    let state = Arc::new(Mutex::new(ConnectionState::new()));
    let task = tokio::spawn(read_stream(
        client,
        target,
        classifier,
        timings,
        diagnostics,
        tx,
        Arc::clone(&state),
    ));
    StreamHandle {
        events: rx,
        state,
        task,
    }
}

async fn read_stream(
    client: reqwest::Client,
    target: StreamTarget,
    classifier: Classifier,
    timings: StreamTimings,
    diagnostics: Option<PathBuf>,
    tx: mpsc::Sender<Classified>,
    state: Arc<Mutex<ConnectionState>>,
) {
    set_phase(&state, StreamPhase::Connecting);

    let mut request = client
        .get(&target.url)
        .header("Accept", "text/event-stream");
    if let Some(token) = &target.token {
        request = request.bearer_auth(token);
    }

    let response = match request.send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            transport_error(
                &state,
                &tx,
                format!("Stream request failed: {}", response.status()),
            )
            .await;
            return;
        }
        Err(err) => {
            transport_error(&state, &tx, format!("Connection failed: {err}")).await;
            return;
        }
    };

    set_phase(&state, StreamPhase::Open);

    let mut body = response.bytes_stream();
    let mut decoder = ChunkDecoder::new();
    // Set once a terminal success arrives; the stream drains until then.
    let mut close_at: Option<tokio::time::Instant> = None;

    loop {
        let chunk = match close_at {
            Some(deadline) => match tokio::time::timeout_at(deadline, body.next()).await {
                Ok(chunk) => chunk,
                // Grace window elapsed: clean close.
                Err(_) => return,
            },
            None => body.next().await,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                if !lock(&state).is_complete() {
                    transport_error(&state, &tx, format!("Connection lost: {err}")).await;
                }
                return;
            }
            None => {
                // EOF is normal after completion, an error before it.
                if !lock(&state).is_complete() {
                    transport_error(&state, &tx, "Connection lost".to_string()).await;
                }
                return;
            }
        };

        for frame in decoder.push_chunk(&bytes) {
            let Some(classified) = classifier.classify(&frame) else {
                if let Some(path) = &diagnostics {
                    logger::append_line(
                        path,
                        &format!(
                            "dropped frame: event={} data={}",
                            frame.event.as_deref().unwrap_or("-"),
                            frame.data
                        ),
                    );
                }
                continue;
            };

            let terminal = classified.terminal.clone();
            if tx.send(classified).await.is_err() {
                // Consumer went away; nothing left to deliver.
                return;
            }

            match terminal {
                Some(Terminal::Success { explicit }) => {
                    // First terminal wins; replayed completions are no-ops.
                    if !lock(&state).is_complete() {
                        set_phase(&state, StreamPhase::Complete);
                        let grace = if explicit {
                            timings.complete_grace
                        } else {
                            timings.phrase_grace
                        };
                        close_at = Some(tokio::time::Instant::now() + grace);
                    }
                }
                Some(Terminal::Failure { message }) => {
                    if !lock(&state).is_complete() {
                        {
                            let mut guard = lock(&state);
                            guard.error = Some(message);
                        }
                        set_phase(&state, StreamPhase::Complete);
                    }
                    // Failures close without a grace window.
                    return;
                }
                None => {}
            }
        }
    }
}

async fn transport_error(
    state: &Mutex<ConnectionState>,
    tx: &mpsc::Sender<Classified>,
    message: String,
) {
    {
        let mut guard = lock(state);
        guard.error = Some(message.clone());
    }
    set_phase(state, StreamPhase::Errored);
    let _ = tx
        .send(Classified::event(StreamEvent::Error { message }))
        .await;
}

fn set_phase(state: &Mutex<ConnectionState>, next: StreamPhase) {
    // The reader drives a legal sequence; an invalid move here means the
    // connection already reached a terminal phase, so the update is dropped.
    let _ = lock(state).transition(next);
}

fn lock(state: &Mutex<ConnectionState>) -> std::sync::MutexGuard<'_, ConnectionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
