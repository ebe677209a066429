//! Incremental log polling for deployment operations.
//!
//! Fallback follower for environments where the SSE stream is unavailable:
//! fetches logs past a cursor on a fixed interval until the backend reports
//! completion.

use anyhow::Result;
use std::time::Duration;

use crate::api::deployment::{self, OperationLogs};
use crate::api::ApiClient;

/// Terminal outcome reported by the backend when polling finishes.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Cursor-tracking follower for one operation's log feed.
#[derive(Debug)]
pub struct LogPoller {
    operation_id: String,
    next_index: u64,
    completed: bool,
}

impl LogPoller {
    pub fn new(operation_id: impl Into<String>) -> Self {
        LogPoller {
            operation_id: operation_id.into(),
            next_index: 0,
            completed: false,
        }
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// One poll round. The cursor advances before entries are handed to the
    /// caller, so a re-poll never re-delivers a batch.
    pub async fn poll_once(&mut self, api: &ApiClient) -> Result<OperationLogs> {
        if self.completed {
            return Ok(OperationLogs {
                logs: Vec::new(),
                next_index: self.next_index,
                completed: true,
                status: None,
                error: None,
            });
        }
        let batch = deployment::operation_logs(api, &self.operation_id, self.next_index).await?;
        self.next_index = batch.next_index;
        if batch.completed {
            self.completed = true;
        }
        Ok(batch)
    }

    /// Follow the feed until the backend reports completion. Individual
    /// poll errors are transient and skipped.
    pub async fn follow<F>(&mut self, api: &ApiClient, interval: Duration, mut on_log: F) -> PollResult
    where
        F: FnMut(String),
    {
        loop {
            if let Ok(batch) = self.poll_once(api).await {
                for line in batch.logs {
                    on_log(line);
                }
                if batch.completed {
                    return PollResult {
                        status: batch.status,
                        error: batch.error,
                    };
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Stop delivering batches (user cancel).
    pub fn stop(&mut self) {
        self.completed = true;
    }
}
