//! Execution log streaming.
//!
//! While an execution runs, a background poller fetches the most recent log
//! entries on a fixed interval and publishes them on a channel. The stream
//! owns the receiving side and merges each batch into its [`LogBuffer`].
//! Anything that can produce [`StreamEvent`]s can feed the same channel, so
//! the polling transport can be replaced without touching the buffer logic.
//!
//! The poller is cancelled when the stream goes idle or is dropped.

use crate::config::LogStreamConfig;
use crate::error::ServiceError;
use crate::logs::{ExecutionLogEntry, LogBuffer};
use crate::service::LogSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wireflow_core::FlowId;

const CHANNEL_CAPACITY: usize = 16;

/// Whether an execution is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Executing,
}

/// What the poller publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The latest entries, in whatever order the source returned them.
    Batch(Vec<ExecutionLogEntry>),
    /// A poll failed; the next tick retries.
    PollFailed(ServiceError),
}

struct Poller {
    flow_id: FlowId,
    source: Arc<dyn LogSource>,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// The execution log panel's state: idle or executing, plus the buffer.
pub struct ExecutionLogStream {
    config: LogStreamConfig,
    state: StreamState,
    buffer: LogBuffer,
    poller: Option<Poller>,
    failures: u32,
}

impl ExecutionLogStream {
    #[must_use]
    pub fn new(config: LogStreamConfig) -> Self {
        Self {
            buffer: LogBuffer::new(config.buffer_capacity),
            config,
            state: StreamState::Idle,
            poller: None,
            failures: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state == StreamState::Executing
    }

    #[must_use]
    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Poll failures seen since the last start.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Enters `Executing`: clears the buffer and starts polling `source`.
    ///
    /// Must be called from within a tokio runtime. Restarting an executing
    /// stream cancels the previous poller first.
    pub fn start(&mut self, flow_id: FlowId, source: Arc<dyn LogSource>) {
        self.cancel_poller();
        self.buffer.clear();
        self.failures = 0;

        let (tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            flow_id.clone(),
            Arc::clone(&source),
            self.config.fetch_limit,
            self.config.poll_interval(),
            cancel.clone(),
            tx,
        ));
        debug!(flow_id = %flow_id, "Log polling started");

        self.poller = Some(Poller {
            flow_id,
            source,
            events,
            cancel,
            task,
        });
        self.state = StreamState::Executing;
    }

    /// Waits for the next poller event and applies it.
    ///
    /// Returns the number of entries added to the buffer, or `None` if the
    /// poller has stopped. Never resolves while idle.
    pub async fn next_event(&mut self) -> Option<usize> {
        let Some(poller) = self.poller.as_mut() else {
            return std::future::pending().await;
        };
        let event = poller.events.recv().await;
        match event {
            Some(event) => Some(self.apply(event)),
            None => {
                self.poller = None;
                None
            }
        }
    }

    /// Applies every event already queued, without waiting.
    pub fn drain(&mut self) -> usize {
        let mut added = 0;
        while let Some(event) = self
            .poller
            .as_mut()
            .and_then(|poller| poller.events.try_recv().ok())
        {
            added += self.apply(event);
        }
        added
    }

    /// Merges entries delivered outside the poller, such as the logs
    /// carried by the trigger response.
    pub fn merge(&mut self, entries: Vec<ExecutionLogEntry>) -> usize {
        self.buffer.merge(entries)
    }

    /// Leaves `Executing` after the completion signal.
    ///
    /// Applies queued events, polls once more so entries written just
    /// before completion are not lost, then stops the poller. The final
    /// poll is bounded by one poll interval.
    pub async fn finish(&mut self) -> usize {
        let mut added = self.drain();
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
            let flush = poller.source.get_logs(&poller.flow_id, self.config.fetch_limit);
            match tokio::time::timeout(self.config.poll_interval(), flush).await {
                Ok(Ok(entries)) => added += self.buffer.merge(entries),
                Ok(Err(e)) => {
                    self.failures += 1;
                    warn!(flow_id = %poller.flow_id, error = %e, "Final log flush failed");
                }
                Err(_) => {
                    self.failures += 1;
                    warn!(flow_id = %poller.flow_id, "Final log flush timed out");
                }
            }
            debug!(flow_id = %poller.flow_id, added, "Log polling finished");
        }
        self.state = StreamState::Idle;
        added
    }

    /// Leaves `Executing` immediately, without a final poll.
    pub fn stop(&mut self) {
        self.cancel_poller();
        self.state = StreamState::Idle;
    }

    fn cancel_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
            poller.task.abort();
        }
    }

    fn apply(&mut self, event: StreamEvent) -> usize {
        match event {
            StreamEvent::Batch(entries) => self.buffer.merge(entries),
            StreamEvent::PollFailed(_) => {
                self.failures += 1;
                0
            }
        }
    }
}

impl Drop for ExecutionLogStream {
    fn drop(&mut self) {
        self.cancel_poller();
    }
}

impl std::fmt::Debug for ExecutionLogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionLogStream")
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

async fn poll_loop(
    flow_id: FlowId,
    source: Arc<dyn LogSource>,
    limit: usize,
    period: Duration,
    cancel: CancellationToken,
    events: mpsc::Sender<StreamEvent>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = source.get_logs(&flow_id, limit) => result,
        };
        let event = match result {
            Ok(entries) => StreamEvent::Batch(entries),
            Err(e) => {
                warn!(flow_id = %flow_id, error = %e, "Log poll failed, retrying next tick");
                StreamEvent::PollFailed(e)
            }
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
}
