//! Dispatcher - the single consumer at the end of each pipeline
//!
//! ```text
//! channel (FIFO) → Sink::deliver(item) → DispatchResult → stats + log
//!     ↑
//!     └─── Commands (GetStats, Shutdown)
//! ```
//!
//! Items are delivered one at a time in the order they were received. A failed
//! delivery is logged and counted, then the loop moves on to the next item.
//! Because delivery is awaited inline, a slow sink fills the channel and makes
//! producers wait on `send`; that is the only flow control in the pipeline.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use super::messages::{DispatchResult, DispatchStats, DispatcherCommand};
use super::supervisor::guarded;

/// Destination of a dispatcher
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    type Item: std::fmt::Debug + Send + 'static;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Deliver one item. Failures are reported in the result, never retried.
    async fn deliver(&self, item: Self::Item) -> DispatchResult;
}

pub struct Dispatcher<S: Sink> {
    sink: S,
    item_rx: mpsc::Receiver<S::Item>,
    command_rx: mpsc::Receiver<DispatcherCommand>,
    stats: DispatchStats,
}

impl<S: Sink> Dispatcher<S> {
    pub fn new(
        sink: S,
        item_rx: mpsc::Receiver<S::Item>,
        command_rx: mpsc::Receiver<DispatcherCommand>,
    ) -> Self {
        Self {
            sink,
            item_rx,
            command_rx,
            stats: DispatchStats::default(),
        }
    }

    #[instrument(skip(self), fields(sink = %self.sink.name()))]
    pub async fn run(mut self) {
        debug!("starting dispatcher");

        loop {
            tokio::select! {
                item = self.item_rx.recv() => {
                    match item {
                        Some(item) => self.dispatch(item).await,
                        None => {
                            debug!("all producers gone, stopping");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        DispatcherCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.stats.clone());
                        }

                        DispatcherCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!(
            "dispatcher stopped ({} delivered, {} failed)",
            self.stats.delivered, self.stats.failed
        );
    }

    async fn dispatch(&mut self, item: S::Item) {
        trace!("dispatching {item:?}");

        let result = guarded("dispatch", self.sink.deliver(item))
            .await
            .unwrap_or_else(|| DispatchResult::failed(None, "delivery panicked"));

        if result.success {
            trace!("delivered to {}", self.sink.name());
        } else {
            error!(
                "delivery to {} failed: {}",
                self.sink.name(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.stats.record(result);
    }
}

/// Handle for querying and stopping a Dispatcher
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<DispatcherCommand>,
}

impl DispatcherHandle {
    /// Spawn a dispatcher draining `item_rx` into `sink`
    pub fn spawn<S: Sink>(sink: S, item_rx: mpsc::Receiver<S::Item>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = Dispatcher::new(sink, item_rx, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn stats(&self) -> Result<DispatchStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DispatcherCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        if self.sender.send(DispatcherCommand::Shutdown).await.is_err() {
            warn!("dispatcher already stopped");
        }
        Ok(())
    }
}
