//! PollScheduler - fans out one provider poll per check per tick
//!
//! ```text
//! Timer tick → WorkList snapshot → spawn poll(item) × N → Sample × 3 each → sample channel
//!     ↑
//!     └─── Commands (TickNow, Shutdown)
//! ```
//!
//! Polls are independent tasks. A failed poll logs and produces nothing; the
//! others are unaffected. Timer-driven polls are fire-and-forget, while
//! `TickNow` waits for the tick's polls and reports what they produced.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::checks::{WorkItem, WorkList};
use crate::config::NudgerConfig;
use crate::fetch::{FetchRequest, Fetcher};
use crate::metrics::{Sample, samples_for};
use crate::provider::{API_KEY_HEADER, ProviderResponse, target_url};

use super::messages::{SchedulerCommand, TickReport};
use super::supervisor::guarded;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Provider URL template, see [`target_url`]
    pub provider_url: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub sample_ttl: u64,
    pub max_concurrent_polls: Option<usize>,
}

impl From<&NudgerConfig> for SchedulerSettings {
    fn from(config: &NudgerConfig) -> Self {
        Self {
            provider_url: config.provider_url.clone(),
            interval: config.poll_interval,
            timeout: config.timeout,
            sample_ttl: config.sample_ttl,
            max_concurrent_polls: config.max_concurrent_polls,
        }
    }
}

/// Everything a single poll task needs, shared across the tasks of all ticks
struct PollContext {
    settings: SchedulerSettings,
    fetcher: Fetcher,
    sample_tx: mpsc::Sender<Sample>,
    permits: Option<Arc<Semaphore>>,
}

pub struct PollScheduler {
    context: Arc<PollContext>,
    work_list: WorkList,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl PollScheduler {
    pub fn new(
        settings: SchedulerSettings,
        fetcher: Fetcher,
        work_list: WorkList,
        sample_tx: mpsc::Sender<Sample>,
        command_rx: mpsc::Receiver<SchedulerCommand>,
    ) -> Self {
        let permits = settings
            .max_concurrent_polls
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            context: Arc::new(PollContext {
                settings,
                fetcher,
                sample_tx,
                permits,
            }),
            work_list,
            command_rx,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting poll scheduler");

        // First poll after one full period; the refresher needs a moment anyway
        let period = self.context.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(polls) = guarded("poll tick", self.spawn_polls()).await {
                        // Detached: the next tick does not wait for these
                        trace!("spawned {} polls", polls.len());
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SchedulerCommand::TickNow { respond_to } => {
                            debug!("received TickNow command");
                            let polls = guarded("poll tick", self.spawn_polls())
                                .await
                                .unwrap_or_default();
                            let report = Self::collect(polls).await;
                            let _ = respond_to.send(report);
                        }

                        SchedulerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("poll scheduler stopped");
    }

    /// Start one poll task per item in the current snapshot
    async fn spawn_polls(&self) -> Vec<JoinHandle<Option<usize>>> {
        let snapshot = self.work_list.snapshot().await;
        debug!("tick: {} checks", snapshot.len());

        (0..snapshot.len())
            .map(|index| {
                let context = Arc::clone(&self.context);
                let snapshot = Arc::clone(&snapshot);

                tokio::spawn(async move {
                    let item = &snapshot[index];
                    guarded("poll", context.poll(item)).await.flatten()
                })
            })
            .collect()
    }

    async fn collect(polls: Vec<JoinHandle<Option<usize>>>) -> TickReport {
        let mut report = TickReport {
            polled: polls.len(),
            ..Default::default()
        };

        for poll in polls {
            match poll.await {
                Ok(Some(samples)) => {
                    report.succeeded += 1;
                    report.samples += samples;
                }
                Ok(None) => {}
                Err(e) => error!("poll task failed: {e}"),
            }
        }

        report
    }
}

impl PollContext {
    /// Poll one target and emit its samples
    ///
    /// Returns the number of samples sent, or `None` if the poll failed.
    #[instrument(
        skip(self, item),
        fields(target = %item.target_id, routing_key = %item.routing_key)
    )]
    async fn poll(&self, item: &WorkItem) -> Option<usize> {
        let _permit = match &self.permits {
            Some(permits) => Some(Arc::clone(permits).acquire_owned().await.ok()?),
            None => None,
        };

        let samples = match self.fetch_samples(item).await {
            Ok(samples) => samples,
            Err(e) => {
                error!("failed to poll {item}: {:#}", e);
                return None;
            }
        };

        let count = samples.len();
        for sample in samples {
            if self.sample_tx.send(sample).await.is_err() {
                warn!("sample channel closed, dropping samples for {item}");
                return None;
            }
        }

        trace!("emitted {count} samples");
        Some(count)
    }

    async fn fetch_samples(&self, item: &WorkItem) -> Result<Vec<Sample>> {
        let url = target_url(&self.settings.provider_url, &item.target_id);
        let request = FetchRequest::get(url, self.settings.timeout)
            .header(API_KEY_HEADER, &item.target_credential);

        let response: ProviderResponse = self
            .fetcher
            .fetch(request)
            .await
            .context("provider request failed")?
            .require_success()
            .context("provider rejected the request")?
            .json()
            .context("couldn't decode provider response")?;

        let name = response.name().unwrap_or(&item.target_id);

        Ok(samples_for(item, name, response.summary(), self.settings.sample_ttl))
    }
}

/// Handle for controlling a PollScheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub fn spawn(
        settings: SchedulerSettings,
        fetcher: Fetcher,
        work_list: WorkList,
        sample_tx: mpsc::Sender<Sample>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PollScheduler::new(settings, fetcher, work_list, sample_tx, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Run one tick now and wait for its polls to finish
    pub async fn tick_now(&self) -> Result<TickReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await
            .context("failed to send TickNow command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SchedulerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
