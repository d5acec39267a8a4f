//! WorkListRefresher - keeps the shared check list current
//!
//! ```text
//! Timer tick → GET check list (basic auth) → decode → WorkList::replace
//!     ↑
//!     └─── Commands (RefreshNow, Shutdown)
//! ```
//!
//! A failed refresh leaves the previous list in place. The tick body runs
//! under the supervisor guard, so even a panic only costs one tick.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::checks::{WorkItem, WorkList};
use crate::config::NudgerConfig;
use crate::error::FetchError;
use crate::fetch::{FetchRequest, Fetcher};

use super::messages::RefresherCommand;
use super::supervisor::guarded;

/// Where and how to fetch the check list
#[derive(Debug, Clone)]
pub struct RefresherSettings {
    pub url: String,
    pub master_api_key: String,
    pub interval: Duration,
    pub timeout: Duration,
}

impl From<&NudgerConfig> for RefresherSettings {
    fn from(config: &NudgerConfig) -> Self {
        Self {
            url: config.checks_url.clone(),
            master_api_key: config.master_api_key.clone(),
            interval: config.refresh_interval,
            timeout: config.timeout,
        }
    }
}

pub struct WorkListRefresher {
    settings: RefresherSettings,
    fetcher: Fetcher,
    work_list: WorkList,
    command_rx: mpsc::Receiver<RefresherCommand>,
}

impl WorkListRefresher {
    pub fn new(
        settings: RefresherSettings,
        fetcher: Fetcher,
        work_list: WorkList,
        command_rx: mpsc::Receiver<RefresherCommand>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            work_list,
            command_rx,
        }
    }

    #[instrument(skip(self), fields(url = %self.settings.url))]
    pub async fn run(mut self) {
        debug!("starting check list refresher");

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    trace!("tick");
                    match guarded("refresh", self.refresh()).await {
                        Some(Ok(count)) => debug!("check list refreshed, {count} checks"),
                        Some(Err(e)) => error!("failed to refresh check list: {:#}", e),
                        None => {}
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        RefresherCommand::RefreshNow { respond_to } => {
                            debug!("received RefreshNow command");
                            let result = guarded("refresh", self.refresh())
                                .await
                                .unwrap_or_else(|| Err(anyhow::anyhow!("refresh panicked")));
                            let _ = respond_to.send(result);
                        }

                        RefresherCommand::Shutdown => {
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

        debug!("check list refresher stopped");
    }

    /// Fetch the check list and publish it
    ///
    /// On any error the current list is left untouched.
    async fn refresh(&self) -> Result<usize> {
        let request = FetchRequest::get(&self.settings.url, self.settings.timeout)
            .basic_auth(&self.settings.master_api_key);

        let fetched = self
            .fetcher
            .fetch(request)
            .await
            .context("failed to fetch check list")?
            .require_success()
            .context("check list endpoint rejected the request")?;

        let items: Vec<WorkItem> = match fetched.json() {
            Ok(items) => items,
            Err(FetchError::Decode(e)) => {
                error!("response body: {}", fetched.text());
                return Err(e).context("failed to decode checks");
            }
            Err(e) => return Err(e).context("failed to decode checks"),
        };

        let total = items.len();
        let items: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| {
                let valid = item.is_valid();
                if !valid {
                    warn!("dropping invalid check: {item:?}");
                }
                valid
            })
            .collect();

        if items.len() != total {
            info!("kept {} of {total} checks", items.len());
        }

        let count = items.len();
        self.work_list.replace(items).await;

        Ok(count)
    }
}

/// Handle for controlling a WorkListRefresher
#[derive(Clone)]
pub struct RefresherHandle {
    sender: mpsc::Sender<RefresherCommand>,
}

impl RefresherHandle {
    /// Spawn a refresher that publishes into `work_list`
    pub fn spawn(settings: RefresherSettings, fetcher: Fetcher, work_list: WorkList) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = WorkListRefresher::new(settings, fetcher, work_list, cmd_rx);
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Refresh immediately, returning the number of checks now in the list
    pub async fn refresh_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RefresherCommand::RefreshNow { respond_to: tx })
            .await
            .context("failed to send RefreshNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(RefresherCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
