//! Shared state of the relay handlers

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, trace, warn};

use crate::alerts::AlertEvent;

/// Shared state passed to all relay handlers
#[derive(Clone)]
pub struct RelayState {
    /// Producer side of the alert channel drained by the Slack dispatcher
    pub alert_tx: mpsc::Sender<AlertEvent>,
}

impl RelayState {
    pub fn new(alert_tx: mpsc::Sender<AlertEvent>) -> Self {
        Self { alert_tx }
    }

    /// Alerts accepted but not yet picked up by the dispatcher
    pub fn queued(&self) -> usize {
        self.alert_tx.max_capacity() - self.alert_tx.capacity()
    }

    /// Queue an alert for delivery without waiting on the consumer
    ///
    /// If the channel is momentarily full the send continues in a background
    /// task so the HTTP response is not held up.
    pub fn enqueue(&self, alert: AlertEvent) {
        match self.alert_tx.try_send(alert) {
            Ok(()) => trace!("alert queued"),
            Err(TrySendError::Full(alert)) => {
                warn!("alert channel full, deferring send");
                let alert_tx = self.alert_tx.clone();
                tokio::spawn(async move {
                    if alert_tx.send(alert).await.is_err() {
                        error!("alert channel closed, dropping alert");
                    }
                });
            }
            Err(TrySendError::Closed(alert)) => {
                error!("alert channel closed, dropping alert for {}", alert.check);
            }
        }
    }
}
