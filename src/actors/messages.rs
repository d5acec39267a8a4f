//! Message types for actor communication
//!
//! Commands travel over a per-actor mpsc channel; request/response commands
//! carry a oneshot sender for the reply.

use reqwest::StatusCode;
use tokio::sync::oneshot;

/// Commands that can be sent to a WorkListRefresher
#[derive(Debug)]
pub enum RefresherCommand {
    /// Refresh immediately, replying with the new list length
    RefreshNow {
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Stop after the current refresh
    Shutdown,
}

/// Commands that can be sent to a PollScheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one tick and wait for all of its polls to finish
    TickNow {
        respond_to: oneshot::Sender<TickReport>,
    },

    /// Stop scheduling new ticks (in-flight polls run to completion)
    Shutdown,
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Number of items in the snapshot the tick used
    pub polled: usize,

    /// Polls that produced samples
    pub succeeded: usize,

    /// Total samples pushed onto the output channel
    pub samples: usize,
}

/// Commands that can be sent to a Dispatcher
#[derive(Debug)]
pub enum DispatcherCommand {
    GetStats {
        respond_to: oneshot::Sender<DispatchStats>,
    },

    /// Stop draining the channel
    Shutdown,
}

/// Outcome of one outbound delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub success: bool,

    /// HTTP status, if a response was received
    pub status: Option<StatusCode>,

    pub error: Option<String>,
}

impl DispatchResult {
    pub fn delivered(status: StatusCode) -> Self {
        Self {
            success: true,
            status: Some(status),
            error: None,
        }
    }

    pub fn failed(status: Option<StatusCode>, error: impl ToString) -> Self {
        Self {
            success: false,
            status,
            error: Some(error.to_string()),
        }
    }
}

/// Running totals of a dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    pub last: Option<DispatchResult>,
}

impl DispatchStats {
    pub fn record(&mut self, result: DispatchResult) {
        if result.success {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
        self.last = Some(result);
    }

    pub fn total(&self) -> u64 {
        self.delivered + self.failed
    }
}
