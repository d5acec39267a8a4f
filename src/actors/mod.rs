//! Actor-based pipelines of the nudger and the relay
//!
//! Each actor runs as an independent async task communicating via Tokio channels.
//!
//! ## Nudger
//!
//! ```text
//!   checks endpoint            metrics provider
//!         │                          ▲
//!  ┌──────▼────────────┐      ┌──────┴──────────┐
//!  │ WorkListRefresher │      │  PollScheduler  │  one task per check per tick
//!  └──────┬────────────┘      └──────┬──────────┘
//!         │ replace                  │ 3 samples per poll
//!  ┌──────▼──────┐  snapshot   ┌─────▼──────────┐
//!  │  WorkList   ├────────────►│ sample channel │  bounded mpsc
//!  └─────────────┘             └─────┬──────────┘
//!                                    │
//!                           ┌────────▼─────────┐
//!                           │ Dispatcher       │ → pacemaker
//!                           │ (PacemakerSink)  │
//!                           └──────────────────┘
//! ```
//!
//! ## Relay
//!
//! ```text
//!  POST /pacemaker → alert channel → Dispatcher (SlackSink) → Slack webhook
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Data**: Samples and alerts flow through bounded mpsc channels to a single consumer
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod dispatcher;
pub mod messages;
pub mod refresher;
pub mod scheduler;
pub mod supervisor;
