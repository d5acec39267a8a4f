//! Metric nudger and alert relay for a pacemaker heartbeat aggregator
//!
//! - `nudger` polls the metrics provider for every registered target and
//!   forwards each reading to pacemaker as a sample.
//! - `taut` receives pacemaker alerts and relays active ones to Slack.

pub mod actors;
pub mod alerts;
pub mod api;
pub mod checks;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod heartbeat;
pub mod history;
pub mod metrics;
pub mod provider;
pub mod slack;
