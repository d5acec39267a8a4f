//! Configuration for both services
//!
//! Settings are layered: built-in defaults, then an optional JSON file (`-f`),
//! then environment variables and command line flags. Durations are written
//! as whole seconds in the file and on the command line.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use tracing::{trace, warn};

use crate::provider::DEFAULT_PROVIDER_URL;

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

fn default_checks_url() -> String {
    String::from("https://radalert.io/api/v1/checks/new_relic.nudger")
}

fn default_provider_url() -> String {
    String::from(DEFAULT_PROVIDER_URL)
}

fn default_pacemaker_url() -> String {
    String::from("http://127.0.0.1:7223")
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_sample_channel_capacity() -> usize {
    1024
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_alert_channel_capacity() -> usize {
    100_000
}

fn default_username() -> String {
    String::from("Rad Alert")
}

/// Settings for the nudger (poll New Relic, push heartbeats)
#[derive(Debug, Clone, Deserialize)]
pub struct NudgerConfig {
    /// Master key used as basic auth user against the check list endpoint
    #[serde(default)]
    pub master_api_key: String,

    /// Endpoint returning the list of checks to poll
    #[serde(default = "default_checks_url")]
    pub checks_url: String,

    /// Per-target provider endpoint, `{id}` is replaced with the target id
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Pacemaker instance receiving the heartbeats
    #[serde(default = "default_pacemaker_url")]
    pub pacemaker_url: String,

    #[serde(default = "default_interval", deserialize_with = "seconds")]
    pub poll_interval: Duration,

    #[serde(default = "default_interval", deserialize_with = "seconds")]
    pub refresh_interval: Duration,

    /// Timeout for check list and provider requests
    #[serde(default = "default_timeout", deserialize_with = "seconds")]
    pub timeout: Duration,

    /// Timeout for a single heartbeat delivery
    #[serde(default = "default_timeout", deserialize_with = "seconds")]
    pub dispatch_timeout: Duration,

    /// TTL attached to every sample, in seconds
    #[serde(default)]
    pub sample_ttl: u64,

    #[serde(default = "default_sample_channel_capacity")]
    pub sample_channel_capacity: usize,

    /// Upper bound on polls in flight per tick (unbounded when absent)
    #[serde(default)]
    pub max_concurrent_polls: Option<usize>,
}

impl Default for NudgerConfig {
    fn default() -> Self {
        Self {
            master_api_key: String::new(),
            checks_url: default_checks_url(),
            provider_url: default_provider_url(),
            pacemaker_url: default_pacemaker_url(),
            poll_interval: default_interval(),
            refresh_interval: default_interval(),
            timeout: default_timeout(),
            dispatch_timeout: default_timeout(),
            sample_ttl: 0,
            sample_channel_capacity: default_sample_channel_capacity(),
            max_concurrent_polls: None,
        }
    }
}

impl NudgerConfig {
    /// Resolve defaults, file and flags into the final configuration
    pub fn from_args(args: &NudgerArgs) -> anyhow::Result<Self> {
        let mut config = match &args.file {
            Some(path) => read_config_file::<Self>(path)?,
            None => Self::default(),
        };

        if let Some(key) = &args.apikey {
            config.master_api_key = key.clone();
        }
        if let Some(url) = &args.endpoint {
            config.checks_url = url.clone();
        }
        if let Some(url) = &args.provider {
            config.provider_url = url.clone();
        }
        if let Some(url) = &args.pacemaker {
            config.pacemaker_url = url.clone();
        }
        if let Some(secs) = args.interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.refresh_interval {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = args.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = args.dispatch_timeout {
            config.dispatch_timeout = Duration::from_secs(secs);
        }
        if let Some(ttl) = args.ttl {
            config.sample_ttl = ttl;
        }
        if let Some(limit) = args.max_concurrent_polls {
            config.max_concurrent_polls = Some(limit);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() || self.refresh_interval.is_zero() {
            bail!("poll and refresh intervals must be greater than zero");
        }
        if self.timeout.is_zero() || self.dispatch_timeout.is_zero() {
            bail!("timeouts must be greater than zero");
        }
        if self.sample_channel_capacity == 0 {
            bail!("sample channel capacity must be at least 1");
        }
        if self.max_concurrent_polls == Some(0) {
            bail!("max_concurrent_polls must be at least 1 when set");
        }
        if self.master_api_key.is_empty() {
            warn!("no master API key configured, check list requests will likely be rejected");
        }
        Ok(())
    }
}

/// Settings for taut (pacemaker alerts to Slack)
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Slack incoming webhook URL
    #[serde(default)]
    pub slack_webhook_url: String,

    /// Timeout for Slack calls
    #[serde(default = "default_timeout", deserialize_with = "seconds")]
    pub timeout: Duration,

    #[serde(default = "default_alert_channel_capacity")]
    pub alert_channel_capacity: usize,

    /// Bot name shown in Slack
    #[serde(default = "default_username")]
    pub username: String,

    /// Slack Web API base URL, used for the history lookup
    #[serde(default)]
    pub slack_api_url: Option<String>,

    /// Token for the Slack Web API; enables the history lookup
    #[serde(default)]
    pub slack_token: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            slack_webhook_url: String::new(),
            timeout: default_timeout(),
            alert_channel_capacity: default_alert_channel_capacity(),
            username: default_username(),
            slack_api_url: None,
            slack_token: None,
        }
    }
}

impl RelayConfig {
    pub fn from_args(args: &RelayArgs) -> anyhow::Result<Self> {
        let mut config = match &args.file {
            Some(path) => read_config_file::<Self>(path)?,
            None => Self::default(),
        };

        if let Some(listen) = args.listen {
            config.listen = listen;
        }
        if let Some(url) = &args.slack_webhook {
            config.slack_webhook_url = url.clone();
        }
        if let Some(secs) = args.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(username) = &args.username {
            config.username = username.clone();
        }
        if let Some(url) = &args.slack_api {
            config.slack_api_url = Some(url.clone());
        }
        if let Some(token) = &args.slack_token {
            config.slack_token = Some(token.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout.is_zero() {
            bail!("timeout must be greater than zero");
        }
        if self.alert_channel_capacity == 0 {
            bail!("alert channel capacity must be at least 1");
        }
        if self.slack_webhook_url.is_empty() {
            warn!("no Slack webhook configured, alerts will not be delivered");
        }
        Ok(())
    }

    /// Base URL for the Slack Web API
    pub fn slack_api_url(&self) -> &str {
        self.slack_api_url
            .as_deref()
            .unwrap_or("https://slack.com/api")
    }
}

/// Command line for the nudger
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "nudger", version, about = "Poll New Relic and nudge pacemaker")]
pub struct NudgerArgs {
    /// JSON config file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Master API key for authenticating to the console
    #[arg(long, env = "APIKEY")]
    pub apikey: Option<String>,

    /// API endpoint to fetch checks
    #[arg(long, env = "API")]
    pub endpoint: Option<String>,

    /// Provider URL template, `{id}` is replaced with the target id
    #[arg(long, env = "PROVIDER_URL")]
    pub provider: Option<String>,

    /// Pacemaker instance to submit heartbeats to
    #[arg(long, env = "PACEMAKER")]
    pub pacemaker: Option<String>,

    /// Poll interval in seconds
    #[arg(long, env = "POLL_INTERVAL")]
    pub interval: Option<u64>,

    /// Check list refresh interval in seconds
    #[arg(long, env = "REFRESH_INTERVAL")]
    pub refresh_interval: Option<u64>,

    /// Per-call timeout in seconds
    #[arg(long, env = "TIMEOUT")]
    pub timeout: Option<u64>,

    /// Heartbeat delivery timeout in seconds
    #[arg(long, env = "DISPATCH_TIMEOUT")]
    pub dispatch_timeout: Option<u64>,

    /// TTL attached to every sample, in seconds
    #[arg(long, env = "SAMPLE_TTL")]
    pub ttl: Option<u64>,

    /// Cap on concurrent polls per tick
    #[arg(long, env = "MAX_CONCURRENT_POLLS")]
    pub max_concurrent_polls: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Command line for taut
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "taut", version, about = "Relay pacemaker alerts to Slack")]
pub struct RelayArgs {
    /// JSON config file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK")]
    pub slack_webhook: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, env = "TIMEOUT")]
    pub timeout: Option<u64>,

    /// Bot name shown in Slack
    #[arg(long, env = "SLACK_USERNAME")]
    pub username: Option<String>,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API")]
    pub slack_api: Option<String>,

    /// Slack Web API token, enables the history lookup
    #[arg(long, env = "SLACK_TOKEN")]
    pub slack_token: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

pub fn read_config_file<T: DeserializeOwned + std::fmt::Debug>(path: &Path) -> anyhow::Result<T> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file: {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
