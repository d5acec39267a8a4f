//! Optional alert enrichment from Slack message history

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, trace};

use crate::alerts::AlertEvent;
use crate::fetch::{FetchRequest, Fetcher};

/// Adds context to an alert before it is posted
#[async_trait]
pub trait AlertEnricher: Send + Sync {
    /// Extra line for the chat message, `None` if there is nothing to add
    async fn enrich(&self, alert: &AlertEvent) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<SearchMessages>,
}

#[derive(Debug, Deserialize)]
struct SearchMessages {
    total: u64,
}

/// Counts earlier chat mentions of the alerting check via `search.messages`
#[derive(Debug, Clone)]
pub struct SlackHistory {
    api_url: String,
    token: String,
    timeout: Duration,
    fetcher: Fetcher,
}

impl SlackHistory {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
            timeout,
            fetcher,
        }
    }

    async fn mentions(&self, check: &str) -> Result<u64> {
        let url = format!("{}/search.messages", self.api_url.trim_end_matches('/'));
        let request = FetchRequest::get(url, self.timeout)
            .query("token", &self.token)
            .query("query", check);

        let response: SearchResponse = self
            .fetcher
            .fetch(request)
            .await
            .context("search.messages request failed")?
            .require_success()?
            .json()
            .context("couldn't decode search.messages response")?;

        if !response.ok {
            bail!(
                "search.messages error: {}",
                response.error.as_deref().unwrap_or("unknown")
            );
        }

        Ok(response.messages.map(|m| m.total).unwrap_or_default())
    }
}

#[async_trait]
impl AlertEnricher for SlackHistory {
    #[instrument(skip(self, alert), fields(check = %alert.check))]
    async fn enrich(&self, alert: &AlertEvent) -> Result<Option<String>> {
        let total = self.mentions(&alert.check).await?;
        trace!("{total} earlier mentions");

        Ok(match total {
            0 => None,
            1 => Some(format!("`{}` came up once before in this channel", alert.check)),
            n => Some(format!("`{}` came up {n} times before in this channel", alert.check)),
        })
    }
}
