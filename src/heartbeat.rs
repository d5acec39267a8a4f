//! Heartbeat delivery to the pacemaker

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::actors::dispatcher::Sink;
use crate::actors::messages::DispatchResult;
use crate::error::FetchError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::metrics::Sample;

/// POSTs each sample as JSON to the pacemaker; only HTTP 200 counts as delivered
#[derive(Debug, Clone)]
pub struct PacemakerSink {
    url: String,
    timeout: Duration,
    fetcher: Fetcher,
}

impl PacemakerSink {
    pub fn new(url: impl Into<String>, timeout: Duration, fetcher: Fetcher) -> Self {
        Self {
            url: url.into(),
            timeout,
            fetcher,
        }
    }

    async fn post(&self, sample: &Sample) -> Result<StatusCode, FetchError> {
        let request = FetchRequest::post(&self.url, self.timeout).json(sample)?;
        let fetched = self.fetcher.fetch(request).await?.require_ok()?;
        debug!("pacemaker accepted heartbeat: {}", fetched.text());
        Ok(fetched.status)
    }
}

#[async_trait]
impl Sink for PacemakerSink {
    type Item = Sample;

    fn name(&self) -> &str {
        "pacemaker"
    }

    #[instrument(skip(self, sample), fields(check = %sample.check))]
    async fn deliver(&self, sample: Sample) -> DispatchResult {
        match self.post(&sample).await {
            Ok(status) => DispatchResult::delivered(status),
            Err(e) => DispatchResult::failed(e.status(), e),
        }
    }
}
