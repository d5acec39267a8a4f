//! RemoteFetcher - one bounded HTTP call per invocation
//!
//! Every outbound request in both services goes through [`Fetcher::fetch`]:
//! the check list refresh, per-target polls, heartbeat delivery, Slack delivery
//! and the optional Slack history lookup. A request always carries its own
//! timeout and is never retried.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::error::{FetchError, FetchResult};

/// Body attached to an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Pre-serialized JSON
    Json(Vec<u8>),

    /// `application/x-www-form-urlencoded` key/value pairs
    Form(Vec<(String, String)>),
}

/// Description of a single outbound HTTP call
#[derive(Debug, Clone)]
pub struct FetchRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    basic_auth: Option<String>,
    body: Option<RequestBody>,
    timeout: Duration,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            basic_auth: None,
            body: None,
            timeout,
        }
    }

    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Method::GET, url, timeout)
    }

    pub fn post(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Method::POST, url, timeout)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Basic auth with the given user and an empty password
    pub fn basic_auth(mut self, user: impl Into<String>) -> Self {
        self.basic_auth = Some(user.into());
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> FetchResult<Self> {
        let bytes = serde_json::to_vec(value).map_err(FetchError::Encode)?;
        self.body = Some(RequestBody::Json(bytes));
        Ok(self)
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Fetched {
    /// Lossy UTF-8 view of the body, for logging
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with [`FetchError::Status`] unless the status is 2xx
    pub fn require_success(self) -> FetchResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_status_error())
        }
    }

    /// Fail with [`FetchError::Status`] unless the status is exactly 200
    pub fn require_ok(self) -> FetchResult<Self> {
        if self.status == StatusCode::OK {
            Ok(self)
        } else {
            Err(self.into_status_error())
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> FetchResult<T> {
        serde_json::from_slice(&self.body).map_err(FetchError::Decode)
    }

    fn into_status_error(self) -> FetchError {
        FetchError::Status {
            status: self.status,
            body: self.text(),
        }
    }
}

/// Thin wrapper around a shared [`reqwest::Client`]
///
/// The client is cheap to clone and keeps its connection pool across calls.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perform exactly one request and read the full body
    pub async fn fetch(&self, request: FetchRequest) -> FetchResult<Fetched> {
        let FetchRequest {
            method,
            url,
            headers,
            query,
            basic_auth,
            body,
            timeout,
        } = request;

        trace!("{method} {url}");

        let mut builder = self.client.request(method, &url).timeout(timeout);

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if !query.is_empty() {
            builder = builder.query(&query);
        }

        if let Some(user) = basic_auth {
            builder = builder.basic_auth(user, None::<&str>);
        }

        builder = match body {
            Some(RequestBody::Json(bytes)) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes),
            Some(RequestBody::Form(pairs)) => builder.form(&pairs),
            None => builder,
        };

        let request = builder.build().map_err(FetchError::Request)?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(FetchError::Body)?.to_vec();

        trace!("{url}: HTTP {status}, {} bytes", body.len());

        Ok(Fetched { status, body })
    }
}
