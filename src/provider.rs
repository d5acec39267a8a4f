//! Metrics provider (New Relic application summary) response types

use serde::Deserialize;

/// Default per-target endpoint, `{id}` is replaced with the target id
pub const DEFAULT_PROVIDER_URL: &str = "https://api.newrelic.com/v2/applications/{id}.json";

/// Header carrying the per-target credential
pub const API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApplicationSummary {
    pub response_time: f64,
    pub throughput: f64,
    pub error_rate: f64,
    #[serde(default)]
    pub apdex_target: f64,
    #[serde(default)]
    pub apdex_score: f64,
    #[serde(default)]
    pub host_count: f64,
    #[serde(default)]
    pub instance_count: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reporting: bool,
    pub application_summary: ApplicationSummary,
}

/// Body returned by the provider for a single target
///
/// The regular shape nests the summary under `application`; a bare summary
/// object is accepted as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    Application { application: Application },
    Summary(ApplicationSummary),
}

impl ProviderResponse {
    pub fn summary(&self) -> &ApplicationSummary {
        match self {
            ProviderResponse::Application { application } => &application.application_summary,
            ProviderResponse::Summary(summary) => summary,
        }
    }

    /// Application name, if the provider reported one
    pub fn name(&self) -> Option<&str> {
        match self {
            ProviderResponse::Application { application } => application
                .name
                .as_deref()
                .filter(|name| !name.trim().is_empty()),
            ProviderResponse::Summary(_) => None,
        }
    }
}

/// Substitute the target id into a provider URL template
///
/// Templates without a `{id}` placeholder get the id appended as a path segment.
pub fn target_url(template: &str, target_id: &str) -> String {
    if template.contains("{id}") {
        template.replace("{id}", target_id)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), target_id)
    }
}
