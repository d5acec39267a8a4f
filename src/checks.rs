//! Checks to nudge and the shared check list

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

/// One monitored target
///
/// Accepts both the current field names and the legacy New Relic ones
/// (`nr_app_id`, `nr_api_key`, `api_key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Provider-side identifier of the target (application id)
    #[serde(alias = "nr_app_id", deserialize_with = "string_or_number")]
    pub target_id: String,

    /// Credential sent to the provider as `X-Api-Key`
    #[serde(alias = "nr_api_key")]
    pub target_credential: String,

    /// Pacemaker API key the samples are routed to
    #[serde(alias = "api_key", default)]
    pub routing_key: String,

    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: BTreeSet<String>,
}

impl WorkItem {
    pub fn new(
        target_id: impl Into<String>,
        target_credential: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            target_credential: target_credential.into(),
            routing_key: routing_key.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Identifier and credential must both be present
    pub fn is_valid(&self) -> bool {
        !self.target_id.trim().is_empty() && !self.target_credential.trim().is_empty()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target {}", self.target_id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Unsigned(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Int(n) => n.to_string(),
        Id::Unsigned(n) => n.to_string(),
    })
}

fn nullable_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The current set of checks
///
/// Writers publish a complete replacement; readers clone the inner `Arc` and
/// never see a list that is half updated.
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    items: Arc<RwLock<Arc<Vec<WorkItem>>>>,
}

impl WorkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<WorkItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(Arc::new(items))),
        }
    }

    /// Consistent view of the list at this point in time
    pub async fn snapshot(&self) -> Arc<Vec<WorkItem>> {
        self.items.read().await.clone()
    }

    /// Swap in a new list wholesale
    pub async fn replace(&self, items: Vec<WorkItem>) {
        *self.items.write().await = Arc::new(items);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}
