//! Samples derived from provider polls

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checks::WorkItem;
use crate::provider::ApplicationSummary;

/// One metric observation, in the pacemaker heartbeat wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Routing key of the owning check
    pub api_key: String,

    /// Metric name, e.g. `"shop: response time"`
    pub check: String,

    pub metric: f64,

    /// Time to live in seconds (0 lets the pacemaker decide)
    pub ttl: u64,

    pub tags: Vec<String>,
}

/// The sub-metrics derived from every successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubMetric {
    ResponseTime,
    Throughput,
    ErrorRate,
}

impl SubMetric {
    pub const ALL: [SubMetric; 3] = [
        SubMetric::ResponseTime,
        SubMetric::Throughput,
        SubMetric::ErrorRate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubMetric::ResponseTime => "response time",
            SubMetric::Throughput => "throughput",
            SubMetric::ErrorRate => "error rate",
        }
    }

    pub fn value(self, summary: &ApplicationSummary) -> f64 {
        match self {
            SubMetric::ResponseTime => summary.response_time,
            SubMetric::Throughput => summary.throughput,
            SubMetric::ErrorRate => summary.error_rate,
        }
    }
}

impl fmt::Display for SubMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Build one sample per sub-metric, labelled with the item's routing key and tags
pub fn samples_for(
    item: &WorkItem,
    name: &str,
    summary: &ApplicationSummary,
    ttl: u64,
) -> Vec<Sample> {
    let tags: Vec<String> = item.tags.iter().cloned().collect();

    SubMetric::ALL
        .iter()
        .map(|sub_metric| Sample {
            api_key: item.routing_key.clone(),
            check: format!("{name}: {sub_metric}"),
            metric: sub_metric.value(summary),
            ttl,
            tags: tags.clone(),
        })
        .collect()
}
