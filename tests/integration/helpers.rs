//! Helper functions for integration tests

use std::time::Duration;

use radalert::actors::dispatcher::DispatcherHandle;
use radalert::actors::messages::DispatchStats;
use radalert::actors::refresher::RefresherSettings;
use radalert::actors::scheduler::SchedulerSettings;
use radalert::alerts::AlertEvent;
use wiremock::MockServer;

/// Long enough that timers never fire on their own during a test
pub const IDLE: Duration = Duration::from_secs(3600);

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn refresher_settings(server: &MockServer) -> RefresherSettings {
    RefresherSettings {
        url: format!("{}/api/v1/checks/new_relic.nudger", server.uri()),
        master_api_key: "r4d4l3rt".to_string(),
        interval: IDLE,
        timeout: TIMEOUT,
    }
}

pub fn scheduler_settings(server: &MockServer) -> SchedulerSettings {
    SchedulerSettings {
        provider_url: format!("{}/v2/applications/{{id}}.json", server.uri()),
        interval: IDLE,
        timeout: TIMEOUT,
        sample_ttl: 60,
        max_concurrent_polls: None,
    }
}

/// Check list entry in the wire format of the checks endpoint
pub fn check_json(
    app_id: u64,
    credential: &str,
    routing_key: &str,
    tags: &[&str],
) -> serde_json::Value {
    serde_json::json!({
        "nr_app_id": app_id,
        "nr_api_key": credential,
        "api_key": routing_key,
        "tags": tags,
    })
}

pub fn application_json(
    id: u64,
    name: &str,
    response_time: f64,
    throughput: f64,
    error_rate: f64,
) -> serde_json::Value {
    serde_json::json!({
        "application": {
            "id": id,
            "name": name,
            "language": "ruby",
            "health_status": "green",
            "reporting": true,
            "application_summary": {
                "response_time": response_time,
                "throughput": throughput,
                "error_rate": error_rate,
                "apdex_target": 0.5,
                "apdex_score": 0.99,
                "host_count": 2,
                "instance_count": 4
            }
        }
    })
}

pub fn critical_alert(check: &str) -> AlertEvent {
    AlertEvent {
        state: Some("CRITICAL".to_string()),
        org: "MyCo".to_string(),
        check: check.to_string(),
        anomaly_start: Some(1434972584),
        anomaly_duration: None,
        tags: vec!["shizzle".to_string(), "health".to_string()],
    }
}

/// Wait until the dispatcher has handled `total` items
pub async fn wait_for_total(handle: &DispatcherHandle, total: u64) -> DispatchStats {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let stats = handle.stats().await.unwrap();
        if stats.total() >= total || tokio::time::Instant::now() > deadline {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Decode the JSON carried in the `payload` field of a form body
pub fn form_payload(body: &[u8]) -> serde_json::Value {
    let query = String::from_utf8_lossy(body);
    let url = reqwest::Url::parse(&format!("http://form/?{query}")).unwrap();
    let json = url
        .query_pairs()
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .expect("payload field");
    serde_json::from_str(&json).unwrap()
}
