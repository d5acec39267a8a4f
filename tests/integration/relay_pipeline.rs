//! Pacemaker alert → relay → Slack webhook, end to end

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use radalert::actors::dispatcher::DispatcherHandle;
use radalert::api::{CommandReply, RelayState, spawn_relay_server};
use radalert::fetch::Fetcher;
use radalert::history::SlackHistory;
use radalert::slack::SlackSink;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn slack_webhook() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXXX"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

async fn start_relay(sink: SlackSink) -> (SocketAddr, DispatcherHandle) {
    let (alert_tx, alert_rx) = mpsc::channel(100_000);
    let dispatcher = DispatcherHandle::spawn(sink, alert_rx);
    let addr = spawn_relay_server("127.0.0.1:0".parse().unwrap(), RelayState::new(alert_tx))
        .await
        .unwrap();
    (addr, dispatcher)
}

fn webhook_sink(slack: &MockServer) -> SlackSink {
    SlackSink::new(
        format!("{}/services/T000/B000/XXXX", slack.uri()),
        "Rad Alert",
        TIMEOUT,
        Fetcher::new(),
    )
}

#[tokio::test]
async fn test_critical_alert_reaches_slack() {
    let slack = slack_webhook().await;
    let (addr, dispatcher) = start_relay(webhook_sink(&slack)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/pacemaker"))
        .json(&critical_alert("shizzle.com/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    let stats = wait_for_total(&dispatcher, 1).await;
    assert_eq!(stats.delivered, 1);

    let requests = slack.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let payload = form_payload(&requests[0].body);
    assert_eq!(payload["username"], "Rad Alert");
    let text = payload["text"].as_str().unwrap();
    assert!(text.contains("*MyCo*"));
    assert!(text.contains("`shizzle.com/health`"));
    assert!(text.contains("2015-06-22T11:29:44+00:00"));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_recovery_is_not_relayed() {
    let slack = slack_webhook().await;
    let (addr, dispatcher) = start_relay(webhook_sink(&slack)).await;

    let client = reqwest::Client::new();
    for state in ["OK", "resolved"] {
        let response = client
            .post(format!("http://{addr}/integrations/pacemaker"))
            .json(&serde_json::json!({
                "state": state,
                "org": "MyCo",
                "check": "shizzle.com/health",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(slack.received_requests().await.unwrap().is_empty());
    assert_eq!(dispatcher.stats().await.unwrap().total(), 0);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_alerts_are_posted_in_arrival_order() {
    let slack = slack_webhook().await;
    let (addr, dispatcher) = start_relay(webhook_sink(&slack)).await;

    let client = reqwest::Client::new();
    for n in 0..5 {
        client
            .post(format!("http://{addr}/pacemaker"))
            .json(&critical_alert(&format!("check-{n}")))
            .send()
            .await
            .unwrap();
    }

    let stats = wait_for_total(&dispatcher, 5).await;
    assert_eq!(stats.delivered, 5);

    let checks: Vec<String> = slack
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| form_payload(&request.body)["text"].as_str().unwrap().to_string())
        .collect();
    for (n, text) in checks.iter().enumerate() {
        assert!(text.contains(&format!("`check-{n}`")), "{text}");
    }

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_history_enriches_the_message() {
    let slack = slack_webhook().await;
    Mock::given(method("GET"))
        .and(path("/api/search.messages"))
        .and(query_param("token", "xoxb-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "messages": {"total": 3}
        })))
        .mount(&slack)
        .await;

    let history = SlackHistory::new(
        format!("{}/api", slack.uri()),
        "xoxb-test",
        TIMEOUT,
        Fetcher::new(),
    );
    let sink = webhook_sink(&slack).with_enricher(Arc::new(history));
    let (addr, dispatcher) = start_relay(sink).await;

    reqwest::Client::new()
        .post(format!("http://{addr}/pacemaker"))
        .json(&critical_alert("shizzle.com/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(wait_for_total(&dispatcher, 1).await.delivered, 1);

    let posts: Vec<_> = slack
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "POST")
        .collect();
    assert_eq!(posts.len(), 1);
    let text = form_payload(&posts[0].body)["text"].as_str().unwrap().to_string();
    assert!(text.ends_with("`shizzle.com/health` came up 3 times before in this channel"));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_vote_command_over_http() {
    let slack = slack_webhook().await;
    let (addr, dispatcher) = start_relay(webhook_sink(&slack)).await;

    let reply: CommandReply = reqwest::Client::new()
        .post(format!("http://{addr}/slack"))
        .form(&[("text", "radalert: \"spoons of doom\" -1")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(reply.text, "You voted -1 on 'spoons of doom'");

    dispatcher.shutdown().await.unwrap();
}
