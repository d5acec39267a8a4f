//! Check list → poll → heartbeat, end to end against mocked services

use pretty_assertions::assert_eq;
use radalert::actors::dispatcher::DispatcherHandle;
use radalert::actors::refresher::RefresherHandle;
use radalert::actors::scheduler::SchedulerHandle;
use radalert::checks::WorkList;
use radalert::fetch::Fetcher;
use radalert::heartbeat::PacemakerSink;
use radalert::metrics::Sample;
use tokio::sync::mpsc;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

async fn mount_check_list(server: &MockServer, checks: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/checks/new_relic.nudger"))
        .and(basic_auth("r4d4l3rt", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(checks))
        .mount(server)
        .await;
}

async fn mount_application(
    server: &MockServer,
    id: u64,
    credential: &str,
    body: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/applications/{id}.json")))
        .and(header("X-Api-Key", credential))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_pacemaker(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_one_check_produces_three_heartbeats() {
    let console = MockServer::start().await;
    let provider = MockServer::start().await;
    let pacemaker = MockServer::start().await;

    mount_check_list(
        &console,
        serde_json::json!([check_json(123, "abc", "def", &["prod"])]),
    )
    .await;
    mount_application(&provider, 123, "abc", application_json(123, "shop", 1.2, 3.4, 0.01)).await;
    mount_pacemaker(&pacemaker).await;

    let fetcher = Fetcher::new();
    let work_list = WorkList::new();
    let (sample_tx, sample_rx) = mpsc::channel(16);

    let dispatcher = DispatcherHandle::spawn(
        PacemakerSink::new(format!("{}/", pacemaker.uri()), TIMEOUT, fetcher.clone()),
        sample_rx,
    );
    let refresher = RefresherHandle::spawn(
        refresher_settings(&console),
        fetcher.clone(),
        work_list.clone(),
    );
    let scheduler = SchedulerHandle::spawn(
        scheduler_settings(&provider),
        fetcher,
        work_list.clone(),
        sample_tx,
    );

    assert_eq!(refresher.refresh_now().await.unwrap(), 1);

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.polled, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.samples, 3);

    let stats = wait_for_total(&dispatcher, 3).await;
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.failed, 0);

    let mut received: Vec<Sample> = pacemaker
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();
    received.sort_by(|a, b| a.check.cmp(&b.check));

    let expected = |check: &str, metric: f64| Sample {
        api_key: "def".to_string(),
        check: check.to_string(),
        metric,
        ttl: 60,
        tags: vec!["prod".to_string()],
    };
    assert_eq!(
        received,
        vec![
            expected("shop: error rate", 0.01),
            expected("shop: response time", 1.2),
            expected("shop: throughput", 3.4),
        ]
    );

    scheduler.shutdown().await.unwrap();
    refresher.shutdown().await.unwrap();
    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refresh_replaces_the_polled_set() {
    let console = MockServer::start().await;
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/checks/new_relic.nudger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            check_json(1, "k1", "r1", &[]),
            check_json(2, "k2", "r2", &[]),
        ])))
        .up_to_n_times(1)
        .mount(&console)
        .await;
    mount_check_list(&console, serde_json::json!([check_json(2, "k2", "r2", &[])])).await;

    mount_application(&provider, 1, "k1", application_json(1, "one", 1.0, 1.0, 0.0)).await;
    mount_application(&provider, 2, "k2", application_json(2, "two", 2.0, 2.0, 0.0)).await;

    let fetcher = Fetcher::new();
    let work_list = WorkList::new();
    let (sample_tx, mut sample_rx) = mpsc::channel(64);

    let refresher = RefresherHandle::spawn(
        refresher_settings(&console),
        fetcher.clone(),
        work_list.clone(),
    );
    let scheduler = SchedulerHandle::spawn(
        scheduler_settings(&provider),
        fetcher,
        work_list.clone(),
        sample_tx,
    );

    // The refresher's immediate first tick may already have consumed the
    // two-check response, so refresh until the list settles on one check.
    let mut count = refresher.refresh_now().await.unwrap();
    if count == 2 {
        count = refresher.refresh_now().await.unwrap();
    }
    assert_eq!(count, 1);

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.polled, 1);

    let mut keys = Vec::new();
    while let Ok(sample) = sample_rx.try_recv() {
        keys.push(sample.api_key);
    }
    assert_eq!(keys, vec!["r2", "r2", "r2"]);

    scheduler.shutdown().await.unwrap();
    refresher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_check_list_polls_nothing() {
    let console = MockServer::start().await;
    let provider = MockServer::start().await;

    mount_check_list(&console, serde_json::json!([])).await;

    let fetcher = Fetcher::new();
    let work_list = WorkList::new();
    let (sample_tx, mut sample_rx) = mpsc::channel(4);

    let refresher = RefresherHandle::spawn(
        refresher_settings(&console),
        fetcher.clone(),
        work_list.clone(),
    );
    let scheduler = SchedulerHandle::spawn(
        scheduler_settings(&provider),
        fetcher,
        work_list,
        sample_tx,
    );

    assert_eq!(refresher.refresh_now().await.unwrap(), 0);

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.polled, 0);
    assert!(sample_rx.try_recv().is_err());
    assert!(provider.received_requests().await.unwrap().is_empty());

    scheduler.shutdown().await.unwrap();
    refresher.shutdown().await.unwrap();
}
