use std::sync::Arc;

use clap::Parser;
use radalert::{
    actors::dispatcher::DispatcherHandle,
    api::{RelayState, spawn_relay_server},
    config::{RelayArgs, RelayConfig},
    fetch::Fetcher,
    history::SlackHistory,
    slack::SlackSink,
};
use tokio::sync::mpsc;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("radalert", level),
        ("taut", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = RelayArgs::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = RelayConfig::from_args(&args)?;
    info!("tauters gonna taut");

    let fetcher = Fetcher::new();
    let (alert_tx, alert_rx) = mpsc::channel(config.alert_channel_capacity);

    let mut sink = SlackSink::new(
        config.slack_webhook_url.clone(),
        config.username.clone(),
        config.timeout,
        fetcher.clone(),
    );
    if let Some(token) = &config.slack_token {
        info!("history lookup enabled against {}", config.slack_api_url());
        sink = sink.with_enricher(Arc::new(SlackHistory::new(
            config.slack_api_url(),
            token.clone(),
            config.timeout,
            fetcher,
        )));
    }
    let dispatcher = DispatcherHandle::spawn(sink, alert_rx);

    spawn_relay_server(config.listen, RelayState::new(alert_tx)).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");

    match dispatcher.stats().await {
        Ok(stats) => info!(
            "{} alerts delivered, {} failed",
            stats.delivered, stats.failed
        ),
        Err(e) => error!("couldn't read dispatcher stats: {e:#}"),
    }
    dispatcher.shutdown().await?;

    Ok(())
}
