use clap::Parser;
use radalert::{
    actors::{
        dispatcher::DispatcherHandle,
        refresher::{RefresherHandle, RefresherSettings},
        scheduler::{SchedulerHandle, SchedulerSettings},
    },
    checks::WorkList,
    config::{NudgerArgs, NudgerConfig},
    fetch::Fetcher,
    heartbeat::PacemakerSink,
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
    let filter = filter::Targets::new().with_targets(vec![("radalert", level), ("nudger", level)]);
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
    let args = NudgerArgs::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = NudgerConfig::from_args(&args)?;
    info!("nudgers gonna nudge");
    info!(
        "polling every {:?}, refreshing checks every {:?}, nudging {}",
        config.poll_interval, config.refresh_interval, config.pacemaker_url
    );

    let fetcher = Fetcher::new();
    let work_list = WorkList::new();
    let (sample_tx, sample_rx) = mpsc::channel(config.sample_channel_capacity);

    let sink = PacemakerSink::new(
        config.pacemaker_url.clone(),
        config.dispatch_timeout,
        fetcher.clone(),
    );
    let dispatcher = DispatcherHandle::spawn(sink, sample_rx);

    let refresher = RefresherHandle::spawn(
        RefresherSettings::from(&config),
        fetcher.clone(),
        work_list.clone(),
    );
    let scheduler = SchedulerHandle::spawn(
        SchedulerSettings::from(&config),
        fetcher,
        work_list,
        sample_tx,
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");

    scheduler.shutdown().await?;
    refresher.shutdown().await?;
    match dispatcher.stats().await {
        Ok(stats) => info!(
            "{} samples delivered, {} failed",
            stats.delivered, stats.failed
        ),
        Err(e) => error!("couldn't read dispatcher stats: {e:#}"),
    }
    dispatcher.shutdown().await?;

    Ok(())
}
