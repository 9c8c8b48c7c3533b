use std::time::Duration;

use clap::Parser;
use live_sysmon::{
    config::{Config, read_config_file},
    hardware::default_collectors,
    hub::Hub,
    publisher::PublisherHandle,
    server::spawn_server,
    util::apply_env_overrides,
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// How long open connections get to close after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON)
    #[arg(short, long)]
    file: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level for this application
    #[arg(long, default_value = "debug")]
    log_level: LevelFilter,
}

/// Our crate at `level`, HTTP request traces at info, everything else off.
fn log_filter(level: LevelFilter) -> filter::Targets {
    filter::Targets::new().with_targets(vec![
        ("live_sysmon", level),
        ("tower_http", LevelFilter::INFO),
    ])
}

fn init(level: LevelFilter) {
    dotenv::dotenv().ok();

    let filter = log_filter(level);
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
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let mut config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config);
    if let Some(port) = args.port {
        config.bind_addr.set_port(port);
    }
    config.validate()?;

    let hub = Hub::new(config.hub.clone());
    let publisher = PublisherHandle::spawn(
        hub.clone(),
        default_collectors(&config.publisher.disk_path),
        &config.publisher,
    )?;
    let (addr, server) = spawn_server(&config, hub.clone()).await?;
    info!("system monitor available at http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    if let Err(e) = publisher.shutdown().await {
        warn!("{e:#}");
    }
    hub.shutdown();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("server task failed: {e}"),
        Err(_) => warn!("connections still open after {SHUTDOWN_GRACE:?}, exiting"),
    }

    Ok(())
}
