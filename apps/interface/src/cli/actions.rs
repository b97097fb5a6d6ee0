use tokio::select;
use tokio::signal::unix;
use tokio::signal::unix::SignalKind;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{filter::Targets, prelude::*, EnvFilter};

use crate::{
    cli::{arguments, service::Service},
    config::ServiceConfig,
};

pub async fn run(args: arguments::Run) -> eyre::Result<()> {
    let config = ServiceConfig::from_path(args.config)?;

    let level_filter = config.logger.level;

    let filter = Targets::new()
        .with_target("gnd_interface", level_filter)
        .with_target("gnd_link", level_filter)
        .with_target("gnd_store", level_filter)
        .with_target("gnd_dictionary", level_filter)
        .with_target("gndifd", level_filter)
        .with_default(level_filter);

    // RUST_LOG overrides the configured level when set.
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level_filter).into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.logger.ansi)
                .with_filter(filter),
        )
        .with(env_filter)
        .try_init()?;

    let service = Service::new(&config)?;
    let tail = service.start().await?;

    let mut sigterm =
        unix::signal(SignalKind::terminate()).expect("Failed to create SIGTERM signal handler");
    let mut sigint =
        unix::signal(SignalKind::interrupt()).expect("Failed to create SIGINT signal handler");

    select! {
        _ = service.cancelled() => {
            info!("Interface microservice cancelled");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal");
        }
    }

    service.shutdown().await;
    tail.abort();

    Ok(())
}
