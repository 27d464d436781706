//! Broadcast Source Application
//!
//! Streams pre-encoded LC3 containers over the simulated isochronous
//! transport until Ctrl+C or the configured lifetime runs out.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auracast_source::{
    config::AppConfig,
    source::{broadcast_id, load_containers, setup_broadcast_source},
    transport::{
        event_channel,
        loopback::{IsoLoopback, REASON_LOCAL_HOST_TERMINATED},
    },
};

fn init_logging(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_deref() == Some("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    init_logging(&config);

    tracing::info!("Starting Auracast broadcast source ({} subgroups)", config.subgroups.len());

    let containers = load_containers(&config.broadcast.streams).context("failed to read LC3 containers")?;
    let setup = setup_broadcast_source(&config, containers).context("setup_broadcast_source failed")?;

    tracing::debug!(
        "Setup: {}",
        serde_json::to_string_pretty(&setup.report()).unwrap_or_default()
    );
    for subgroup in &setup.subgroups {
        tracing::info!(
            subgroup = subgroup.index,
            codec_bytes = subgroup.codec_ltv().len(),
            metadata_bytes = subgroup.metadata_ltv().len(),
            "Subgroup codec configuration ready"
        );
    }
    tracing::info!(
        broadcast_id = format_args!("0x{:06X}", broadcast_id(None)),
        name = %setup.name,
        encrypted = setup.encryption,
        "Broadcast identity"
    );

    let interval = Duration::from_micros(setup.preset.qos.interval_us as u64);
    let stream_count = setup.cursors.len();
    let (events_tx, events_rx) = event_channel();
    let loopback = Arc::new(IsoLoopback::new(stream_count, setup.tx_pool(), events_tx));
    let mut engine = setup.into_engine(loopback.clone());

    let engine_handle = tokio::task::spawn_blocking(move || engine.run(&events_rx));

    tracing::info!("Broadcast source started, waiting for streams to be ready...");
    loopback.start_all();

    let lifetime = config.broadcast.lifetime_secs.map(Duration::from_secs);
    let deadline = tokio::time::sleep(lifetime.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                loopback.tick();
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping broadcast");
                break;
            }
            _ = &mut deadline, if lifetime.is_some() => {
                tracing::info!("Broadcast lifetime reached");
                break;
            }
        }
    }

    loopback.stop_all(REASON_LOCAL_HOST_TERMINATED);

    let summary = engine_handle.await.context("engine task panicked")??;
    let stats = loopback.stats();
    tracing::info!(
        frames = summary.frames_sent(),
        delivered = stats.sdus_delivered,
        bytes = stats.bytes_delivered,
        "Broadcast finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
