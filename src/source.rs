//! Broadcast source setup
//!
//! Resolves the preset, derives the subgroup codec configurations and opens
//! one cursor per stream container. Any failure here aborts the whole setup;
//! nothing is kept from a partial run.

use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

use crate::codec::StreamCursor;
use crate::config::AppConfig;
use crate::constants::{CHANNEL_COUNT, DEFAULT_BROADCAST_ID, LC3_MAX_FRAME_BYTES};
use crate::engine::BroadcastEngine;
use crate::error::{ConfigError, Result};
use crate::preset::{Preset, PresetCatalog};
use crate::subgroup::{SubgroupCodecConfig, SubgroupConfigurator};
use crate::transport::{Transport, TxBufferPool};

/// Everything the session layer and the engine need after setup
#[derive(Debug)]
pub struct BroadcastSetup {
    pub name: String,
    pub preset: Preset,
    pub subgroups: Vec<SubgroupCodecConfig>,
    /// Subgroup index of every stream
    pub stream_subgroups: Vec<usize>,
    pub cursors: Vec<StreamCursor>,
    pub encryption: bool,
    pub enqueue_count: usize,
    pub tx_buf_count: usize,
}

/// Serializable view of a finished setup
#[derive(Debug, Serialize)]
pub struct SetupReport<'a> {
    pub name: &'a str,
    pub preset: &'a Preset,
    pub subgroups: &'a [SubgroupCodecConfig],
    pub stream_subgroups: &'a [usize],
    pub encryption: bool,
}

impl BroadcastSetup {
    pub fn report(&self) -> SetupReport<'_> {
        SetupReport {
            name: &self.name,
            preset: &self.preset,
            subgroups: &self.subgroups,
            stream_subgroups: &self.stream_subgroups,
            encryption: self.encryption,
        }
    }

    /// Transmit pool sized for this broadcast
    pub fn tx_pool(&self) -> TxBufferPool {
        TxBufferPool::new(self.tx_buf_count, self.preset.qos.sdu as usize)
    }

    /// Hand the cursors to a new engine
    pub fn into_engine<T: Transport>(self, transport: T) -> BroadcastEngine<T> {
        BroadcastEngine::new(transport, self.cursors, self.enqueue_count)
    }
}

/// Read every container file into memory
pub fn load_containers<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Bytes>> {
    paths
        .iter()
        .map(|p| {
            let data = std::fs::read(p.as_ref())?;
            tracing::debug!(path = %p.as_ref().display(), bytes = data.len(), "Loaded LC3 container");
            Ok(Bytes::from(data))
        })
        .collect()
}

/// Run the setup sequence against the given stream containers
pub fn setup_broadcast_source(config: &AppConfig, containers: Vec<Bytes>) -> Result<BroadcastSetup> {
    config.validate()?;

    let broadcast = &config.broadcast;
    let catalog = PresetCatalog::for_layout(broadcast.channel_layout);
    let preset = catalog.lookup(&broadcast.preset).inspect_err(|_| {
        tracing::error!(preset = %broadcast.preset, "Failed to get LC3 preset");
    })?;

    let sdu = preset.qos.sdu as usize;
    let max = LC3_MAX_FRAME_BYTES * CHANNEL_COUNT;
    if sdu > max {
        return Err(ConfigError::TransmitUnitTooLarge { sdu, max }.into());
    }

    if containers.len() != broadcast.stream_count {
        return Err(ConfigError::StreamCountMismatch {
            files: containers.len(),
            streams: broadcast.stream_count,
        }
        .into());
    }

    let configurator = SubgroupConfigurator::new(&preset, broadcast.channel_layout, config.metadata);
    let subgroups = configurator.configure_all(&config.subgroup_metadata());

    let stream_subgroups: Vec<usize> = config
        .subgroups
        .iter()
        .enumerate()
        .flat_map(|(i, s)| std::iter::repeat(i).take(s.streams))
        .collect();

    let mut cursors = Vec::with_capacity(containers.len());
    for (i, blob) in containers.into_iter().enumerate() {
        let cursor = StreamCursor::new(blob, sdu)?;
        let header = cursor.header();
        tracing::info!(
            stream = i,
            frame_us = header.frame_duration_us(),
            sample_rate = header.sample_rate_hz(),
            bit_rate = header.bit_rate_bps(),
            channels = header.channels,
            samples = header.sample_count(),
            samples_per_frame = header.samples_per_frame(),
            "Read LC3 audio header"
        );
        if header.sample_rate_hz() != preset.codec.sampling_frequency.hz() {
            tracing::warn!(
                stream = i,
                container = header.sample_rate_hz(),
                preset = preset.codec.sampling_frequency.hz(),
                "Container sample rate differs from preset"
            );
        }
        cursors.push(cursor);
    }

    tracing::info!(
        preset = %preset.name,
        subgroups = subgroups.len(),
        streams = cursors.len(),
        "Broadcast source configured"
    );

    Ok(BroadcastSetup {
        name: broadcast.name.clone(),
        preset,
        subgroups,
        stream_subgroups,
        cursors,
        encryption: config.encryption(),
        enqueue_count: broadcast.enqueue_count,
        tx_buf_count: broadcast.tx_buf_count,
    })
}

/// 24-bit broadcast id from a 3-byte hardware id
pub fn broadcast_id(hwid: Option<[u8; 3]>) -> u32 {
    match hwid {
        Some([a, b, c]) => (a as u32) << 16 | (b as u32) << 8 | c as u32,
        None => DEFAULT_BROADCAST_ID,
    }
}
