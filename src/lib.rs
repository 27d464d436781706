//! # Auracast Source
//!
//! Multi-subgroup LE Audio broadcast source that streams pre-encoded LC3
//! containers over fixed-cadence isochronous streams.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                              SETUP                                    │
//! │  ┌──────────────┐     ┌───────────────────────┐                       │
//! │  │ PresetCatalog│────▶│ SubgroupConfigurator  │──▶ codec configs      │
//! │  │   (preset)   │     │      (subgroup)       │    (LTV, external     │
//! │  └──────┬───────┘     └───────────────────────┘     session setup)    │
//! │         │ SDU size                                                    │
//! │         ▼                                                             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                 │
//! │  │ Container 0  │  │ Container 1  │  │ Container 2  │  LC3 files      │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘                 │
//! │         ▼                 ▼                 ▼                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                 │
//! │  │ StreamCursor │  │ StreamCursor │  │ StreamCursor │  (codec)        │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘                 │
//! └─────────┼─────────────────┼─────────────────┼─────────────────────────┘
//!           ▼                 ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                     BroadcastEngine (engine)                          │
//! │   Started/Stopped/Sent events ──▶ read frame ──▶ alloc ──▶ submit     │
//! └───────────────────────────────┬───────────────────────────────────────┘
//!                                 │ TxBuffer + sequence number
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │         Transport (transport): buffer pool, send, lifecycle           │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod preset;
pub mod source;
pub mod subgroup;
pub mod transport;

pub use engine::{BroadcastEngine, EngineSummary, StreamState};
pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Size of the LC3 container header in bytes
    pub const CONTAINER_HEADER_SIZE: usize = 18;

    /// LC3 container file identifier
    pub const LC3_FILE_ID: u16 = 0xCC1C;

    /// Size of the length prefix in front of every frame
    pub const FRAME_LENGTH_PREFIX_SIZE: usize = 2;

    /// Largest LC3 frame per channel
    pub const LC3_MAX_FRAME_BYTES: usize = 400;

    /// Channels carried per broadcast stream
    pub const CHANNEL_COUNT: usize = 1;

    /// Buffers queued per stream once all streams have started
    pub const BROADCAST_ENQUEUE_COUNT: usize = 3;

    /// Log a progress line every this many frames per stream
    pub const SENT_LOG_INTERVAL: u32 = 1000;

    /// Length of a language code
    pub const LANGUAGE_CODE_SIZE: usize = 3;

    /// Maximum broadcast code length
    pub const BROADCAST_CODE_SIZE: usize = 16;

    /// Broadcast id used when no hardware id is available
    pub const DEFAULT_BROADCAST_ID: u32 = 0xAB_CDEF;

    pub const DEFAULT_BROADCAST_NAME: &str = "Multi-Subgroup Broadcast";

    /// Default broadcast source lifetime in seconds
    pub const DEFAULT_LIFETIME_SECS: u64 = 120;
}
