//! Error types for the broadcast source

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LC3 container decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Malformed container: {len} bytes is shorter than the {required} byte header")]
    MalformedContainer { len: usize, required: usize },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Truncated frame at offset {position}: needs {needed} bytes, blob holds {available}")]
    TruncatedFrame {
        position: usize,
        needed: usize,
        available: usize,
    },
}

/// Preset catalog errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    #[error("Preset not found: {0}")]
    NotFound(String),
}

/// Configuration and setup validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Stream count mismatch: {files} container files for {streams} configured streams")]
    StreamCountMismatch { files: usize, streams: usize },

    #[error("Subgroups carry {subgroup_streams} streams but {streams} are configured")]
    SubgroupStreamMismatch {
        subgroup_streams: usize,
        streams: usize,
    },

    #[error("tx_buf_count {available} is below enqueue_count * stream_count = {needed}")]
    InsufficientTxBuffers { available: usize, needed: usize },

    #[error("Broadcast code is {0} bytes, at most 16 allowed")]
    BroadcastCodeTooLong(usize),

    #[error("Transmit unit of {sdu} bytes exceeds the {max} byte frame buffer")]
    TransmitUnitTooLarge { sdu: usize, max: usize },

    #[error("At least one subgroup is required")]
    NoSubgroups,

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Isochronous transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Send failed on stream {stream}: {code}")]
    SendFailed { stream: u8, code: i32 },

    #[error("Unknown stream: {0}")]
    UnknownStream(u8),

    #[error("Event channel disconnected")]
    Disconnected,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
