//! Broadcaster configuration
//!
//! Loaded from a TOML file. The defaults reproduce the three-subgroup demo
//! broadcast (English, French and Spanish subgroups on preset `16_2_1`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ConfigError, Result};
use crate::preset::ChannelLayout;
use crate::subgroup::{MetadataToggles, ParentalRating, SubgroupMetadata};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub broadcast: BroadcastSettings,
    pub metadata: MetadataToggles,
    pub subgroups: Vec<SubgroupSettings>,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    /// Advertised broadcast name
    pub name: String,
    /// Preset key, e.g. `"16_2_1"`
    pub preset: String,
    pub channel_layout: ChannelLayout,
    /// Encrypts the broadcast when set
    pub broadcast_code: Option<String>,
    /// Number of broadcast isochronous streams
    pub stream_count: usize,
    /// One LC3 container per stream
    pub streams: Vec<PathBuf>,
    /// Transmit buffers shared by all streams
    pub tx_buf_count: usize,
    /// Buffers queued per stream when streaming begins
    pub enqueue_count: usize,
    /// Stop the broadcast after this many seconds
    pub lifetime_secs: Option<u64>,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_BROADCAST_NAME.to_string(),
            preset: "16_2_1".to_string(),
            channel_layout: ChannelLayout::Mono,
            broadcast_code: None,
            stream_count: 3,
            streams: Vec::new(),
            tx_buf_count: BROADCAST_ENQUEUE_COUNT * 3,
            enqueue_count: BROADCAST_ENQUEUE_COUNT,
            lifetime_secs: Some(DEFAULT_LIFETIME_SECS),
        }
    }
}

/// Per-subgroup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgroupSettings {
    /// Streams carried by this subgroup
    pub streams: usize,
    pub language: Option<String>,
    /// Raw parental rating value, out-of-range values are dropped
    pub parental_rating: Option<u8>,
    pub broadcast_name: Option<String>,
    pub program_info: Option<String>,
}

impl Default for SubgroupSettings {
    fn default() -> Self {
        Self {
            streams: 1,
            language: None,
            parental_rating: None,
            broadcast_name: None,
            program_info: None,
        }
    }
}

impl SubgroupSettings {
    pub fn metadata(&self) -> SubgroupMetadata {
        SubgroupMetadata {
            language: self.language.clone(),
            parental_rating: self.parental_rating,
            broadcast_name: self.broadcast_name.clone(),
            program_info: self.program_info.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: None,
        }
    }
}

impl AppConfig {
    /// The demo configuration with its three subgroups
    pub fn demo() -> Self {
        let subgroups = [
            ("eng", ParentalRating::ANY_AGE),
            ("fra", ParentalRating::AGE_5_OR_ABOVE),
            ("spa", ParentalRating::NO_RATING),
        ]
        .iter()
        .enumerate()
        .map(|(i, (lang, rating))| SubgroupSettings {
            streams: 1,
            language: Some(lang.to_string()),
            parental_rating: Some(rating.value()),
            broadcast_name: Some(format!("Subgroup_Audio_{}", i + 1)),
            program_info: None,
        })
        .collect();

        Self {
            subgroups,
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Platform config location, e.g. `~/.config/auracast-source/broadcaster.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "auracast-source")
            .map(|dirs| dirs.config_dir().join("broadcaster.toml"))
    }

    /// Load from `path`, or the default location, or fall back to the demo
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::demo()),
        }
    }

    /// Buffers needed to queue the initial burst on every stream
    pub fn tx_buffers_needed(&self) -> usize {
        self.broadcast.enqueue_count * self.broadcast.stream_count
    }

    pub fn subgroup_metadata(&self) -> Vec<SubgroupMetadata> {
        self.subgroups.iter().map(SubgroupSettings::metadata).collect()
    }

    pub fn encryption(&self) -> bool {
        self.broadcast
            .broadcast_code
            .as_deref()
            .is_some_and(|code| !code.is_empty())
    }

    /// Check the limits that the broadcast depends on
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.subgroups.is_empty() {
            return Err(ConfigError::NoSubgroups);
        }

        let subgroup_streams: usize = self.subgroups.iter().map(|s| s.streams).sum();
        if subgroup_streams != self.broadcast.stream_count {
            return Err(ConfigError::SubgroupStreamMismatch {
                subgroup_streams,
                streams: self.broadcast.stream_count,
            });
        }

        if self.broadcast.stream_count > u8::MAX as usize + 1 {
            return Err(ConfigError::Invalid(format!(
                "{} streams exceed the stream handle range",
                self.broadcast.stream_count
            )));
        }

        if self.broadcast.enqueue_count == 0 {
            return Err(ConfigError::Invalid(
                "enqueue_count must queue at least one buffer per stream".into(),
            ));
        }

        let needed = self.tx_buffers_needed();
        if self.broadcast.tx_buf_count < needed {
            return Err(ConfigError::InsufficientTxBuffers {
                available: self.broadcast.tx_buf_count,
                needed,
            });
        }

        if let Some(code) = &self.broadcast.broadcast_code {
            if code.len() > BROADCAST_CODE_SIZE {
                return Err(ConfigError::BroadcastCodeTooLong(code.len()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_demo_is_valid() {
        let config = AppConfig::demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.subgroups.len(), 3);
        assert_eq!(config.subgroups[1].language.as_deref(), Some("fra"));
        assert_eq!(config.tx_buffers_needed(), 9);
        assert!(!config.encryption());
    }

    #[test]
    fn test_too_few_buffers() {
        let mut config = AppConfig::demo();
        config.broadcast.tx_buf_count = 8;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InsufficientTxBuffers { available: 8, needed: 9 })
        ));
    }

    #[test]
    fn test_empty_initial_burst_rejected() {
        let mut config = AppConfig::demo();
        config.broadcast.enqueue_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.broadcast.enqueue_count = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_broadcast_code_length() {
        let mut config = AppConfig::demo();
        config.broadcast.broadcast_code = Some("0123456789abcdef".into());
        assert!(config.validate().is_ok());
        assert!(config.encryption());

        config.broadcast.broadcast_code = Some("0123456789abcdefg".into());
        assert!(matches!(config.validate(), Err(ConfigError::BroadcastCodeTooLong(17))));
    }

    #[test]
    fn test_subgroup_stream_totals() {
        let mut config = AppConfig::demo();
        config.subgroups[0].streams = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SubgroupStreamMismatch { subgroup_streams: 4, streams: 3 })
        ));

        config.subgroups.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoSubgroups)));
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broadcaster.toml");

        let mut config = AppConfig::demo();
        config.broadcast.preset = "48_2_2".into();
        config.broadcast.channel_layout = ChannelLayout::Stereo;
        config.metadata.program_info = false;
        config.to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.broadcast.preset, "48_2_2");
        assert_eq!(loaded.broadcast.channel_layout, ChannelLayout::Stereo);
        assert!(!loaded.metadata.program_info);
        assert_eq!(loaded.subgroups, config.subgroups);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [broadcast]
            preset = "24_2_1"
            stream_count = 1
            tx_buf_count = 3

            [metadata]
            language = false

            [[subgroups]]
            language = "deu"
            "#,
        )
        .unwrap();

        assert_eq!(config.broadcast.name, DEFAULT_BROADCAST_NAME);
        assert_eq!(config.broadcast.enqueue_count, 3);
        assert!(!config.metadata.language);
        assert!(config.metadata.parental_rating);
        assert_eq!(config.subgroups[0].streams, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[broadcast\nname = 1").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }
}
