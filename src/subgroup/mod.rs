//! Per-subgroup codec configuration
//!
//! Every subgroup starts from the active preset's codec parameters and then
//! gets its own descriptive metadata. Each adjustment is switched on or off
//! at runtime through [`MetadataToggles`]; invalid values are silently
//! left out rather than rejected.

pub mod ltv;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::LANGUAGE_CODE_SIZE;
use crate::preset::{ChannelLayout, CodecParams, Preset};
use ltv::{codec_type, metadata_type, LtvWriter};

/// Parental rating value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParentalRating(u8);

impl ParentalRating {
    pub const NO_RATING: Self = Self(0x00);
    pub const ANY_AGE: Self = Self(0x01);
    pub const AGE_5_OR_ABOVE: Self = Self(0x02);
    pub const AGE_18_OR_ABOVE: Self = Self(0x0F);

    /// Accepts only values inside the enumerated range
    pub fn from_raw(value: u8) -> Option<Self> {
        (value <= Self::AGE_18_OR_ABOVE.0).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Which optional adjustments are applied to every subgroup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataToggles {
    /// Drop the channel allocation for single-channel layouts
    pub implicit_mono: bool,
    pub language: bool,
    pub parental_rating: bool,
    pub broadcast_name: bool,
    pub program_info: bool,
}

impl Default for MetadataToggles {
    fn default() -> Self {
        Self {
            implicit_mono: true,
            language: true,
            parental_rating: true,
            broadcast_name: true,
            program_info: true,
        }
    }
}

impl MetadataToggles {
    pub fn none() -> Self {
        Self {
            implicit_mono: false,
            language: false,
            parental_rating: false,
            broadcast_name: false,
            program_info: false,
        }
    }
}

/// Requested metadata for one subgroup, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubgroupMetadata {
    pub language: Option<String>,
    pub parental_rating: Option<u8>,
    pub broadcast_name: Option<String>,
    pub program_info: Option<String>,
}

/// Metadata attached to a finished codec configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecMetadata {
    pub streaming_context: u16,
    pub language: Option<[u8; LANGUAGE_CODE_SIZE]>,
    pub parental_rating: Option<ParentalRating>,
    pub broadcast_name: Option<String>,
    pub program_info: Option<String>,
}

/// Codec configuration for one subgroup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgroupCodecConfig {
    pub index: usize,
    pub codec: CodecParams,
    pub metadata: CodecMetadata,
}

impl SubgroupCodecConfig {
    /// Codec-specific configuration as LTV records
    pub fn codec_ltv(&self) -> Bytes {
        let mut w = LtvWriter::new();
        w.put_u8(codec_type::SAMPLING_FREQUENCY, self.codec.sampling_frequency.code())
            .put_u8(codec_type::FRAME_DURATION, self.codec.frame_duration.code());
        if let Some(location) = self.codec.channel_allocation {
            w.put_u32(codec_type::CHANNEL_ALLOCATION, location.0);
        }
        w.put_u16(codec_type::OCTETS_PER_FRAME, self.codec.octets_per_frame)
            .put_u8(codec_type::FRAMES_PER_SDU, self.codec.frames_per_sdu);
        w.finish()
    }

    /// Metadata as LTV records
    pub fn metadata_ltv(&self) -> Bytes {
        let m = &self.metadata;
        let mut w = LtvWriter::new();
        w.put_u16(metadata_type::STREAMING_CONTEXTS, m.streaming_context);
        if let Some(lang) = &m.language {
            w.put(metadata_type::LANGUAGE, lang);
        }
        if let Some(rating) = m.parental_rating {
            w.put_u8(metadata_type::PARENTAL_RATING, rating.value());
        }
        if let Some(name) = &m.broadcast_name {
            w.put(metadata_type::BROADCAST_NAME, name.as_bytes());
        }
        if let Some(info) = &m.program_info {
            w.put(metadata_type::PROGRAM_INFO, info.as_bytes());
        }
        w.finish()
    }
}

/// Free text is attached verbatim or not at all
fn metadata_text(index: usize, field: &str, text: Option<&str>) -> Option<String> {
    let text = text.filter(|s| !s.is_empty())?;
    if text.len() > ltv::MAX_VALUE_SIZE {
        tracing::debug!(subgroup = index, field, len = text.len(), "Metadata text too long, omitted");
        return None;
    }
    Some(text.to_string())
}

/// Derives subgroup codec configurations from the active preset
pub struct SubgroupConfigurator<'a> {
    preset: &'a Preset,
    layout: ChannelLayout,
    toggles: MetadataToggles,
}

impl<'a> SubgroupConfigurator<'a> {
    pub fn new(preset: &'a Preset, layout: ChannelLayout, toggles: MetadataToggles) -> Self {
        Self {
            preset,
            layout,
            toggles,
        }
    }

    /// Build the configuration for subgroup `index`
    pub fn configure(&self, index: usize, requested: &SubgroupMetadata) -> SubgroupCodecConfig {
        let mut codec = self.preset.codec.clone();
        let mut metadata = CodecMetadata {
            streaming_context: codec.streaming_context,
            ..Default::default()
        };

        if self.toggles.implicit_mono && self.layout.is_single_channel() {
            codec.channel_allocation = None;
        }

        if self.toggles.language {
            if let Some(lang) = &requested.language {
                match <[u8; LANGUAGE_CODE_SIZE]>::try_from(lang.as_bytes()) {
                    Ok(code) => metadata.language = Some(code),
                    Err(_) => tracing::debug!(subgroup = index, %lang, "Language code omitted"),
                }
            }
        }

        if self.toggles.parental_rating {
            if let Some(raw) = requested.parental_rating {
                metadata.parental_rating = ParentalRating::from_raw(raw);
                if metadata.parental_rating.is_none() {
                    tracing::debug!(subgroup = index, raw, "Parental rating omitted");
                }
            }
        }

        if self.toggles.broadcast_name {
            metadata.broadcast_name = metadata_text(index, "broadcast name", requested.broadcast_name.as_deref());
        }

        if self.toggles.program_info {
            metadata.program_info = metadata_text(index, "program info", requested.program_info.as_deref());
        }

        SubgroupCodecConfig {
            index,
            codec,
            metadata,
        }
    }

    /// Build one configuration per subgroup
    pub fn configure_all(&self, subgroups: &[SubgroupMetadata]) -> Vec<SubgroupCodecConfig> {
        subgroups
            .iter()
            .enumerate()
            .map(|(i, m)| self.configure(i, m))
            .collect()
    }
}
