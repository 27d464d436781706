//! Standard LC3 broadcast presets
//!
//! The closed set of Basic Audio Profile broadcast presets. Each entry pairs
//! the codec configuration (sampling frequency, frame duration, octets per
//! frame) with the isochronous QoS it is transmitted with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PresetError;

/// LC3 sampling frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingFrequency {
    Hz8000,
    Hz16000,
    Hz24000,
    Hz32000,
    Hz44100,
    Hz48000,
}

impl SamplingFrequency {
    pub fn hz(self) -> u32 {
        match self {
            Self::Hz8000 => 8_000,
            Self::Hz16000 => 16_000,
            Self::Hz24000 => 24_000,
            Self::Hz32000 => 32_000,
            Self::Hz44100 => 44_100,
            Self::Hz48000 => 48_000,
        }
    }

    /// Assigned number used in codec-specific configuration
    pub fn code(self) -> u8 {
        match self {
            Self::Hz8000 => 0x01,
            Self::Hz16000 => 0x03,
            Self::Hz24000 => 0x05,
            Self::Hz32000 => 0x06,
            Self::Hz44100 => 0x07,
            Self::Hz48000 => 0x08,
        }
    }
}

/// LC3 frame duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameDuration {
    Ms7_5,
    Ms10,
}

impl FrameDuration {
    pub fn us(self) -> u32 {
        match self {
            Self::Ms7_5 => 7_500,
            Self::Ms10 => 10_000,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Ms7_5 => 0x00,
            Self::Ms10 => 0x01,
        }
    }
}

/// ISO SDU framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Framing {
    Unframed,
    Framed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phy {
    Le1M,
    Le2M,
}

/// Audio location bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioLocation(pub u32);

impl AudioLocation {
    pub const MONO_AUDIO: Self = Self(0);
    pub const FRONT_LEFT: Self = Self(0x0000_0001);
    pub const FRONT_RIGHT: Self = Self(0x0000_0002);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Channel layout of every broadcast stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn location(self) -> AudioLocation {
        match self {
            Self::Mono => AudioLocation::MONO_AUDIO,
            Self::Stereo => AudioLocation::FRONT_LEFT.union(AudioLocation::FRONT_RIGHT),
        }
    }

    pub fn is_single_channel(self) -> bool {
        matches!(self, Self::Mono)
    }
}

/// Streaming audio context "unspecified"
pub const CONTEXT_UNSPECIFIED: u16 = 0x0001;

/// Codec parameters carried in each subgroup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecParams {
    pub sampling_frequency: SamplingFrequency,
    pub frame_duration: FrameDuration,
    pub octets_per_frame: u16,
    pub frames_per_sdu: u8,
    /// `None` means implicit mono
    pub channel_allocation: Option<AudioLocation>,
    pub streaming_context: u16,
}

/// Isochronous transmission parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QosParams {
    pub interval_us: u32,
    pub framing: Framing,
    pub phy: Phy,
    pub sdu: u16,
    pub retransmissions: u8,
    pub latency_ms: u16,
    pub presentation_delay_us: u32,
}

/// A named preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub name: PresetName,
    pub codec: CodecParams,
    pub qos: QosParams,
}

const PRESENTATION_DELAY_US: u32 = 40_000;

struct PresetEntry {
    freq: SamplingFrequency,
    duration: FrameDuration,
    octets: u16,
    interval_us: u32,
    framing: Framing,
    retransmissions: u8,
    latency_ms: u16,
}

macro_rules! broadcast_presets {
    ($(
        $variant:ident => $key:literal:
            $freq:ident, $dur:ident, $octets:literal,
            $interval:literal, $framing:ident, $rtn:literal, $latency:literal;
    )*) => {
        /// Identifier of a standard broadcast preset
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PresetName {
            $($variant,)*
        }

        impl PresetName {
            /// Every preset in catalog order
            pub const ALL: &'static [PresetName] = &[$(PresetName::$variant,)*];

            /// Catalog key, e.g. `"16_2_1"`
            pub fn as_str(self) -> &'static str {
                match self {
                    $(PresetName::$variant => $key,)*
                }
            }

            fn entry(self) -> PresetEntry {
                match self {
                    $(PresetName::$variant => PresetEntry {
                        freq: SamplingFrequency::$freq,
                        duration: FrameDuration::$dur,
                        octets: $octets,
                        interval_us: $interval,
                        framing: Framing::$framing,
                        retransmissions: $rtn,
                        latency_ms: $latency,
                    },)*
                }
            }
        }
    };
}

broadcast_presets! {
    P8_1_1 => "8_1_1": Hz8000, Ms7_5, 26, 7_500, Unframed, 2, 8;
    P8_2_1 => "8_2_1": Hz8000, Ms10, 30, 10_000, Unframed, 2, 10;
    P16_1_1 => "16_1_1": Hz16000, Ms7_5, 30, 7_500, Unframed, 2, 8;
    P16_2_1 => "16_2_1": Hz16000, Ms10, 40, 10_000, Unframed, 2, 10;
    P24_1_1 => "24_1_1": Hz24000, Ms7_5, 45, 7_500, Unframed, 2, 8;
    P24_2_1 => "24_2_1": Hz24000, Ms10, 60, 10_000, Unframed, 2, 10;
    P32_1_1 => "32_1_1": Hz32000, Ms7_5, 60, 7_500, Unframed, 2, 8;
    P32_2_1 => "32_2_1": Hz32000, Ms10, 80, 10_000, Unframed, 2, 10;
    P441_1_1 => "441_1_1": Hz44100, Ms7_5, 97, 8_163, Framed, 4, 24;
    P441_2_1 => "441_2_1": Hz44100, Ms10, 130, 10_884, Framed, 4, 31;
    P48_1_1 => "48_1_1": Hz48000, Ms7_5, 75, 7_500, Unframed, 4, 15;
    P48_2_1 => "48_2_1": Hz48000, Ms10, 100, 10_000, Unframed, 4, 20;
    P48_3_1 => "48_3_1": Hz48000, Ms7_5, 90, 7_500, Unframed, 4, 15;
    P48_4_1 => "48_4_1": Hz48000, Ms10, 120, 10_000, Unframed, 4, 20;
    P48_5_1 => "48_5_1": Hz48000, Ms7_5, 117, 7_500, Unframed, 4, 15;
    P48_6_1 => "48_6_1": Hz48000, Ms10, 155, 10_000, Unframed, 4, 20;
    // High reliability
    P8_1_2 => "8_1_2": Hz8000, Ms7_5, 26, 7_500, Unframed, 4, 45;
    P8_2_2 => "8_2_2": Hz8000, Ms10, 30, 10_000, Unframed, 4, 60;
    P16_1_2 => "16_1_2": Hz16000, Ms7_5, 30, 7_500, Unframed, 4, 45;
    P16_2_2 => "16_2_2": Hz16000, Ms10, 40, 10_000, Unframed, 4, 60;
    P24_1_2 => "24_1_2": Hz24000, Ms7_5, 45, 7_500, Unframed, 4, 45;
    P24_2_2 => "24_2_2": Hz24000, Ms10, 60, 10_000, Unframed, 4, 60;
    P32_1_2 => "32_1_2": Hz32000, Ms7_5, 60, 7_500, Unframed, 4, 45;
    P32_2_2 => "32_2_2": Hz32000, Ms10, 80, 10_000, Unframed, 4, 60;
    P441_1_2 => "441_1_2": Hz44100, Ms7_5, 97, 8_163, Framed, 4, 54;
    P441_2_2 => "441_2_2": Hz44100, Ms10, 130, 10_884, Framed, 4, 60;
    P48_1_2 => "48_1_2": Hz48000, Ms7_5, 75, 7_500, Unframed, 4, 50;
    P48_2_2 => "48_2_2": Hz48000, Ms10, 100, 10_000, Unframed, 4, 65;
    P48_3_2 => "48_3_2": Hz48000, Ms7_5, 90, 7_500, Unframed, 4, 50;
    P48_4_2 => "48_4_2": Hz48000, Ms10, 120, 10_000, Unframed, 4, 65;
    P48_5_2 => "48_5_2": Hz48000, Ms7_5, 117, 7_500, Unframed, 4, 50;
    P48_6_2 => "48_6_2": Hz48000, Ms10, 155, 10_000, Unframed, 4, 65;
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PresetError::NotFound(s.to_string()))
    }
}

impl Serialize for PresetName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Preset table bound to an audio location and streaming context
#[derive(Debug, Clone, Copy)]
pub struct PresetCatalog {
    location: AudioLocation,
    context: u16,
}

impl PresetCatalog {
    pub fn new(location: AudioLocation, context: u16) -> Self {
        Self { location, context }
    }

    /// Catalog for the given layout with the unspecified context
    pub fn for_layout(layout: ChannelLayout) -> Self {
        Self::new(layout.location(), CONTEXT_UNSPECIFIED)
    }

    /// Exact-match lookup by catalog key
    pub fn lookup(&self, name: &str) -> Result<Preset, PresetError> {
        let name: PresetName = name.parse()?;
        Ok(self.get(name))
    }

    /// Resolve an enumerated preset; cannot fail
    pub fn get(&self, name: PresetName) -> Preset {
        let e = name.entry();
        Preset {
            name,
            codec: CodecParams {
                sampling_frequency: e.freq,
                frame_duration: e.duration,
                octets_per_frame: e.octets,
                frames_per_sdu: 1,
                channel_allocation: Some(self.location),
                streaming_context: self.context,
            },
            qos: QosParams {
                interval_us: e.interval_us,
                framing: e.framing,
                phy: Phy::Le2M,
                sdu: e.octets,
                retransmissions: e.retransmissions,
                latency_ms: e.latency_ms,
                presentation_delay_us: PRESENTATION_DELAY_US,
            },
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Preset> + '_ {
        PresetName::ALL.iter().map(move |&name| self.get(name))
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::for_layout(ChannelLayout::Mono)
    }
}
