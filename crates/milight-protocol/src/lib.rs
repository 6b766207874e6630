//! MiLight Protocol Library
//!
//! This crate builds and parses the raw 2.4GHz packets understood by the
//! MiLight / LimitlessLED family of remote-controlled bulbs:
//!
//! - **RGBW** (FUT096): 7-byte packets, button codes per group
//! - **CCT** (FUT007): 7-byte packets with an additive checksum
//! - **RGB** (FUT098): 6-byte packets, no groups
//! - **FUT020**: 6-byte packets, toggle-style buttons
//! - **V2** (RGB+CCT / FUT092, FUT089, FUT091): 9-byte whitened packets
//!
//! # Architecture
//!
//! Each protocol module provides a [`PacketFormatter`] implementation that:
//! - Accumulates semantic operations (hue, brightness, ...) into raw packets
//! - Finalizes them into a [`PacketStream`] of one or more packets
//! - Parses raw packets back into a [`ParsedPacket`] of field updates
//! - Recognizes its own packets for dispatch ([`PacketFormatter::can_handle`])
//!
//! Some V2 protocols reuse one opcode for two fields depending on whether the
//! bulb is in white or color mode. Those formatters consult the [`BulbState`]
//! snapshot captured at `prepare` time and bracket the real command with mode
//! switches when needed.
//!
//! # Example
//!
//! ```rust
//! use milight_protocol::{Formatters, FormatterOptions, MemoryStateStore, RemoteType};
//!
//! let mut formatters = Formatters::new(FormatterOptions::default());
//! let formatter = formatters.get_mut(RemoteType::RgbCct);
//!
//! formatter.prepare(0x1234, 1, None);
//! formatter.update_brightness(75);
//! let stream = formatter.build_packets();
//! formatter.reset();
//!
//! assert_eq!(stream.len(), 1);
//!
//! let store = MemoryStateStore::new();
//! let parsed = formatters.parse(&stream.packets()[0], &store).unwrap();
//! assert_eq!(parsed.updates.brightness, Some(75));
//! ```

pub mod cct;
pub mod command;
pub mod error;
pub mod formatter;
pub mod fut020;
pub mod fut089;
pub mod fut091;
pub mod remote;
pub mod rgb;
pub mod rgb_cct;
pub mod rgbw;
pub mod scale;
pub mod state;
pub mod units;
pub mod v2;
pub mod v2_encoding;

use std::fmt;
use std::str::FromStr;

pub use command::{BulbId, BulbMode, CommandName, FieldUpdates, ParsedPacket, RawCommand, Status};
pub use error::{ParseError, ProtocolError};
pub use formatter::{FormatterOptions, PacketFormatter, PacketStream, Session};
pub use remote::{Formatters, RadioConfig, RemoteConfig, ALL_RADIO_CONFIGS, ALL_REMOTES};
pub use state::{BulbState, MemoryStateStore, NoState, StateStore};

/// Identifies which remote-control protocol family a bulb speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RemoteType {
    /// RGBW bulbs (FUT096 remote)
    Rgbw,
    /// Dual-white bulbs (FUT007 remote)
    Cct,
    /// RGB+CCT bulbs (FUT092 remote, V2 protocol)
    RgbCct,
    /// RGB-only bulbs (FUT098 remote)
    Rgb,
    /// RGB+CCT bulbs paired to the 8-zone FUT089 remote (V2 protocol)
    Fut089,
    /// Dual-white bulbs paired to the FUT091 remote (V2 protocol)
    Fut091,
    /// Single-zone FUT020 RGB remote
    Fut020,
}

impl RemoteType {
    /// All remote types, in dispatch order
    pub const ALL: [RemoteType; 7] = [
        RemoteType::Rgbw,
        RemoteType::Cct,
        RemoteType::RgbCct,
        RemoteType::Rgb,
        RemoteType::Fut089,
        RemoteType::Fut091,
        RemoteType::Fut020,
    ];

    /// Returns the canonical name for the remote type
    pub fn name(&self) -> &'static str {
        match self {
            RemoteType::Rgbw => "rgbw",
            RemoteType::Cct => "cct",
            RemoteType::RgbCct => "rgb_cct",
            RemoteType::Rgb => "rgb",
            RemoteType::Fut089 => "fut089",
            RemoteType::Fut091 => "fut091",
            RemoteType::Fut020 => "fut020",
        }
    }

    /// Returns alternate names accepted when parsing
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            RemoteType::Rgbw => &["fut096"],
            RemoteType::Cct => &["fut007"],
            RemoteType::RgbCct => &["fut092"],
            RemoteType::Rgb => &["fut098"],
            RemoteType::Fut089 => &[],
            RemoteType::Fut091 => &["v2_cct"],
            RemoteType::Fut020 => &[],
        }
    }

    /// Whether bulbs of this type can display RGB colors
    pub fn supports_rgb(&self) -> bool {
        matches!(
            self,
            RemoteType::Fut089 | RemoteType::Rgb | RemoteType::RgbCct | RemoteType::Rgbw
        )
    }

    /// Whether bulbs of this type have a separate white channel
    pub fn supports_rgbw(&self) -> bool {
        matches!(
            self,
            RemoteType::Fut089 | RemoteType::RgbCct | RemoteType::Rgbw
        )
    }

    /// Whether bulbs of this type have an adjustable color temperature
    pub fn supports_color_temp(&self) -> bool {
        matches!(
            self,
            RemoteType::Cct | RemoteType::Fut089 | RemoteType::Fut091 | RemoteType::RgbCct
        )
    }

    /// Descriptor for this remote type
    pub fn config(&self) -> &'static RemoteConfig {
        RemoteConfig::from_type(*self)
    }
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemoteType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RemoteType::ALL
            .iter()
            .copied()
            .find(|t| {
                t.name().eq_ignore_ascii_case(s)
                    || t.aliases().iter().any(|a| a.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| ProtocolError::UnknownRemote(s.to_string()))
    }
}

/// Create a formatter for the given remote type
pub fn create_formatter(
    remote_type: RemoteType,
    options: FormatterOptions,
) -> Box<dyn PacketFormatter> {
    match remote_type {
        RemoteType::Rgbw => Box::new(rgbw::RgbwFormatter::new()),
        RemoteType::Cct => Box::new(cct::CctFormatter::new()),
        RemoteType::RgbCct => Box::new(rgb_cct::RgbCctFormatter::new(options)),
        RemoteType::Rgb => Box::new(rgb::RgbFormatter::new()),
        RemoteType::Fut089 => Box::new(fut089::Fut089Formatter::new(options)),
        RemoteType::Fut091 => Box::new(fut091::Fut091Formatter::new()),
        RemoteType::Fut020 => Box::new(fut020::Fut020Formatter::new()),
    }
}

/// Format bytes as space-separated upper-case hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text (optionally separated by spaces, colons or `0x` prefixes)
pub fn from_hex(text: &str) -> Result<Vec<u8>, ParseError> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|chunk| chunk.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(ParseError::InvalidHex(text.to_string()));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ParseError::InvalidHex(text.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_type_from_name() {
        assert_eq!("rgb_cct".parse::<RemoteType>().unwrap(), RemoteType::RgbCct);
        assert_eq!("FUT092".parse::<RemoteType>().unwrap(), RemoteType::RgbCct);
        assert_eq!("v2_cct".parse::<RemoteType>().unwrap(), RemoteType::Fut091);
        assert_eq!("fut096".parse::<RemoteType>().unwrap(), RemoteType::Rgbw);
    }

    #[test]
    fn test_unknown_remote_type_is_rejected() {
        let err = "fut999".parse::<RemoteType>().unwrap_err();
        assert_eq!(err, ProtocolError::UnknownRemote("fut999".to_string()));
    }

    #[test]
    fn test_names_roundtrip() {
        for t in RemoteType::ALL {
            assert_eq!(t.name().parse::<RemoteType>().unwrap(), t);
        }
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(from_hex("B0 12 34").unwrap(), vec![0xB0, 0x12, 0x34]);
        assert_eq!(from_hex("0xB0:0x12").unwrap(), vec![0xB0, 0x12]);
        assert_eq!(from_hex("a4f1").unwrap(), vec![0xA4, 0xF1]);
        assert!(from_hex("B0 1").is_err());
        assert!(from_hex("ZZ").is_err());
        assert_eq!(to_hex(&[0x0A, 0xFF]), "0A FF");
    }
}
