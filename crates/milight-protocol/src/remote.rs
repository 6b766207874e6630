//! Static remote and radio descriptors, and the formatter registry

use tracing::trace;

use crate::command::ParsedPacket;
use crate::error::ProtocolError;
use crate::formatter::{FormatterOptions, PacketFormatter};
use crate::state::StateStore;
use crate::{create_formatter, RemoteType};

/// Physical radio settings shared by one or more remote types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RadioConfig {
    /// Position in [`ALL_RADIO_CONFIGS`]
    pub index: usize,
    pub syncword0: u16,
    pub syncword3: u16,
    pub packet_len: usize,
    pub channels: [u8; 3],
}

pub static ALL_RADIO_CONFIGS: [RadioConfig; 5] = [
    RadioConfig {
        index: 0,
        syncword0: 0x147A,
        syncword3: 0x258B,
        packet_len: 7,
        channels: [9, 40, 71],
    },
    RadioConfig {
        index: 1,
        syncword0: 0x050A,
        syncword3: 0x55AA,
        packet_len: 7,
        channels: [4, 39, 74],
    },
    RadioConfig {
        index: 2,
        syncword0: 0x7236,
        syncword3: 0x1809,
        packet_len: 9,
        channels: [8, 39, 70],
    },
    RadioConfig {
        index: 3,
        syncword0: 0x9AAB,
        syncword3: 0xBCCD,
        packet_len: 6,
        channels: [3, 38, 73],
    },
    RadioConfig {
        index: 4,
        syncword0: 0x50A0,
        syncword3: 0xAA55,
        packet_len: 6,
        channels: [6, 41, 76],
    },
];

/// Descriptor for one remote type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RemoteConfig {
    pub remote_type: RemoteType,
    pub name: &'static str,
    pub packet_len: usize,
    /// Numbered groups, not counting group 0 ("all")
    pub num_groups: u8,
    /// Index into [`ALL_RADIO_CONFIGS`]
    pub radio: usize,
}

/// Every remote, in dispatch order
pub static ALL_REMOTES: [RemoteConfig; 7] = [
    RemoteConfig {
        remote_type: RemoteType::Rgbw,
        name: "rgbw",
        packet_len: 7,
        num_groups: 4,
        radio: 0,
    },
    RemoteConfig {
        remote_type: RemoteType::Cct,
        name: "cct",
        packet_len: 7,
        num_groups: 4,
        radio: 1,
    },
    RemoteConfig {
        remote_type: RemoteType::RgbCct,
        name: "rgb_cct",
        packet_len: 9,
        num_groups: 4,
        radio: 2,
    },
    RemoteConfig {
        remote_type: RemoteType::Rgb,
        name: "rgb",
        packet_len: 6,
        num_groups: 0,
        radio: 3,
    },
    RemoteConfig {
        remote_type: RemoteType::Fut089,
        name: "fut089",
        packet_len: 9,
        num_groups: 8,
        radio: 2,
    },
    RemoteConfig {
        remote_type: RemoteType::Fut091,
        name: "fut091",
        packet_len: 9,
        num_groups: 4,
        radio: 2,
    },
    RemoteConfig {
        remote_type: RemoteType::Fut020,
        name: "fut020",
        packet_len: 6,
        num_groups: 0,
        radio: 4,
    },
];

impl RemoteConfig {
    pub fn from_type(remote_type: RemoteType) -> &'static RemoteConfig {
        match remote_type {
            RemoteType::Rgbw => &ALL_REMOTES[0],
            RemoteType::Cct => &ALL_REMOTES[1],
            RemoteType::RgbCct => &ALL_REMOTES[2],
            RemoteType::Rgb => &ALL_REMOTES[3],
            RemoteType::Fut089 => &ALL_REMOTES[4],
            RemoteType::Fut091 => &ALL_REMOTES[5],
            RemoteType::Fut020 => &ALL_REMOTES[6],
        }
    }

    /// Look up by canonical name or alias, ignoring case
    pub fn from_name(name: &str) -> Result<&'static RemoteConfig, ProtocolError> {
        let remote_type: RemoteType = name.parse()?;
        Ok(Self::from_type(remote_type))
    }

    pub fn radio_config(&self) -> &'static RadioConfig {
        &ALL_RADIO_CONFIGS[self.radio]
    }

    /// Remotes that share the given radio configuration
    pub fn for_radio(radio: usize) -> impl Iterator<Item = &'static RemoteConfig> {
        ALL_REMOTES.iter().filter(move |r| r.radio == radio)
    }
}

/// One formatter per remote type
pub struct Formatters {
    formatters: Vec<Box<dyn PacketFormatter>>,
}

impl Formatters {
    pub fn new(options: FormatterOptions) -> Self {
        Self {
            formatters: RemoteType::ALL
                .iter()
                .map(|t| create_formatter(*t, options))
                .collect(),
        }
    }

    pub fn get(&self, remote_type: RemoteType) -> &dyn PacketFormatter {
        self.formatters[remote_type as usize].as_ref()
    }

    pub fn get_mut(&mut self, remote_type: RemoteType) -> &mut dyn PacketFormatter {
        self.formatters[remote_type as usize].as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PacketFormatter> {
        self.formatters.iter().map(|f| f.as_ref())
    }

    /// First remote type, in dispatch order, that claims `bytes`
    pub fn identify(&self, bytes: &[u8]) -> Option<RemoteType> {
        self.iter()
            .find(|f| f.can_handle(bytes))
            .map(|f| f.remote_type())
    }

    /// Dispatch a raw packet to whichever formatter claims it
    pub fn parse(&self, bytes: &[u8], states: &dyn StateStore) -> Result<ParsedPacket, ProtocolError> {
        let remote_type = self.identify(bytes).ok_or_else(|| {
            trace!("No formatter claims {} byte packet", bytes.len());
            ProtocolError::UnrecognizedPacket(bytes.len())
        })?;
        Ok(self.get(remote_type).parse_packet(bytes, states)?)
    }

    /// Like [`Formatters::parse`], restricted to remotes on one radio
    pub fn parse_for_radio(
        &self,
        radio: usize,
        bytes: &[u8],
        states: &dyn StateStore,
    ) -> Result<ParsedPacket, ProtocolError> {
        let formatter = RemoteConfig::for_radio(radio)
            .map(|r| self.get(r.remote_type))
            .find(|f| f.can_handle(bytes))
            .ok_or_else(|| {
                trace!("No formatter on radio {} claims {} byte packet", radio, bytes.len());
                ProtocolError::UnrecognizedPacket(bytes.len())
            })?;
        Ok(formatter.parse_packet(bytes, states)?)
    }
}

impl Default for Formatters {
    fn default() -> Self {
        Self::new(FormatterOptions::default())
    }
}
