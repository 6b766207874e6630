//! Normalized bulb command representation
//!
//! Parsed packets from every protocol are reduced to a [`BulbId`] plus a set
//! of [`FieldUpdates`], which is also the input format for the gateway client.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::units;
use crate::RemoteType;

/// On/off status of a bulb group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Status {
    On,
    Off,
}

impl Status {
    /// The opposite status
    pub fn toggled(&self) -> Status {
        match self {
            Status::On => Status::Off,
            Status::Off => Status::On,
        }
    }
}

impl FromStr for Status {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(Status::On),
            "off" | "false" | "0" => Ok(Status::Off),
            _ => Err(ProtocolError::InvalidStatus(s.to_string())),
        }
    }
}

/// Mutually exclusive operating modes of a bulb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BulbMode {
    /// White channel active (color temperature applies)
    #[default]
    White,
    /// RGB channel active (hue and saturation apply)
    Color,
    /// Built-in effect/scene running
    Scene,
    /// Night light
    Night,
}

/// Named commands that do not carry a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommandName {
    Pair,
    Unpair,
    SetWhite,
    NightMode,
    BrightnessUp,
    BrightnessDown,
    TemperatureUp,
    TemperatureDown,
    NextMode,
    PreviousMode,
    ModeSpeedUp,
    ModeSpeedDown,
    ColorWhiteToggle,
    /// Flip the on/off status
    Toggle,
}

impl CommandName {
    /// Returns the wire-facing name of the command
    pub fn name(&self) -> &'static str {
        match self {
            CommandName::Pair => "pair",
            CommandName::Unpair => "unpair",
            CommandName::SetWhite => "set_white",
            CommandName::NightMode => "night_mode",
            CommandName::BrightnessUp => "brightness_up",
            CommandName::BrightnessDown => "brightness_down",
            CommandName::TemperatureUp => "temperature_up",
            CommandName::TemperatureDown => "temperature_down",
            CommandName::NextMode => "next_mode",
            CommandName::PreviousMode => "previous_mode",
            CommandName::ModeSpeedUp => "mode_speed_up",
            CommandName::ModeSpeedDown => "mode_speed_down",
            CommandName::ColorWhiteToggle => "color_white_toggle",
            CommandName::Toggle => "toggle",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cmd = match s.to_ascii_lowercase().as_str() {
            "pair" => CommandName::Pair,
            "unpair" => CommandName::Unpair,
            "set_white" | "white" | "white_mode" => CommandName::SetWhite,
            "night_mode" => CommandName::NightMode,
            "brightness_up" | "level_up" => CommandName::BrightnessUp,
            "brightness_down" | "level_down" => CommandName::BrightnessDown,
            "temperature_up" => CommandName::TemperatureUp,
            "temperature_down" => CommandName::TemperatureDown,
            "next_mode" => CommandName::NextMode,
            "previous_mode" => CommandName::PreviousMode,
            "mode_speed_up" => CommandName::ModeSpeedUp,
            "mode_speed_down" => CommandName::ModeSpeedDown,
            "color_white_toggle" => CommandName::ColorWhiteToggle,
            "toggle" => CommandName::Toggle,
            _ => return Err(ProtocolError::UnknownCommand(s.to_string())),
        };
        Ok(cmd)
    }
}

/// Identifies one addressable bulb group
///
/// A zero device/group pair is reserved for packets that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BulbId {
    pub device_id: u16,
    pub group_id: u8,
    pub remote_type: RemoteType,
}

impl BulbId {
    /// Create a new bulb id
    pub fn new(device_id: u16, group_id: u8, remote_type: RemoteType) -> Self {
        Self {
            device_id,
            group_id,
            remote_type,
        }
    }

    /// Sentinel id for packets that could not be attributed to a bulb
    pub fn undecoded(remote_type: RemoteType) -> Self {
        Self::new(0, 0, remote_type)
    }

    /// Whether this is the undecoded sentinel
    pub fn is_undecoded(&self) -> bool {
        self.device_id == 0 && self.group_id == 0
    }

    /// Pack into a single integer (`remote << 24 | device << 8 | group`)
    pub fn compact_id(&self) -> u32 {
        ((self.remote_type as u32) << 24) | ((self.device_id as u32) << 8) | self.group_id as u32
    }

    /// Device id formatted as `0x1A2B`
    pub fn hex_device_id(&self) -> String {
        format!("0x{:04X}", self.device_id)
    }
}

impl fmt::Display for BulbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.remote_type,
            self.hex_device_id(),
            self.group_id
        )
    }
}

/// A raw button/argument pair that did not map to a known field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawCommand {
    pub button_id: u8,
    pub argument: u8,
}

/// Semantic field updates carried by one packet
///
/// Value ranges: brightness, saturation and temperature are 0-100, hue is
/// 0-359 degrees, mode is the protocol's effect index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldUpdates {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub status: Option<Status>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub brightness: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub hue: Option<u16>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub saturation: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub temperature: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub mode: Option<u8>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub command: Option<CommandName>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub raw: Option<RawCommand>,
}

impl FieldUpdates {
    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        *self == FieldUpdates::default()
    }

    /// Temperature expressed in mireds, if present
    pub fn color_temp_mireds(&self) -> Option<u16> {
        self.temperature
            .map(|t| units::white_val_to_mireds(t, 100))
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_hue(mut self, hue: u16) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn with_saturation(mut self, saturation: u8) -> Self {
        self.saturation = Some(saturation);
        self
    }

    pub fn with_temperature(mut self, temperature: u8) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_command(mut self, command: CommandName) -> Self {
        self.command = Some(command);
        self
    }
}

/// Result of parsing one raw packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedPacket {
    /// The addressed bulb group
    pub bulb_id: BulbId,
    /// Fields the packet changes
    pub updates: FieldUpdates,
}

impl ParsedPacket {
    pub fn new(bulb_id: BulbId) -> Self {
        Self {
            bulb_id,
            updates: FieldUpdates::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_roundtrip() {
        let all = [
            CommandName::Pair,
            CommandName::Unpair,
            CommandName::SetWhite,
            CommandName::NightMode,
            CommandName::BrightnessUp,
            CommandName::BrightnessDown,
            CommandName::TemperatureUp,
            CommandName::TemperatureDown,
            CommandName::NextMode,
            CommandName::PreviousMode,
            CommandName::ModeSpeedUp,
            CommandName::ModeSpeedDown,
            CommandName::ColorWhiteToggle,
            CommandName::Toggle,
        ];

        for cmd in all {
            assert_eq!(cmd.name().parse::<CommandName>().unwrap(), cmd);
        }
    }

    #[test]
    fn test_command_aliases() {
        assert_eq!("level_up".parse::<CommandName>().unwrap(), CommandName::BrightnessUp);
        assert_eq!("white_mode".parse::<CommandName>().unwrap(), CommandName::SetWhite);
        assert!("explode".parse::<CommandName>().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("ON".parse::<Status>().unwrap(), Status::On);
        assert_eq!("off".parse::<Status>().unwrap(), Status::Off);
        assert!("maybe".parse::<Status>().is_err());
        assert_eq!(Status::On.toggled(), Status::Off);
    }

    #[test]
    fn test_bulb_id_equality_uses_all_fields() {
        let a = BulbId::new(0x1234, 1, RemoteType::RgbCct);
        assert_eq!(a, BulbId::new(0x1234, 1, RemoteType::RgbCct));
        assert_ne!(a, BulbId::new(0x1234, 1, RemoteType::Fut089));
        assert_ne!(a, BulbId::new(0x1234, 2, RemoteType::RgbCct));
        assert!(BulbId::undecoded(RemoteType::Rgb).is_undecoded());
        assert_eq!(a.to_string(), "rgb_cct/0x1234/1");
    }

    #[test]
    fn test_color_temp_mireds() {
        let updates = FieldUpdates::default().with_temperature(0);
        assert_eq!(updates.color_temp_mireds(), Some(153));
        let updates = FieldUpdates::default().with_temperature(100);
        assert_eq!(updates.color_temp_mireds(), Some(370));
    }
}
