//! RGBW bulbs (FUT096 remote)
//!
//! ```text
//! [0xB0 | mode, id_hi, id_lo, color, brightness << 3 | group, button, sequence]
//! ```

use tracing::warn;

use crate::command::{BulbId, CommandName, FieldUpdates, ParsedPacket, RawCommand, Status};
use crate::error::ParseError;
use crate::formatter::{expect_len, PacketFormatter, Session};
use crate::state::StateStore;
use crate::units;
use crate::RemoteType;

pub const PROTOCOL_ID_BYTE: u8 = 0xB0;
pub const PACKET_LEN: usize = 7;
pub const NUM_MODES: u8 = 9;

pub const COLOR_INDEX: usize = 3;
pub const BRIGHTNESS_GROUP_INDEX: usize = 4;
pub const BUTTON_INDEX: usize = 5;

pub const ALL_ON: u8 = 0x01;
pub const ALL_OFF: u8 = 0x02;
pub const GROUP_1_ON: u8 = 0x03;
pub const GROUP_4_OFF: u8 = 0x0A;
pub const SPEED_UP: u8 = 0x0B;
pub const SPEED_DOWN: u8 = 0x0C;
pub const DISCO_MODE: u8 = 0x0D;
pub const BRIGHTNESS: u8 = 0x0E;
pub const COLOR: u8 = 0x0F;
pub const ALL_WHITE: u8 = 0x11;
pub const GROUP_1_WHITE: u8 = 0x13;

/// Set on an OFF button to turn it into night mode
pub const NIGHT_FLAG: u8 = 0x10;
pub const HELD_FLAG: u8 = 0x80;

const MAX_PACKETS: usize = 8;
const MAX_GROUP: u8 = 4;

/// Group encoded in an on/off or white/night button
fn group_for_button(button: u8) -> u8 {
    button.saturating_sub(1) / 2
}

#[derive(Debug, Clone)]
pub struct RgbwFormatter {
    session: Session,
    sequence: u8,
}

impl RgbwFormatter {
    pub fn new() -> Self {
        Self {
            session: Session::new(MAX_PACKETS),
            sequence: 0,
        }
    }

    fn status_button(status: Status, group: u8) -> u8 {
        let on = if group == 0 {
            ALL_ON
        } else {
            GROUP_1_ON + 2 * (group - 1)
        };
        match status {
            Status::On => on,
            Status::Off => on + 1,
        }
    }

    fn current_mode(&self) -> u8 {
        self.session.state().mode
    }

    fn set_byte(&mut self, index: usize, value: u8) {
        if let Some(packet) = self.current_packet() {
            packet[index] = value;
        }
    }
}

impl Default for RgbwFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFormatter for RgbwFormatter {
    fn remote_type(&self) -> RemoteType {
        RemoteType::Rgbw
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn initialize_packet(&mut self, packet: &mut [u8]) {
        let device_id = self.session.device_id().to_be_bytes();
        packet.copy_from_slice(&[
            PROTOCOL_ID_BYTE,
            device_id[0],
            device_id[1],
            0,
            self.session.group_id() & 0x07,
            0,
            self.sequence,
        ]);
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// `arg` lands in the color byte
    fn command(&mut self, command: u8, arg: u8) {
        if !self.push_packet() {
            return;
        }
        let command = if self.session.held() {
            command | HELD_FLAG
        } else {
            command
        };
        self.set_byte(BUTTON_INDEX, command);
        self.set_byte(COLOR_INDEX, arg);
    }

    fn can_handle(&self, bytes: &[u8]) -> bool {
        bytes.len() == PACKET_LEN && bytes[0] & 0xF0 == PROTOCOL_ID_BYTE
    }

    fn update_status(&mut self, status: Status, group_id: u8) {
        if group_id > MAX_GROUP {
            warn!("rgbw: group {} out of range", group_id);
            return;
        }
        self.command(Self::status_button(status, group_id), 0);
    }

    fn update_brightness(&mut self, value: u8) {
        // [0, 100] maps to [0, 25], then onto the wire range
        // [16, 15, ..., 0, 31, ..., 23]
        let adjusted = units::rescale(value.min(100) as u32, 25, 100) as u8;
        let wire = ((31 - adjusted) + 17) % 32;

        self.command(BRIGHTNESS, 0);
        if let Some(packet) = self.current_packet() {
            packet[BRIGHTNESS_GROUP_INDEX] |= wire << 3;
        }
    }

    fn update_hue(&mut self, value: u16) {
        self.update_color_raw(units::hue_to_byte((value % 360 + 40) % 360));
    }

    fn update_color_raw(&mut self, value: u8) {
        self.command(COLOR, value);
    }

    fn update_color_white(&mut self) {
        let group = self.session.group_id();
        if group > MAX_GROUP {
            warn!("rgbw: group {} out of range", group);
            return;
        }
        let button = if group == 0 {
            ALL_WHITE
        } else {
            GROUP_1_WHITE + 2 * (group - 1)
        };
        self.command(button, 0);
    }

    fn update_mode(&mut self, mode: u8) {
        self.command(DISCO_MODE, 0);
        self.set_byte(0, PROTOCOL_ID_BYTE | (mode & 0x0F));
    }

    fn next_mode(&mut self) {
        self.update_mode((self.current_mode() % NUM_MODES + 1) % NUM_MODES);
    }

    fn previous_mode(&mut self) {
        self.update_mode((self.current_mode() % NUM_MODES + NUM_MODES - 1) % NUM_MODES);
    }

    fn mode_speed_up(&mut self) {
        self.command(SPEED_UP, 0);
    }

    fn mode_speed_down(&mut self) {
        self.command(SPEED_DOWN, 0);
    }

    /// Night mode must be preceded by a plain off
    fn enable_night_mode(&mut self) {
        let group = self.session.group_id();
        if group > MAX_GROUP {
            warn!("rgbw: group {} out of range", group);
            return;
        }
        self.update_status(Status::Off, group);
        self.command(Self::status_button(Status::Off, group) | NIGHT_FLAG, 0);
    }

    fn unpair(&mut self) {
        let group = self.session.group_id();
        self.update_status(Status::On, group);
        self.update_color_white();
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        expect_len(bytes, PACKET_LEN)?;
        if bytes[0] & 0xF0 != PROTOCOL_ID_BYTE {
            return Err(ParseError::UnexpectedProtocolId(bytes[0]));
        }

        let button = bytes[BUTTON_INDEX] & !HELD_FLAG;
        let device_id = u16::from_be_bytes([bytes[1], bytes[2]]);
        let mut parsed = ParsedPacket::new(BulbId::new(
            device_id,
            bytes[BRIGHTNESS_GROUP_INDEX] & 0x07,
            RemoteType::Rgbw,
        ));
        let updates: &mut FieldUpdates = &mut parsed.updates;

        if (ALL_ON..=GROUP_4_OFF).contains(&button) {
            // The group bits carry the last group used, not necessarily this one
            updates.status = Some(if button % 2 == 1 { Status::On } else { Status::Off });
            parsed.bulb_id.group_id = group_for_button(button);
        } else if button & NIGHT_FLAG != 0 {
            updates.command = Some(if button % 2 == 0 {
                CommandName::NightMode
            } else {
                CommandName::SetWhite
            });
            parsed.bulb_id.group_id = group_for_button(button & 0x0F);
        } else if button == BRIGHTNESS {
            let wire = bytes[BRIGHTNESS_GROUP_INDEX] >> 3;
            let level = (31 - wire + 17) % 32;
            updates.brightness = Some((units::rescale(level as u32, 100, 25) as u8).min(100));
        } else if button == COLOR {
            updates.hue = Some((units::byte_to_hue(bytes[COLOR_INDEX]) + 320) % 360);
        } else if button == SPEED_UP {
            updates.command = Some(CommandName::ModeSpeedUp);
        } else if button == SPEED_DOWN {
            updates.command = Some(CommandName::ModeSpeedDown);
        } else if button == DISCO_MODE {
            updates.mode = Some(bytes[0] & 0x0F);
        } else {
            updates.raw = Some(RawCommand {
                button_id: button,
                argument: bytes[COLOR_INDEX],
            });
        }

        Ok(parsed)
    }
}
