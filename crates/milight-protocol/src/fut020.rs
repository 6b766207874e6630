//! Single-zone FUT020 RGB remote
//!
//! ```text
//! [0xA5, id_hi, id_lo, argument, command, sequence]
//! ```
//!
//! On/off and color/white are toggles, so a status update always sends the
//! same press regardless of the requested status.

use crate::command::{BulbId, CommandName, FieldUpdates, ParsedPacket, RawCommand, Status};
use crate::error::ParseError;
use crate::formatter::{expect_len, step_to, PacketFormatter, Session, PAIR_REPEATS};
use crate::state::StateStore;
use crate::units;
use crate::RemoteType;

pub const PROTOCOL_ID_BYTE: u8 = 0xA5;
pub const PACKET_LEN: usize = 6;
pub const INTERVALS: u8 = 10;

pub const ARGUMENT_INDEX: usize = 3;
pub const COMMAND_INDEX: usize = 4;

pub const CMD_COLOR: u8 = 0x00;
pub const CMD_BRIGHTNESS_DOWN: u8 = 0x01;
pub const CMD_MODE_SWITCH: u8 = 0x02;
pub const CMD_BRIGHTNESS_UP: u8 = 0x03;
pub const CMD_ON_OFF: u8 = 0x04;
pub const CMD_COLOR_WHITE_TOGGLE: u8 = 0x05;

pub const HELD_FLAG: u8 = 0x10;

/// Hue 0 is sent as this color byte
pub const COLOR_OFFSET: u8 = 0xB0;

const MAX_PACKETS: usize = 20;

#[derive(Debug, Clone)]
pub struct Fut020Formatter {
    session: Session,
    sequence: u8,
}

impl Fut020Formatter {
    pub fn new() -> Self {
        Self {
            session: Session::new(MAX_PACKETS),
            sequence: 0,
        }
    }
}

impl Default for Fut020Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFormatter for Fut020Formatter {
    fn remote_type(&self) -> RemoteType {
        RemoteType::Fut020
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
            0,
            self.sequence,
        ]);
        self.sequence = self.sequence.wrapping_add(1);
    }

    fn command(&mut self, command: u8, arg: u8) {
        if !self.push_packet() {
            return;
        }
        let command = if self.session.held() {
            command | HELD_FLAG
        } else {
            command
        };
        if let Some(packet) = self.current_packet() {
            packet[COMMAND_INDEX] = command;
            packet[ARGUMENT_INDEX] = arg;
        }
    }

    fn can_handle(&self, bytes: &[u8]) -> bool {
        bytes.len() == PACKET_LEN && bytes[0] == PROTOCOL_ID_BYTE
    }

    fn update_status(&mut self, _status: Status, _group_id: u8) {
        self.command(CMD_ON_OFF, 0);
    }

    fn update_brightness(&mut self, value: u8) {
        let known = self.session.snapshot().and_then(|s| s.brightness).map(|b| b / INTERVALS);
        step_to(
            self,
            |f: &mut Self| f.increase_brightness(),
            |f: &mut Self| f.decrease_brightness(),
            INTERVALS,
            value / INTERVALS,
            known,
        );
    }

    fn increase_brightness(&mut self) {
        self.command(CMD_BRIGHTNESS_UP, 0);
    }

    fn decrease_brightness(&mut self) {
        self.command(CMD_BRIGHTNESS_DOWN, 0);
    }

    fn update_hue(&mut self, value: u16) {
        self.update_color_raw(units::hue_to_byte(value).wrapping_add(COLOR_OFFSET));
    }

    fn update_color_raw(&mut self, value: u8) {
        self.command(CMD_COLOR, value);
    }

    fn update_color_white(&mut self) {
        self.command(CMD_COLOR_WHITE_TOGGLE, 0);
    }

    fn next_mode(&mut self) {
        self.command(CMD_MODE_SWITCH, 0);
    }

    fn pair(&mut self) {
        for _ in 0..PAIR_REPEATS {
            self.command(CMD_BRIGHTNESS_UP, 0);
        }
    }

    fn unpair(&mut self) {
        self.pair();
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        expect_len(bytes, PACKET_LEN)?;
        if bytes[0] != PROTOCOL_ID_BYTE {
            return Err(ParseError::UnexpectedProtocolId(bytes[0]));
        }

        let command = bytes[COMMAND_INDEX] & 0x0F;
        let arg = bytes[ARGUMENT_INDEX];
        let device_id = u16::from_be_bytes([bytes[1], bytes[2]]);
        let mut updates = FieldUpdates::default();

        match command {
            // A toggle; the resulting state is not knowable from the packet
            CMD_ON_OFF => updates.status = Some(Status::On),
            CMD_BRIGHTNESS_DOWN => updates.command = Some(CommandName::BrightnessDown),
            CMD_BRIGHTNESS_UP => updates.command = Some(CommandName::BrightnessUp),
            CMD_MODE_SWITCH => updates.command = Some(CommandName::NextMode),
            CMD_COLOR_WHITE_TOGGLE => updates.command = Some(CommandName::ColorWhiteToggle),
            CMD_COLOR => updates.hue = Some(units::byte_to_hue(arg.wrapping_sub(COLOR_OFFSET))),
            _ => {
                updates.raw = Some(RawCommand {
                    button_id: command,
                    argument: arg,
                })
            }
        }

        Ok(ParsedPacket {
            bulb_id: BulbId::new(device_id, 0, RemoteType::Fut020),
            updates,
        })
    }
}
