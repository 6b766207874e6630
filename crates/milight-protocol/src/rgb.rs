//! RGB-only bulbs (FUT098 remote), no groups
//!
//! ```text
//! [0xA4, id_hi, id_lo, color, button, sequence]
//! ```

use crate::command::{BulbId, CommandName, FieldUpdates, ParsedPacket, RawCommand, Status};
use crate::error::ParseError;
use crate::formatter::{expect_len, step_to, PacketFormatter, Session, PAIR_REPEATS};
use crate::state::StateStore;
use crate::units;
use crate::RemoteType;

pub const PROTOCOL_ID_BYTE: u8 = 0xA4;
pub const PACKET_LEN: usize = 6;
pub const INTERVALS: u8 = 10;

pub const COLOR_INDEX: usize = 3;
pub const BUTTON_INDEX: usize = 4;

pub const COLOR: u8 = 0x00;
pub const OFF: u8 = 0x01;
pub const ON: u8 = 0x02;
pub const BRIGHTNESS_UP: u8 = 0x03;
pub const BRIGHTNESS_DOWN: u8 = 0x04;
pub const SPEED_UP: u8 = 0x05;
pub const SPEED_DOWN: u8 = 0x06;
pub const MODE_UP: u8 = 0x07;
pub const MODE_DOWN: u8 = 0x08;
pub const PAIR: u8 = SPEED_UP;

pub const UNPAIR_FLAG: u8 = 0x10;
pub const HELD_FLAG: u8 = 0x80;

const MAX_PACKETS: usize = 20;

#[derive(Debug, Clone)]
pub struct RgbFormatter {
    session: Session,
    sequence: u8,
}

impl RgbFormatter {
    pub fn new() -> Self {
        Self {
            session: Session::new(MAX_PACKETS),
            sequence: 0,
        }
    }
}

impl Default for RgbFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFormatter for RgbFormatter {
    fn remote_type(&self) -> RemoteType {
        RemoteType::Rgb
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
        if let Some(packet) = self.current_packet() {
            packet[BUTTON_INDEX] = command;
            packet[COLOR_INDEX] = arg;
        }
    }

    fn can_handle(&self, bytes: &[u8]) -> bool {
        bytes.len() == PACKET_LEN && bytes[0] == PROTOCOL_ID_BYTE
    }

    fn update_status(&mut self, status: Status, _group_id: u8) {
        let button = match status {
            Status::On => ON,
            Status::Off => OFF,
        };
        self.command(button, 0);
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
        self.command(BRIGHTNESS_UP, 0);
    }

    fn decrease_brightness(&mut self) {
        self.command(BRIGHTNESS_DOWN, 0);
    }

    fn update_hue(&mut self, value: u16) {
        self.update_color_raw(units::hue_to_byte((value % 360 + 40) % 360));
    }

    fn update_color_raw(&mut self, value: u8) {
        self.command(COLOR, value);
    }

    fn next_mode(&mut self) {
        self.command(MODE_UP, 0);
    }

    fn previous_mode(&mut self) {
        self.command(MODE_DOWN, 0);
    }

    fn mode_speed_up(&mut self) {
        self.command(SPEED_UP, 0);
    }

    fn mode_speed_down(&mut self) {
        self.command(SPEED_DOWN, 0);
    }

    fn pair(&mut self) {
        for _ in 0..PAIR_REPEATS {
            self.command(PAIR, 0);
        }
    }

    fn unpair(&mut self) {
        for _ in 0..PAIR_REPEATS {
            self.command(PAIR | UNPAIR_FLAG, 0);
        }
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        expect_len(bytes, PACKET_LEN)?;
        if bytes[0] != PROTOCOL_ID_BYTE {
            return Err(ParseError::UnexpectedProtocolId(bytes[0]));
        }

        let button = bytes[BUTTON_INDEX] & !HELD_FLAG;
        let device_id = u16::from_be_bytes([bytes[1], bytes[2]]);
        let mut updates = FieldUpdates::default();

        match button {
            ON => updates.status = Some(Status::On),
            OFF => updates.status = Some(Status::Off),
            COLOR => {
                updates.hue = Some((units::byte_to_hue(bytes[COLOR_INDEX]) + 320) % 360);
            }
            BRIGHTNESS_UP => updates.command = Some(CommandName::BrightnessUp),
            BRIGHTNESS_DOWN => updates.command = Some(CommandName::BrightnessDown),
            MODE_UP => updates.command = Some(CommandName::NextMode),
            MODE_DOWN => updates.command = Some(CommandName::PreviousMode),
            SPEED_UP => updates.command = Some(CommandName::ModeSpeedUp),
            SPEED_DOWN => updates.command = Some(CommandName::ModeSpeedDown),
            _ => {
                updates.raw = Some(RawCommand {
                    button_id: button,
                    argument: bytes[COLOR_INDEX],
                })
            }
        }

        Ok(ParsedPacket {
            bulb_id: BulbId::new(device_id, 0, RemoteType::Rgb),
            updates,
        })
    }
}
