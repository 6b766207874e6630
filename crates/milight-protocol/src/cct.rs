//! Dual-white CCT bulbs (FUT007 remote)
//!
//! ```text
//! [0x5A, id_hi, id_lo, group, button, sequence, checksum]
//! ```
//!
//! There are no absolute brightness or temperature commands. Both are driven
//! with relative presses across ten steps.

use crate::command::{BulbId, CommandName, FieldUpdates, ParsedPacket, RawCommand, Status};
use crate::error::ParseError;
use crate::formatter::{expect_len, step_to, PacketFormatter, Session};
use crate::state::StateStore;
use crate::RemoteType;

pub const PROTOCOL_ID_BYTE: u8 = 0x5A;
pub const PACKET_LEN: usize = 7;
pub const INTERVALS: u8 = 10;

pub const GROUP_INDEX: usize = 3;
pub const BUTTON_INDEX: usize = 4;
pub const CHECKSUM_INDEX: usize = 6;

pub const BRIGHTNESS_DOWN: u8 = 0x04;
pub const BRIGHTNESS_UP: u8 = 0x0C;
pub const TEMPERATURE_UP: u8 = 0x0E;
pub const TEMPERATURE_DOWN: u8 = 0x0F;

/// Set on an OFF button for night mode, and on any button while held
pub const NIGHT_FLAG: u8 = 0x10;

/// (on, off) buttons indexed by group, group 0 being "all"
const STATUS_BUTTONS: [(u8, u8); 5] = [
    (0x05, 0x09),
    (0x08, 0x0B),
    (0x0D, 0x03),
    (0x07, 0x0A),
    (0x02, 0x06),
];

const MAX_PACKETS: usize = 20;

pub fn status_button(status: Status, group: u8) -> Option<u8> {
    STATUS_BUTTONS.get(group as usize).map(|(on, off)| match status {
        Status::On => *on,
        Status::Off => *off,
    })
}

/// Inverse of [`status_button`]
pub fn button_status(button: u8) -> Option<(Status, u8)> {
    STATUS_BUTTONS
        .iter()
        .enumerate()
        .find_map(|(group, (on, off))| {
            if button == *on {
                Some((Status::On, group as u8))
            } else if button == *off {
                Some((Status::Off, group as u8))
            } else {
                None
            }
        })
}

#[derive(Debug, Clone)]
pub struct CctFormatter {
    session: Session,
    sequence: u8,
}

impl CctFormatter {
    pub fn new() -> Self {
        Self {
            session: Session::new(MAX_PACKETS),
            sequence: 0,
        }
    }
}

impl Default for CctFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFormatter for CctFormatter {
    fn remote_type(&self) -> RemoteType {
        RemoteType::Cct
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
            self.session.group_id(),
            0,
            self.sequence,
            0,
        ]);
        self.sequence = self.sequence.wrapping_add(1);
    }

    fn finalize_packet(&self, packet: &mut [u8]) {
        if packet.len() != PACKET_LEN {
            return;
        }
        packet[CHECKSUM_INDEX] = packet[..CHECKSUM_INDEX]
            .iter()
            .fold(PACKET_LEN as u8, |sum, b| sum.wrapping_add(*b));
    }

    fn command(&mut self, command: u8, _arg: u8) {
        if !self.push_packet() {
            return;
        }
        let command = if self.session.held() {
            command | NIGHT_FLAG
        } else {
            command
        };
        if let Some(packet) = self.current_packet() {
            packet[BUTTON_INDEX] = command;
        }
    }

    fn can_handle(&self, bytes: &[u8]) -> bool {
        bytes.len() == PACKET_LEN && bytes[0] == PROTOCOL_ID_BYTE
    }

    fn update_status(&mut self, status: Status, group_id: u8) {
        match status_button(status, group_id) {
            Some(button) => self.command(button, 0),
            None => self.unsupported("groups above 4"),
        }
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

    fn update_temperature(&mut self, value: u8) {
        let known = self.session.snapshot().map(|s| s.kelvin / INTERVALS);
        step_to(
            self,
            |f: &mut Self| f.increase_temperature(),
            |f: &mut Self| f.decrease_temperature(),
            INTERVALS,
            value / INTERVALS,
            known,
        );
    }

    fn increase_temperature(&mut self) {
        self.command(TEMPERATURE_UP, 0);
    }

    fn decrease_temperature(&mut self) {
        self.command(TEMPERATURE_DOWN, 0);
    }

    fn enable_night_mode(&mut self) {
        let group = self.session.group_id();
        match status_button(Status::Off, group) {
            Some(button) => self.command(button | NIGHT_FLAG, 0),
            None => self.unsupported("groups above 4"),
        }
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        expect_len(bytes, PACKET_LEN)?;
        if bytes[0] != PROTOCOL_ID_BYTE {
            return Err(ParseError::UnexpectedProtocolId(bytes[0]));
        }

        let button = bytes[BUTTON_INDEX] & 0x7F;
        let base = button & !NIGHT_FLAG;
        let device_id = u16::from_be_bytes([bytes[1], bytes[2]]);
        let mut bulb_id = BulbId::new(device_id, bytes[GROUP_INDEX], RemoteType::Cct);
        let mut updates = FieldUpdates::default();

        match (button & NIGHT_FLAG != 0, button_status(base)) {
            (true, Some((Status::Off, group))) => {
                updates.command = Some(CommandName::NightMode);
                bulb_id.group_id = group;
            }
            (_, Some((status, group))) => {
                updates.status = Some(status);
                bulb_id.group_id = group;
            }
            (_, None) => match base {
                BRIGHTNESS_UP => updates.command = Some(CommandName::BrightnessUp),
                BRIGHTNESS_DOWN => updates.command = Some(CommandName::BrightnessDown),
                TEMPERATURE_UP => updates.command = Some(CommandName::TemperatureUp),
                TEMPERATURE_DOWN => updates.command = Some(CommandName::TemperatureDown),
                _ => {
                    updates.raw = Some(RawCommand {
                        button_id: button,
                        argument: 0,
                    })
                }
            },
        }

        Ok(ParsedPacket { bulb_id, updates })
    }
}
