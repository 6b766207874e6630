//! Pieces shared by the 9-byte V2 protocols (RGB+CCT, FUT089, FUT091)
//!
//! Packet layout before whitening:
//!
//! ```text
//! [key, protocol_id, id_hi, id_lo, command, argument, sequence, group, checksum]
//! ```

use crate::command::{BulbId, BulbMode, Status};
use crate::error::ParseError;
use crate::formatter::{expect_len, PacketFormatter, Session};
use crate::scale::StatusGroupArg;
use crate::state::BulbState;
use crate::v2_encoding::{self, V2_PACKET_LEN};
use crate::RemoteType;

pub const PROTOCOL_ID_INDEX: usize = 1;
pub const COMMAND_INDEX: usize = 4;
pub const ARGUMENT_INDEX: usize = 5;
pub const GROUP_INDEX: usize = 7;

/// Opcode for on/off on every V2 protocol
pub const ON_OFF: u8 = 0x01;

/// Flag on the command byte marking long presses and night mode
pub const HELD_FLAG: u8 = 0x80;

const MAX_PACKETS: usize = 8;

/// State common to every V2 formatter
#[derive(Debug, Clone)]
pub struct V2Core {
    pub remote_type: RemoteType,
    pub protocol_id: u8,
    pub status_arg: StatusGroupArg,
    pub session: Session,
    sequence: u8,
}

impl V2Core {
    pub fn new(remote_type: RemoteType, protocol_id: u8) -> Self {
        Self {
            remote_type,
            protocol_id,
            status_arg: StatusGroupArg::for_groups(remote_type.config().num_groups),
            session: Session::new(MAX_PACKETS),
            sequence: 0,
        }
    }

    pub fn initialize_packet(&mut self, packet: &mut [u8]) {
        if packet.len() < V2_PACKET_LEN {
            return;
        }
        packet[0] = 0x00;
        packet[PROTOCOL_ID_INDEX] = self.protocol_id;
        packet[2] = (self.session.device_id() >> 8) as u8;
        packet[3] = (self.session.device_id() & 0xFF) as u8;
        packet[COMMAND_INDEX] = 0;
        packet[ARGUMENT_INDEX] = 0;
        packet[6] = self.sequence;
        packet[GROUP_INDEX] = self.session.group_id();
        packet[8] = 0;
        self.sequence = self.sequence.wrapping_add(1);
    }

    pub fn can_handle(&self, bytes: &[u8]) -> bool {
        v2_encoding::decoded(bytes).is_some_and(|p| p[PROTOCOL_ID_INDEX] == self.protocol_id)
    }

    /// Decode a packet and read the addressed bulb from its header
    pub fn decode(&self, bytes: &[u8]) -> Result<(BulbId, [u8; V2_PACKET_LEN]), ParseError> {
        expect_len(bytes, V2_PACKET_LEN)?;
        let packet = v2_encoding::decoded(bytes).ok_or(ParseError::InvalidLength {
            expected: V2_PACKET_LEN,
            actual: bytes.len(),
        })?;

        if packet[PROTOCOL_ID_INDEX] != self.protocol_id {
            return Err(ParseError::UnexpectedProtocolId(packet[PROTOCOL_ID_INDEX]));
        }

        let device_id = u16::from_be_bytes([packet[2], packet[3]]);
        let bulb_id = BulbId::new(device_id, packet[GROUP_INDEX], self.remote_type);
        Ok((bulb_id, packet))
    }
}

/// Write a command/argument pair into a plain packet
pub fn write_command(packet: &mut [u8], command: u8, arg: u8, held: bool) {
    if packet.len() < V2_PACKET_LEN {
        return;
    }
    packet[COMMAND_INDEX] = if held { command | HELD_FLAG } else { command };
    packet[ARGUMENT_INDEX] = arg;
}

/// Whiten a finalized packet in place
pub fn finalize(packet: &mut [u8]) {
    if let Ok(packet) = <&mut [u8; V2_PACKET_LEN]>::try_from(packet) {
        v2_encoding::encode(packet);
    }
}

/// Issue whatever command puts the bulb back into `mode`
///
/// Restoring a mode re-issues the value it had in the snapshot: the hue for
/// color, the effect for scene.
pub fn switch_mode<F: PacketFormatter + ?Sized>(formatter: &mut F, state: &BulbState, mode: BulbMode) {
    match mode {
        BulbMode::Color => formatter.update_hue(state.hue),
        BulbMode::White => formatter.update_color_white(),
        BulbMode::Scene => formatter.update_mode(state.mode),
        BulbMode::Night => formatter.enable_night_mode(),
    }
}

/// Status argument decoded from an on/off packet
pub fn parse_status(core: &V2Core, arg: u8) -> Option<(Status, u8)> {
    core.status_arg.decode(arg)
}

/// Implements the V2 envelope parts of [`PacketFormatter`] for a type with a
/// `core: V2Core` field
macro_rules! impl_v2_envelope {
    () => {
        fn remote_type(&self) -> $crate::RemoteType {
            self.core.remote_type
        }

        fn session(&self) -> &$crate::formatter::Session {
            &self.core.session
        }

        fn session_mut(&mut self) -> &mut $crate::formatter::Session {
            &mut self.core.session
        }

        fn initialize_packet(&mut self, packet: &mut [u8]) {
            self.core.initialize_packet(packet);
        }

        fn finalize_packet(&self, packet: &mut [u8]) {
            $crate::v2::finalize(packet);
        }

        fn command(&mut self, command: u8, arg: u8) {
            if !self.push_packet() {
                return;
            }
            let held = self.session().held();
            if let Some(packet) = self.current_packet() {
                $crate::v2::write_command(packet, command, arg, held);
            }
        }

        fn can_handle(&self, bytes: &[u8]) -> bool {
            self.core.can_handle(bytes)
        }

        fn update_status(&mut self, status: $crate::Status, group_id: u8) {
            let arg = self.core.status_arg.encode(status, group_id);
            self.command($crate::v2::ON_OFF, arg);
        }

        fn enable_night_mode(&mut self) {
            let group = self.session().group_id();
            let arg = self.core.status_arg.encode($crate::Status::Off, group);
            self.command($crate::v2::ON_OFF | $crate::v2::HELD_FLAG, arg);
        }

        fn unpair(&mut self) {
            for _ in 0..$crate::formatter::PAIR_REPEATS {
                self.update_status($crate::Status::On, 0);
            }
        }
    };
}

pub(crate) use impl_v2_envelope;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_command_sets_held_flag() {
        let mut packet = [0u8; 9];
        write_command(&mut packet, 0x04, 0x20, true);
        assert_eq!(packet[COMMAND_INDEX], 0x84);
        assert_eq!(packet[ARGUMENT_INDEX], 0x20);
    }

    #[test]
    fn test_decode_checks_protocol() {
        let mut core = V2Core::new(RemoteType::Fut091, 0x21);
        let mut packet = [0u8; 9];
        core.initialize_packet(&mut packet);
        finalize(&mut packet);

        assert!(core.can_handle(&packet));
        assert!(!V2Core::new(RemoteType::RgbCct, 0x20).can_handle(&packet));
        assert_eq!(
            V2Core::new(RemoteType::RgbCct, 0x20).decode(&packet),
            Err(ParseError::UnexpectedProtocolId(0x21))
        );
    }

    #[test]
    fn test_sequence_wraps() {
        let mut core = V2Core::new(RemoteType::RgbCct, 0x20);
        core.sequence = 0xFF;
        let mut packet = [0u8; 9];
        core.initialize_packet(&mut packet);
        assert_eq!(packet[6], 0xFF);
        core.initialize_packet(&mut packet);
        assert_eq!(packet[6], 0x00);
    }
}
