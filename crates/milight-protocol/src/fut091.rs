//! Dual-white bulbs on the FUT091 remote, V2 protocol id `0x21`

use crate::command::{CommandName, FieldUpdates, ParsedPacket, RawCommand};
use crate::error::ParseError;
use crate::formatter::PacketFormatter;
use crate::scale::V2Scale;
use crate::state::StateStore;
use crate::v2::{self, impl_v2_envelope, V2Core, ARGUMENT_INDEX, COMMAND_INDEX, HELD_FLAG};
use crate::RemoteType;

pub const PROTOCOL_ID: u8 = 0x21;

pub const CMD_ON_OFF: u8 = 0x01;
pub const CMD_BRIGHTNESS: u8 = 0x02;
pub const CMD_KELVIN: u8 = 0x03;

pub const BRIGHTNESS_SCALE: V2Scale = V2Scale::new(0x97, 2, true);
pub const KELVIN_SCALE: V2Scale = V2Scale::new(0xC5, 2, false);

#[derive(Debug, Clone)]
pub struct Fut091Formatter {
    core: V2Core,
}

impl Fut091Formatter {
    pub fn new() -> Self {
        Self {
            core: V2Core::new(RemoteType::Fut091, PROTOCOL_ID),
        }
    }
}

impl Default for Fut091Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFormatter for Fut091Formatter {
    impl_v2_envelope!();

    fn update_brightness(&mut self, value: u8) {
        self.command(CMD_BRIGHTNESS, BRIGHTNESS_SCALE.encode(value));
    }

    fn update_temperature(&mut self, value: u8) {
        self.command(CMD_KELVIN, KELVIN_SCALE.encode(value));
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        let (mut bulb_id, packet) = self.core.decode(bytes)?;
        let command = packet[COMMAND_INDEX] & !HELD_FLAG;
        let arg = packet[ARGUMENT_INDEX];
        let mut updates = FieldUpdates::default();
        let raw = RawCommand {
            button_id: command,
            argument: arg,
        };

        match command {
            CMD_ON_OFF if packet[COMMAND_INDEX] & HELD_FLAG != 0 => {
                updates.command = Some(CommandName::NightMode);
            }
            CMD_ON_OFF => match v2::parse_status(&self.core, arg) {
                Some((status, group)) => {
                    updates.status = Some(status);
                    bulb_id.group_id = group;
                }
                None => updates.raw = Some(raw),
            },
            CMD_BRIGHTNESS => updates.brightness = Some(BRIGHTNESS_SCALE.decode(arg)),
            CMD_KELVIN => updates.temperature = Some(KELVIN_SCALE.decode(arg)),
            _ => updates.raw = Some(raw),
        }

        Ok(ParsedPacket { bulb_id, updates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Status;
    use crate::state::NoState;
    use proptest::prelude::*;

    fn build(f: &mut Fut091Formatter, op: impl FnOnce(&mut Fut091Formatter)) -> Vec<Vec<u8>> {
        op(f);
        let stream = f.build_packets();
        f.reset();
        stream.into_packets()
    }

    #[test]
    fn test_hue_is_not_supported() {
        let mut f = Fut091Formatter::new();
        f.prepare(0x0A0B, 1, None);
        assert!(build(&mut f, |f| {
            f.update_hue(120);
            f.update_saturation(50);
        })
        .is_empty());
    }

    #[test]
    fn test_night_mode() {
        let mut f = Fut091Formatter::new();
        f.prepare(0x0A0B, 2, None);
        let packets = build(&mut f, |f| f.enable_night_mode());
        let parsed = f.parse_packet(&packets[0], &NoState).unwrap();
        assert_eq!(parsed.updates.command, Some(CommandName::NightMode));
        assert_eq!(parsed.bulb_id.group_id, 2);
    }

    #[test]
    fn test_pair_sends_five_on_packets() {
        let mut f = Fut091Formatter::new();
        f.prepare(0x0A0B, 2, None);
        let packets = build(&mut f, |f| f.pair());
        assert_eq!(packets.len(), 5);
        for packet in &packets {
            let parsed = f.parse_packet(packet, &NoState).unwrap();
            assert_eq!(parsed.updates.status, Some(Status::On));
            assert_eq!(parsed.bulb_id.group_id, 2);
        }
    }

    proptest! {
        #[test]
        fn brightness_roundtrip(v in 0u8..=100) {
            let mut f = Fut091Formatter::new();
            f.prepare(0x0A0B, 1, None);
            let packets = build(&mut f, |f| f.update_brightness(v));
            prop_assert_eq!(f.parse_packet(&packets[0], &NoState).unwrap().updates.brightness, Some(v));
        }

        #[test]
        fn temperature_roundtrip(v in 0u8..=100) {
            let mut f = Fut091Formatter::new();
            f.prepare(0x0A0B, 1, None);
            let packets = build(&mut f, |f| f.update_temperature(v));
            prop_assert_eq!(f.parse_packet(&packets[0], &NoState).unwrap().updates.temperature, Some(v));
        }
    }
}
