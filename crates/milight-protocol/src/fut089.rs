//! RGB+CCT bulbs paired to the 8-zone FUT089 remote, V2 protocol id `0x25`
//!
//! Color temperature and saturation share opcode `0x07` with identical
//! argument ranges. Which one the bulb applies depends on its current mode,
//! so both the setters and the parser consult bulb state.

use crate::command::{BulbMode, CommandName, FieldUpdates, ParsedPacket, RawCommand};
use crate::error::ParseError;
use crate::formatter::{FormatterOptions, PacketFormatter};
use crate::state::StateStore;
use crate::units;
use crate::v2::{self, impl_v2_envelope, V2Core, ARGUMENT_INDEX, COMMAND_INDEX, HELD_FLAG};
use crate::RemoteType;

pub const PROTOCOL_ID: u8 = 0x25;

pub const CMD_ON_OFF: u8 = 0x01;
pub const CMD_COLOR: u8 = 0x02;
pub const CMD_BRIGHTNESS: u8 = 0x05;
pub const CMD_MODE: u8 = 0x06;
/// Kelvin in white mode
pub const CMD_KELVIN: u8 = 0x07;
/// Saturation in color mode
pub const CMD_SATURATION: u8 = 0x07;

pub const ARG_SPEED_UP: u8 = 0x12;
pub const ARG_SPEED_DOWN: u8 = 0x13;
pub const ARG_WHITE_MODE: u8 = 0x14;

pub const COLOR_OFFSET: u8 = 0;

#[derive(Debug, Clone)]
pub struct Fut089Formatter {
    core: V2Core,
    options: FormatterOptions,
}

impl Fut089Formatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self {
            core: V2Core::new(RemoteType::Fut089, PROTOCOL_ID),
            options,
        }
    }
}

impl PacketFormatter for Fut089Formatter {
    impl_v2_envelope!();

    fn update_brightness(&mut self, value: u8) {
        self.command(CMD_BRIGHTNESS, value.min(100));
    }

    fn update_hue(&mut self, value: u16) {
        self.update_color_raw(units::hue_to_byte(value));
    }

    fn update_color_raw(&mut self, value: u8) {
        self.command(CMD_COLOR, COLOR_OFFSET.wrapping_add(value));
    }

    fn update_color_white(&mut self) {
        self.command(CMD_ON_OFF, ARG_WHITE_MODE);
    }

    fn update_temperature(&mut self, value: u8) {
        let state = self.session().state();
        let switching = state.bulb_mode != BulbMode::White;

        if switching {
            self.update_color_white();
        }

        self.command(CMD_KELVIN, 100 - value.min(100));

        if switching && self.options.automatic_mode_switching {
            v2::switch_mode(self, &state, state.bulb_mode);
        }
    }

    fn update_saturation(&mut self, value: u8) {
        let state = self.session().state();
        let switching = state.bulb_mode != BulbMode::Color;

        if switching {
            self.update_hue(state.hue);
        }

        self.command(CMD_SATURATION, 100 - value.min(100));

        if switching && self.options.automatic_mode_switching {
            v2::switch_mode(self, &state, state.bulb_mode);
        }
    }

    fn update_mode(&mut self, mode: u8) {
        self.command(CMD_MODE, mode);
    }

    fn mode_speed_up(&mut self) {
        self.command(CMD_ON_OFF, ARG_SPEED_UP);
    }

    fn mode_speed_down(&mut self) {
        self.command(CMD_ON_OFF, ARG_SPEED_DOWN);
    }

    fn parse_packet(&self, bytes: &[u8], states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
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
            CMD_ON_OFF if arg == ARG_SPEED_UP => updates.command = Some(CommandName::ModeSpeedUp),
            CMD_ON_OFF if arg == ARG_SPEED_DOWN => {
                updates.command = Some(CommandName::ModeSpeedDown)
            }
            CMD_ON_OFF if arg == ARG_WHITE_MODE => updates.command = Some(CommandName::SetWhite),
            CMD_ON_OFF => match v2::parse_status(&self.core, arg) {
                Some((status, group)) => {
                    updates.status = Some(status);
                    bulb_id.group_id = group;
                }
                None => updates.raw = Some(raw),
            },
            CMD_COLOR => {
                updates.hue = Some(units::byte_to_hue(arg.wrapping_sub(COLOR_OFFSET)));
            }
            CMD_BRIGHTNESS => updates.brightness = Some(arg.min(100)),
            CMD_KELVIN => {
                let in_color = states
                    .get(&bulb_id)
                    .is_some_and(|s| s.bulb_mode == BulbMode::Color);
                let value = 100 - arg.min(100);
                if in_color {
                    updates.saturation = Some(value);
                } else {
                    updates.temperature = Some(value);
                }
            }
            CMD_MODE => updates.mode = Some(arg),
            _ => updates.raw = Some(raw),
        }

        Ok(ParsedPacket { bulb_id, updates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BulbId, Status};
    use crate::state::{BulbState, MemoryStateStore, NoState};
    use proptest::prelude::*;

    fn formatter(auto: bool) -> Fut089Formatter {
        Fut089Formatter::new(FormatterOptions {
            automatic_mode_switching: auto,
        })
    }

    fn build(f: &mut Fut089Formatter, op: impl FnOnce(&mut Fut089Formatter)) -> Vec<Vec<u8>> {
        op(f);
        let stream = f.build_packets();
        f.reset();
        stream.into_packets()
    }

    fn state(mode: BulbMode) -> BulbState {
        BulbState {
            bulb_mode: mode,
            hue: 90,
            kelvin: 25,
            ..BulbState::default()
        }
    }

    fn color_store(group: u8) -> MemoryStateStore {
        let mut store = MemoryStateStore::new();
        store.insert(BulbId::new(0x4242, group, RemoteType::Fut089), state(BulbMode::Color));
        store
    }

    #[test]
    fn test_temperature_from_color_switches_and_restores() {
        let mut f = formatter(true);
        f.prepare(0x4242, 6, Some(state(BulbMode::Color)));
        let packets = build(&mut f, |f| f.update_temperature(70));
        assert_eq!(packets.len(), 3);

        let parsed: Vec<_> = packets
            .iter()
            .map(|p| f.parse_packet(p, &NoState).unwrap().updates)
            .collect();
        assert_eq!(parsed[0].command, Some(CommandName::SetWhite));
        assert_eq!(parsed[1].temperature, Some(70));
        assert_eq!(parsed[2].hue, Some(90));
    }

    #[test]
    fn test_temperature_in_white_is_single_packet() {
        let mut f = formatter(true);
        f.prepare(0x4242, 6, Some(state(BulbMode::White)));
        assert_eq!(build(&mut f, |f| f.update_temperature(70)).len(), 1);

        f.prepare(0x4242, 6, None);
        assert_eq!(build(&mut f, |f| f.update_temperature(70)).len(), 1);
    }

    #[test]
    fn test_saturation_packet_counts() {
        let mut f = formatter(true);
        f.prepare(0x4242, 1, Some(state(BulbMode::White)));
        assert_eq!(build(&mut f, |f| f.update_saturation(30)).len(), 3);

        let mut f = formatter(false);
        f.prepare(0x4242, 1, Some(state(BulbMode::White)));
        assert_eq!(build(&mut f, |f| f.update_saturation(30)).len(), 2);
    }

    #[test]
    fn test_shared_opcode_parse_depends_on_state() {
        let mut f = formatter(false);
        f.prepare(0x4242, 5, Some(state(BulbMode::Color)));
        let packets = build(&mut f, |f| f.update_saturation(30));
        assert_eq!(packets.len(), 1);

        let as_color = f.parse_packet(&packets[0], &color_store(5)).unwrap();
        assert_eq!(as_color.updates.saturation, Some(30));
        assert_eq!(as_color.updates.temperature, None);

        // Unknown state falls back to white
        let as_white = f.parse_packet(&packets[0], &NoState).unwrap();
        assert_eq!(as_white.updates.temperature, Some(30));
        assert_eq!(as_white.updates.saturation, None);
    }

    #[test]
    fn test_eight_groups_off() {
        let mut f = formatter(false);
        f.prepare(0x4242, 8, None);
        let packets = build(&mut f, |f| f.update_status(Status::Off, 8));
        let parsed = f.parse_packet(&packets[0], &NoState).unwrap();
        assert_eq!(parsed.updates.status, Some(Status::Off));
        assert_eq!(parsed.bulb_id.group_id, 8);
    }

    proptest! {
        #[test]
        fn brightness_roundtrip(v in 0u8..=100) {
            let mut f = formatter(false);
            f.prepare(0x0001, 3, None);
            let packets = build(&mut f, |f| f.update_brightness(v));
            prop_assert_eq!(f.parse_packet(&packets[0], &NoState).unwrap().updates.brightness, Some(v));
        }

        #[test]
        fn temperature_roundtrip(v in 0u8..=100) {
            let mut f = formatter(false);
            f.prepare(0x0001, 3, None);
            let packets = build(&mut f, |f| f.update_temperature(v));
            prop_assert_eq!(f.parse_packet(&packets[0], &NoState).unwrap().updates.temperature, Some(v));
        }

        #[test]
        fn status_roundtrip(g in 0u8..=8, on in any::<bool>()) {
            let status = if on { Status::On } else { Status::Off };
            let mut f = formatter(false);
            f.prepare(0x0001, g, None);
            let packets = build(&mut f, |f| f.update_status(status, g));
            let parsed = f.parse_packet(&packets[0], &NoState).unwrap();
            prop_assert_eq!(parsed.updates.status, Some(status));
            prop_assert_eq!(parsed.bulb_id.group_id, g);
        }
    }
}
