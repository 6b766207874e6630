//! RGB+CCT bulbs (FUT092 remote), V2 protocol id `0x20`
//!
//! Brightness and saturation share opcode `0x04` and are told apart by
//! argument range. Saturation only applies in color mode, so setting it from
//! any other mode first switches to color by re-issuing the current hue.

use crate::command::{BulbMode, CommandName, FieldUpdates, ParsedPacket, RawCommand};
use crate::error::ParseError;
use crate::formatter::{FormatterOptions, PacketFormatter};
use crate::scale::V2Scale;
use crate::state::StateStore;
use crate::units;
use crate::v2::{self, impl_v2_envelope, V2Core, ARGUMENT_INDEX, COMMAND_INDEX, HELD_FLAG};
use crate::RemoteType;

pub const PROTOCOL_ID: u8 = 0x20;
pub const NUM_MODES: u8 = 9;

pub const CMD_ON_OFF: u8 = 0x01;
pub const CMD_COLOR: u8 = 0x02;
pub const CMD_KELVIN: u8 = 0x03;
pub const CMD_BRIGHTNESS: u8 = 0x04;
pub const CMD_SATURATION: u8 = 0x04;
pub const CMD_MODE: u8 = 0x05;

pub const ARG_SPEED_UP: u8 = 0x0A;
pub const ARG_SPEED_DOWN: u8 = 0x0B;

pub const COLOR_OFFSET: u8 = 0x5F;
pub const BRIGHTNESS_OFFSET: u8 = 0x8F;
pub const SATURATION_OFFSET: u8 = 0x0D;

/// Arguments at or above this on opcode `0x04` are brightness
const BRIGHTNESS_THRESHOLD: u8 = BRIGHTNESS_OFFSET - 15;

/// `[0x94, 0x92, ..., 0x00, ..., 0xCE, 0xCC]`, coolest to warmest
pub const KELVIN_SCALE: V2Scale = V2Scale::new(0xCC, 2, true);

#[derive(Debug, Clone)]
pub struct RgbCctFormatter {
    core: V2Core,
    options: FormatterOptions,
    last_mode: u8,
}

impl RgbCctFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self {
            core: V2Core::new(RemoteType::RgbCct, PROTOCOL_ID),
            options,
            last_mode: 0,
        }
    }
}

impl PacketFormatter for RgbCctFormatter {
    impl_v2_envelope!();

    fn update_brightness(&mut self, value: u8) {
        self.command(CMD_BRIGHTNESS, BRIGHTNESS_OFFSET + value.min(100));
    }

    fn update_hue(&mut self, value: u16) {
        self.update_color_raw(units::hue_to_byte(value));
    }

    fn update_color_raw(&mut self, value: u8) {
        self.command(CMD_COLOR, COLOR_OFFSET.wrapping_add(value));
    }

    /// There is no white command; re-sending the known temperature drives the
    /// bulb to white.
    fn update_color_white(&mut self) {
        let kelvin = self.session().state().kelvin;
        self.command(CMD_KELVIN, KELVIN_SCALE.encode(kelvin));
    }

    fn update_temperature(&mut self, value: u8) {
        let state = self.session().state();

        // The kelvin opcode itself switches the bulb to white
        self.command(CMD_KELVIN, KELVIN_SCALE.encode(value));

        if self.options.automatic_mode_switching && state.bulb_mode != BulbMode::White {
            v2::switch_mode(self, &state, state.bulb_mode);
        }
    }

    fn update_saturation(&mut self, value: u8) {
        let state = self.session().state();
        let switching = state.bulb_mode != BulbMode::Color;

        if switching {
            self.update_hue(state.hue);
        }

        self.command(CMD_SATURATION, SATURATION_OFFSET + value.min(100));

        if switching && self.options.automatic_mode_switching {
            v2::switch_mode(self, &state, state.bulb_mode);
        }
    }

    fn update_mode(&mut self, mode: u8) {
        self.last_mode = mode;
        self.command(CMD_MODE, mode);
    }

    fn next_mode(&mut self) {
        self.update_mode((self.last_mode % NUM_MODES + 1) % NUM_MODES);
    }

    fn previous_mode(&mut self) {
        self.update_mode((self.last_mode % NUM_MODES + NUM_MODES - 1) % NUM_MODES);
    }

    fn mode_speed_up(&mut self) {
        self.command(CMD_ON_OFF, ARG_SPEED_UP);
    }

    fn mode_speed_down(&mut self) {
        self.command(CMD_ON_OFF, ARG_SPEED_DOWN);
    }

    fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
        let (mut bulb_id, packet) = self.core.decode(bytes)?;
        let command = packet[COMMAND_INDEX] & !HELD_FLAG;
        let arg = packet[ARGUMENT_INDEX];
        let mut updates = FieldUpdates::default();

        match command {
            CMD_ON_OFF if packet[COMMAND_INDEX] & HELD_FLAG != 0 => {
                updates.command = Some(CommandName::NightMode);
            }
            CMD_ON_OFF if arg == ARG_SPEED_UP => updates.command = Some(CommandName::ModeSpeedUp),
            CMD_ON_OFF if arg == ARG_SPEED_DOWN => {
                updates.command = Some(CommandName::ModeSpeedDown)
            }
            CMD_ON_OFF => match v2::parse_status(&self.core, arg) {
                // The group byte is unreliable for on/off, the argument is not
                Some((status, group)) => {
                    updates.status = Some(status);
                    bulb_id.group_id = group;
                }
                None => {
                    updates.raw = Some(RawCommand {
                        button_id: command,
                        argument: arg,
                    })
                }
            },
            CMD_COLOR => {
                updates.hue = Some(units::byte_to_hue(arg.wrapping_sub(COLOR_OFFSET)));
            }
            CMD_KELVIN => updates.temperature = Some(KELVIN_SCALE.decode(arg)),
            CMD_BRIGHTNESS if arg >= BRIGHTNESS_THRESHOLD => {
                updates.brightness = Some(arg.saturating_sub(BRIGHTNESS_OFFSET).min(100));
            }
            CMD_SATURATION => {
                updates.saturation = Some(arg.saturating_sub(SATURATION_OFFSET).min(100));
            }
            CMD_MODE => updates.mode = Some(arg),
            _ => {
                updates.raw = Some(RawCommand {
                    button_id: command,
                    argument: arg,
                })
            }
        }

        Ok(ParsedPacket { bulb_id, updates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Status;
    use crate::state::{BulbState, NoState};
    use crate::v2_encoding;
    use proptest::prelude::*;

    fn formatter(auto: bool) -> RgbCctFormatter {
        RgbCctFormatter::new(FormatterOptions {
            automatic_mode_switching: auto,
        })
    }

    fn build(f: &mut RgbCctFormatter, op: impl FnOnce(&mut RgbCctFormatter)) -> Vec<Vec<u8>> {
        op(f);
        let stream = f.build_packets();
        f.reset();
        stream.into_packets()
    }

    fn parse_one(f: &RgbCctFormatter, packet: &[u8]) -> ParsedPacket {
        f.parse_packet(packet, &NoState).unwrap()
    }

    fn plain(packet: &[u8]) -> [u8; 9] {
        v2_encoding::decoded(packet).unwrap()
    }

    fn state(mode: BulbMode) -> BulbState {
        BulbState {
            bulb_mode: mode,
            hue: 200,
            kelvin: 40,
            mode: 3,
            ..BulbState::default()
        }
    }

    #[test]
    fn test_brightness_packet_layout() {
        let mut f = formatter(false);
        f.prepare(0x1234, 2, None);
        let packets = build(&mut f, |f| f.update_brightness(75));

        assert_eq!(packets.len(), 1);
        let p = plain(&packets[0]);
        assert_eq!(p[0], 0x00);
        assert_eq!(p[1], PROTOCOL_ID);
        assert_eq!(&p[2..4], &[0x12, 0x34]);
        assert_eq!(p[COMMAND_INDEX], CMD_BRIGHTNESS);
        assert_eq!(p[ARGUMENT_INDEX], 0x8F + 75);
        assert_eq!(p[7], 2);
    }

    #[test]
    fn test_status_parse_takes_group_from_argument() {
        let mut f = formatter(false);
        f.prepare(0x1234, 1, None);
        let packets = build(&mut f, |f| f.update_status(Status::Off, 3));
        let parsed = parse_one(&f, &packets[0]);

        assert_eq!(parsed.updates.status, Some(Status::Off));
        assert_eq!(parsed.bulb_id.group_id, 3);
    }

    #[test]
    fn test_saturation_from_white_with_restore() {
        let mut f = formatter(true);
        f.prepare(0x1234, 1, Some(state(BulbMode::White)));
        let packets = build(&mut f, |f| f.update_saturation(60));

        assert_eq!(packets.len(), 3);
        assert_eq!(parse_one(&f, &packets[0]).updates.hue, Some(200));
        assert_eq!(parse_one(&f, &packets[1]).updates.saturation, Some(60));
        assert_eq!(parse_one(&f, &packets[2]).updates.temperature, Some(40));
    }

    #[test]
    fn test_saturation_from_white_without_restore() {
        let mut f = formatter(false);
        f.prepare(0x1234, 1, Some(state(BulbMode::White)));
        assert_eq!(build(&mut f, |f| f.update_saturation(60)).len(), 2);
    }

    #[test]
    fn test_saturation_in_color_is_single_packet() {
        let mut f = formatter(true);
        f.prepare(0x1234, 1, Some(state(BulbMode::Color)));
        assert_eq!(build(&mut f, |f| f.update_saturation(60)).len(), 1);
    }

    #[test]
    fn test_temperature_from_scene_restores_mode() {
        let mut f = formatter(true);
        f.prepare(0x1234, 1, Some(state(BulbMode::Scene)));
        let packets = build(&mut f, |f| f.update_temperature(10));

        assert_eq!(packets.len(), 2);
        assert_eq!(parse_one(&f, &packets[0]).updates.temperature, Some(10));
        assert_eq!(parse_one(&f, &packets[1]).updates.mode, Some(3));
    }

    #[test]
    fn test_night_mode_and_speed() {
        let mut f = formatter(false);
        f.prepare(0x1234, 1, None);
        let packets = build(&mut f, |f| {
            f.enable_night_mode();
            f.mode_speed_up();
            f.mode_speed_down();
        });

        let commands: Vec<_> = packets.iter().map(|p| parse_one(&f, p).updates.command).collect();
        assert_eq!(
            commands,
            vec![
                Some(CommandName::NightMode),
                Some(CommandName::ModeSpeedUp),
                Some(CommandName::ModeSpeedDown)
            ]
        );
    }

    #[test]
    fn test_mode_cycling_wraps() {
        let mut f = formatter(false);
        f.prepare(0x1234, 1, None);
        let packets = build(&mut f, |f| {
            f.previous_mode();
            f.next_mode();
            f.next_mode();
        });
        let modes: Vec<_> = packets.iter().map(|p| parse_one(&f, p).updates.mode).collect();
        assert_eq!(modes, vec![Some(8), Some(0), Some(1)]);
    }

    #[test]
    fn test_mode_cycling_from_out_of_range_mode() {
        let mut f = formatter(false);
        f.prepare(0x1234, 1, None);
        let packets = build(&mut f, |f| {
            f.update_mode(255);
            f.next_mode();
            f.update_mode(250);
            f.previous_mode();
        });
        let modes: Vec<_> = packets.iter().map(|p| parse_one(&f, p).updates.mode).collect();
        assert_eq!(modes, vec![Some(255), Some(4), Some(250), Some(6)]);
    }

    #[test]
    fn test_unpair_targets_group_zero() {
        let mut f = formatter(false);
        f.prepare(0x1234, 3, None);
        let packets = build(&mut f, |f| f.unpair());

        assert_eq!(packets.len(), 5);
        for packet in &packets {
            let parsed = parse_one(&f, packet);
            assert_eq!(parsed.updates.status, Some(Status::On));
            assert_eq!(parsed.bulb_id.group_id, 0);
        }
    }

    proptest! {
        #[test]
        fn brightness_roundtrip(v in 0u8..=100) {
            let mut f = formatter(false);
            f.prepare(0xBEEF, 1, None);
            let packets = build(&mut f, |f| f.update_brightness(v));
            prop_assert_eq!(parse_one(&f, &packets[0]).updates.brightness, Some(v));
        }

        #[test]
        fn temperature_roundtrip(v in 0u8..=100) {
            let mut f = formatter(false);
            f.prepare(0xBEEF, 1, None);
            let packets = build(&mut f, |f| f.update_temperature(v));
            prop_assert_eq!(parse_one(&f, &packets[0]).updates.temperature, Some(v));
        }

        #[test]
        fn saturation_roundtrip(v in 0u8..=100) {
            let mut f = formatter(false);
            f.prepare(0xBEEF, 1, Some(state(BulbMode::Color)));
            let packets = build(&mut f, |f| f.update_saturation(v));
            prop_assert_eq!(parse_one(&f, &packets[0]).updates.saturation, Some(v));
        }

        #[test]
        fn hue_roundtrip_within_a_degree(h in 0u16..360) {
            let mut f = formatter(false);
            f.prepare(0xBEEF, 1, None);
            let packets = build(&mut f, |f| f.update_hue(h));
            let parsed = parse_one(&f, &packets[0]).updates.hue.unwrap();
            let diff = (parsed as i32 - h as i32).rem_euclid(360);
            prop_assert!(diff <= 1 || diff >= 359, "{} -> {}", h, parsed);
        }
    }
}
