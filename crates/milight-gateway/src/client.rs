//! Gateway client
//!
//! Glues the formatter registry to the packet sender. Every setter runs one
//! full formatter cycle and queues the resulting packets, so a single call may
//! queue up to three packets when a mode switch is needed.

use milight_protocol::{
    BulbId, BulbState, CommandName, FieldUpdates, Formatters, PacketFormatter, ParsedPacket, RemoteConfig,
    RemoteType, StateStore, Status,
};
use tracing::{debug, info, trace};

use crate::error::GatewayError;
use crate::radio::RadioFactory;
use crate::sender::PacketSender;
use crate::settings::GatewaySettings;
use crate::switchboard::RadioSwitchboard;

/// Largest packet any remote uses
const MAX_PACKET_LEN: usize = 9;

#[derive(Debug, Clone, Copy)]
struct Target {
    remote: &'static RemoteConfig,
    device_id: u16,
    group_id: u8,
    snapshot: Option<BulbState>,
}

pub struct MiLightClient {
    formatters: Formatters,
    sender: PacketSender,
    target: Option<Target>,
    held: bool,
    repeats_override: Option<usize>,
}

impl MiLightClient {
    /// Build the radios and sender described by `settings`
    pub fn new(settings: &GatewaySettings, factory: &dyn RadioFactory) -> Result<Self, GatewayError> {
        settings.validate()?;
        let switchboard = RadioSwitchboard::new(factory, settings.radio_configs());
        let sender = PacketSender::new(switchboard, settings.sender.clone());
        info!(
            "MiLight client ready for {} remote types",
            settings.remotes.len()
        );
        Ok(Self::with_sender(Formatters::new(settings.formatter), sender))
    }

    pub fn with_sender(formatters: Formatters, sender: PacketSender) -> Self {
        Self {
            formatters,
            sender,
            target: None,
            held: false,
            repeats_override: None,
        }
    }

    /// Address subsequent commands to one bulb group
    pub fn prepare(
        &mut self,
        remote_type: RemoteType,
        device_id: u16,
        group_id: u8,
        snapshot: Option<BulbState>,
    ) {
        debug!("Prepared {}/0x{:04X}/{}", remote_type, device_id, group_id);
        self.target = Some(Target {
            remote: remote_type.config(),
            device_id,
            group_id,
            snapshot,
        });
    }

    /// Like [`MiLightClient::prepare`], looking the snapshot up in `states`
    pub fn prepare_from(
        &mut self,
        remote_type: RemoteType,
        device_id: u16,
        group_id: u8,
        states: &dyn StateStore,
    ) {
        let id = BulbId::new(device_id, group_id, remote_type);
        self.prepare(remote_type, device_id, group_id, states.get(&id));
    }

    pub fn current_remote(&self) -> Option<&'static RemoteConfig> {
        self.target.map(|t| t.remote)
    }

    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    /// Override the configured repeat count for everything queued from now on
    pub fn set_repeats_override(&mut self, repeats: usize) {
        self.repeats_override = Some(repeats);
    }

    pub fn clear_repeats_override(&mut self) {
        self.repeats_override = None;
    }

    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    pub fn sender(&self) -> &PacketSender {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut PacketSender {
        &mut self.sender
    }

    pub fn is_sending(&self) -> bool {
        self.sender.is_sending()
    }

    pub fn tick(&mut self) {
        self.sender.tick();
    }

    pub fn flush(&mut self) {
        self.sender.flush();
    }

    /// Run one formatter cycle and queue its packets
    fn flush_with(&mut self, op: impl FnOnce(&mut dyn PacketFormatter)) -> Result<usize, GatewayError> {
        let target = self.target.ok_or(GatewayError::NotPrepared)?;
        let formatter = self.formatters.get_mut(target.remote.remote_type);

        formatter.prepare(target.device_id, target.group_id, target.snapshot);
        formatter.set_held(self.held);
        op(&mut *formatter);
        let stream = formatter.build_packets();
        formatter.reset();

        let queued = stream.len();
        for packet in stream {
            self.sender.enqueue(packet, target.remote, self.repeats_override);
        }
        trace!("Queued {} {} packets", queued, target.remote.remote_type);
        Ok(queued)
    }

    /// Status for the prepared group
    pub fn update_status(&mut self, status: Status) -> Result<usize, GatewayError> {
        let group = self.target.ok_or(GatewayError::NotPrepared)?.group_id;
        self.update_group_status(status, group)
    }

    pub fn update_group_status(&mut self, status: Status, group_id: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_status(status, group_id))
    }

    /// Flip the status recorded in the snapshot; unknown counts as off
    pub fn toggle_status(&mut self) -> Result<usize, GatewayError> {
        let target = self.target.ok_or(GatewayError::NotPrepared)?;
        let status = target
            .snapshot
            .and_then(|s| s.status)
            .map_or(Status::On, |s| s.toggled());
        self.update_status(status)
    }

    pub fn update_brightness(&mut self, value: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_brightness(value.min(100)))
    }

    pub fn increase_brightness(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.increase_brightness())
    }

    pub fn decrease_brightness(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.decrease_brightness())
    }

    pub fn update_hue(&mut self, hue: u16) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_hue(hue % 360))
    }

    pub fn update_color_raw(&mut self, value: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_color_raw(value))
    }

    pub fn update_color_white(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_color_white())
    }

    pub fn update_saturation(&mut self, value: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_saturation(value.min(100)))
    }

    pub fn update_temperature(&mut self, value: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_temperature(value.min(100)))
    }

    pub fn increase_temperature(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.increase_temperature())
    }

    pub fn decrease_temperature(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.decrease_temperature())
    }

    pub fn update_mode(&mut self, mode: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.update_mode(mode))
    }

    pub fn next_mode(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.next_mode())
    }

    pub fn previous_mode(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.previous_mode())
    }

    pub fn mode_speed_up(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.mode_speed_up())
    }

    pub fn mode_speed_down(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.mode_speed_down())
    }

    pub fn enable_night_mode(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.enable_night_mode())
    }

    pub fn pair(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.pair())
    }

    pub fn unpair(&mut self) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.unpair())
    }

    /// Send a raw button and argument
    pub fn command(&mut self, button_id: u8, argument: u8) -> Result<usize, GatewayError> {
        self.flush_with(|f| f.command(button_id, argument))
    }

    pub fn handle_command(&mut self, command: CommandName) -> Result<usize, GatewayError> {
        match command {
            CommandName::Pair => self.pair(),
            CommandName::Unpair => self.unpair(),
            CommandName::SetWhite | CommandName::ColorWhiteToggle => self.update_color_white(),
            CommandName::NightMode => self.enable_night_mode(),
            CommandName::BrightnessUp => self.increase_brightness(),
            CommandName::BrightnessDown => self.decrease_brightness(),
            CommandName::TemperatureUp => self.increase_temperature(),
            CommandName::TemperatureDown => self.decrease_temperature(),
            CommandName::NextMode => self.next_mode(),
            CommandName::PreviousMode => self.previous_mode(),
            CommandName::ModeSpeedUp => self.mode_speed_up(),
            CommandName::ModeSpeedDown => self.mode_speed_down(),
            CommandName::Toggle => self.toggle_status(),
        }
    }

    /// Apply every field present in `updates`
    ///
    /// The bulb is turned on before anything else and off after everything
    /// else, so settings sent alongside an off still reach the bulb.
    pub fn update(&mut self, updates: &FieldUpdates) -> Result<usize, GatewayError> {
        if self.target.is_none() {
            return Err(GatewayError::NotPrepared);
        }

        let mut queued = 0;
        if updates.status == Some(Status::On) {
            queued += self.update_status(Status::On)?;
        }
        if let Some(hue) = updates.hue {
            let sent = self.update_hue(hue)?;
            self.note_sent(sent, FieldUpdates::default().with_hue(hue % 360));
            queued += sent;
        }
        if let Some(saturation) = updates.saturation {
            let sent = self.update_saturation(saturation)?;
            self.note_sent(sent, FieldUpdates::default().with_saturation(saturation.min(100)));
            queued += sent;
        }
        if let Some(temperature) = updates.temperature {
            let sent = self.update_temperature(temperature)?;
            self.note_sent(sent, FieldUpdates::default().with_temperature(temperature.min(100)));
            queued += sent;
        }
        if let Some(mode) = updates.mode {
            let sent = self.update_mode(mode)?;
            self.note_sent(sent, FieldUpdates::default().with_mode(mode));
            queued += sent;
        }
        if let Some(brightness) = updates.brightness {
            queued += self.update_brightness(brightness)?;
        }
        if let Some(command) = updates.command {
            queued += self.handle_command(command)?;
        }
        if let Some(raw) = updates.raw {
            queued += self.command(raw.button_id, raw.argument)?;
        }
        if updates.status == Some(Status::Off) {
            queued += self.update_status(Status::Off)?;
        }
        Ok(queued)
    }

    /// Fold a field that went out into the snapshot so later fields in the
    /// same update see the bulb's new mode
    fn note_sent(&mut self, sent: usize, applied: FieldUpdates) {
        if sent == 0 {
            return;
        }
        if let Some(target) = self.target.as_mut() {
            target
                .snapshot
                .get_or_insert_with(BulbState::default)
                .apply_updates(&applied);
        }
    }

    /// Poll one radio for a received packet
    ///
    /// Only listens while nothing is being sent. Frames no remote on that radio
    /// recognizes are ignored.
    pub fn receive(
        &mut self,
        radio_index: usize,
        states: &dyn StateStore,
    ) -> Result<Option<ParsedPacket>, GatewayError> {
        if self.sender.is_sending() {
            return Ok(None);
        }

        let switchboard = self.sender.switchboard_mut();
        switchboard.switch_radio(radio_index)?;
        if !switchboard.available() {
            return Ok(None);
        }

        let mut buf = [0u8; MAX_PACKET_LEN];
        let len = switchboard.read(&mut buf)?;
        if len == 0 {
            return Ok(None);
        }

        match self.formatters.parse_for_radio(radio_index, &buf[..len], states) {
            Ok(parsed) => {
                debug!("Received {}", parsed.bulb_id);
                Ok(Some(parsed))
            }
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingFactory, RecordingLog};
    use milight_protocol::{BulbMode, NoState};

    fn client(log: &RecordingLog) -> MiLightClient {
        let factory = RecordingFactory::new(log.clone());
        MiLightClient::new(&GatewaySettings::default(), &factory).unwrap()
    }

    #[test]
    fn test_setters_require_prepare() {
        let mut client = client(&RecordingLog::default());
        assert!(matches!(client.update_brightness(10), Err(GatewayError::NotPrepared)));
        assert!(matches!(
            client.update(&FieldUpdates::default().with_status(Status::On)),
            Err(GatewayError::NotPrepared)
        ));
    }

    #[test]
    fn test_update_orders_on_first_and_off_last() {
        let log = RecordingLog::default();
        let mut client = client(&log);
        client.prepare(RemoteType::Fut091, 0x0102, 1, None);
        client.set_repeats_override(1);

        let updates = FieldUpdates::default()
            .with_status(Status::On)
            .with_brightness(40)
            .with_temperature(20);
        assert_eq!(client.update(&updates).unwrap(), 3);
        client.flush();

        let parsed: Vec<ParsedPacket> = log
            .writes()
            .iter()
            .map(|(_, p)| client.formatters().parse(p, &NoState).unwrap())
            .collect();
        assert_eq!(parsed[0].updates.status, Some(Status::On));
        assert_eq!(parsed[1].updates.temperature, Some(20));
        assert_eq!(parsed[2].updates.brightness, Some(40));
    }

    #[test]
    fn test_mode_switch_counts() {
        let mut client = client(&RecordingLog::default());
        let white = BulbState {
            bulb_mode: BulbMode::White,
            kelvin: 30,
            ..BulbState::default()
        };
        client.prepare(RemoteType::RgbCct, 0x0102, 1, Some(white));
        assert_eq!(client.update_saturation(50).unwrap(), 2);
        assert_eq!(client.update_temperature(50).unwrap(), 1);
    }

    #[test]
    fn test_toggle_command_flips_snapshot_status() {
        let log = RecordingLog::default();
        let mut client = client(&log);
        let on = BulbState {
            status: Some(Status::On),
            ..BulbState::default()
        };
        client.prepare(RemoteType::RgbCct, 0x0102, 1, Some(on));
        client.set_repeats_override(1);

        let updates = FieldUpdates::default().with_command(CommandName::Toggle);
        assert_eq!(client.update(&updates).unwrap(), 1);
        client.flush();

        let writes = log.writes();
        let parsed = client.formatters().parse(&writes[0].1, &NoState).unwrap();
        assert_eq!(parsed.updates.status, Some(Status::Off));
        assert_eq!("toggle".parse::<CommandName>().unwrap(), CommandName::Toggle);
    }

    #[test]
    fn test_update_saturation_follows_hue_sent_in_same_update() {
        let log = RecordingLog::default();
        let mut client = client(&log);
        let white = BulbState {
            bulb_mode: BulbMode::White,
            hue: 10,
            ..BulbState::default()
        };
        client.prepare(RemoteType::RgbCct, 0x0102, 1, Some(white));
        client.set_repeats_override(1);

        let updates = FieldUpdates::default().with_hue(200).with_saturation(50);
        assert_eq!(client.update(&updates).unwrap(), 2);
        client.flush();

        let parsed: Vec<ParsedPacket> = log
            .writes()
            .iter()
            .map(|(_, p)| client.formatters().parse(p, &NoState).unwrap())
            .collect();
        assert_eq!(parsed[0].updates.hue, Some(200));
        assert_eq!(parsed[1].updates.saturation, Some(50));
    }

    #[test]
    fn test_mode_cycling_from_large_mode_does_not_panic() {
        let mut client = client(&RecordingLog::default());
        client.prepare(RemoteType::RgbCct, 0x0102, 1, None);
        let updates = FieldUpdates::default()
            .with_mode(255)
            .with_command(CommandName::NextMode);
        assert_eq!(client.update(&updates).unwrap(), 2);
    }

    #[test]
    fn test_receive_parses_frame_when_idle() {
        let log = RecordingLog::default();
        let mut client = client(&log);

        let formatters = Formatters::default();
        let mut rgbw = milight_protocol::create_formatter(RemoteType::Rgbw, Default::default());
        rgbw.prepare(0xBEEF, 2, None);
        rgbw.update_status(Status::On, 2);
        let frame = rgbw.build_packets().into_packets().remove(0);
        assert_eq!(formatters.identify(&frame), Some(RemoteType::Rgbw));

        log.inject(0, &frame);
        client.prepare(RemoteType::Rgbw, 0xBEEF, 2, None);
        client.update_status(Status::Off).unwrap();
        assert!(client.receive(0, &NoState).unwrap().is_none());

        client.flush();
        let parsed = client.receive(0, &NoState).unwrap().unwrap();
        assert_eq!(parsed.bulb_id.device_id, 0xBEEF);
        assert_eq!(parsed.updates.status, Some(Status::On));
    }

    #[test]
    fn test_receive_ignores_noise() {
        let log = RecordingLog::default();
        let mut client = client(&log);
        log.inject(3, &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert!(client.receive(3, &NoState).unwrap().is_none());
        assert!(client.receive(3, &NoState).unwrap().is_none());
    }
}
