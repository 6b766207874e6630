//! Shared formatter contract and session handling
//!
//! A formatter is driven through a `prepare -> setters -> build_packets ->
//! reset` cycle. Every setter that maps to a wire command starts a fresh packet
//! in the session; `build_packets` finalizes them all into a [`PacketStream`].

use tracing::{debug, warn};

use crate::command::{BulbId, ParsedPacket, Status};
use crate::error::ParseError;
use crate::remote::RemoteConfig;
use crate::state::{BulbState, StateStore};
use crate::RemoteType;

/// Number of presses sent for pairing and unpairing
pub const PAIR_REPEATS: usize = 5;

/// Options shared by every formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormatterOptions {
    /// Return the bulb to its original mode after a mode-dependent command
    pub automatic_mode_switching: bool,
}

/// Finalized packets produced by one build, in transmission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketStream {
    packets: Vec<Vec<u8>>,
}

impl PacketStream {
    pub fn new(packets: Vec<Vec<u8>>) -> Self {
        Self { packets }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<u8>> {
        self.packets.iter()
    }

    pub fn into_packets(self) -> Vec<Vec<u8>> {
        self.packets
    }
}

impl IntoIterator for PacketStream {
    type Item = Vec<u8>;
    type IntoIter = std::vec::IntoIter<Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.into_iter()
    }
}

impl<'a> IntoIterator for &'a PacketStream {
    type Item = &'a Vec<u8>;
    type IntoIter = std::slice::Iter<'a, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

/// Per-formatter state for one prepare/build cycle
#[derive(Debug, Clone)]
pub struct Session {
    device_id: u16,
    group_id: u8,
    held: bool,
    snapshot: Option<BulbState>,
    prepared: bool,
    packets: Vec<Vec<u8>>,
    max_packets: usize,
}

impl Session {
    pub fn new(max_packets: usize) -> Self {
        Self {
            device_id: 0,
            group_id: 0,
            held: false,
            snapshot: None,
            prepared: false,
            packets: Vec::with_capacity(max_packets),
            max_packets,
        }
    }

    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    pub fn group_id(&self) -> u8 {
        self.group_id
    }

    pub fn held(&self) -> bool {
        self.held
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// The snapshot captured at prepare time, if any
    pub fn snapshot(&self) -> Option<&BulbState> {
        self.snapshot.as_ref()
    }

    /// The captured snapshot, or the default state when none was available
    pub fn state(&self) -> BulbState {
        self.snapshot.unwrap_or_default()
    }

    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    pub fn max_packets(&self) -> usize {
        self.max_packets
    }

    fn begin(&mut self, device_id: u16, group_id: u8, snapshot: Option<BulbState>) {
        self.clear();
        self.device_id = device_id;
        self.group_id = group_id;
        self.snapshot = snapshot;
        self.prepared = true;
    }

    fn clear(&mut self) {
        self.device_id = 0;
        self.group_id = 0;
        self.held = false;
        self.snapshot = None;
        self.prepared = false;
        self.packets.clear();
    }
}

/// Per-protocol packet codec
pub trait PacketFormatter {
    fn remote_type(&self) -> RemoteType;

    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    /// Fill a zeroed buffer with this protocol's blank packet for the
    /// current target
    fn initialize_packet(&mut self, packet: &mut [u8]);

    /// Fill in checksums or whitening before transmission
    fn finalize_packet(&self, _packet: &mut [u8]) {}

    /// Start a new packet carrying a raw command/argument pair
    fn command(&mut self, command: u8, arg: u8);

    /// Whether `bytes` is a packet of this protocol
    fn can_handle(&self, bytes: &[u8]) -> bool;

    /// Decode a raw packet into a bulb id and field updates
    fn parse_packet(&self, bytes: &[u8], states: &dyn StateStore) -> Result<ParsedPacket, ParseError>;

    fn config(&self) -> &'static RemoteConfig {
        self.remote_type().config()
    }

    fn packet_len(&self) -> usize {
        self.config().packet_len
    }

    fn prepare(&mut self, device_id: u16, group_id: u8, snapshot: Option<BulbState>) {
        self.session_mut().begin(device_id, group_id, snapshot);
    }

    fn reset(&mut self) {
        self.session_mut().clear();
    }

    /// Mark subsequent commands as long presses
    fn set_held(&mut self, held: bool) {
        self.session_mut().held = held;
    }

    /// Append a freshly initialized packet; `false` if the session is full
    fn push_packet(&mut self) -> bool {
        let session = self.session();
        if session.packets.len() >= session.max_packets {
            warn!(
                "{}: packet limit of {} reached, dropping command",
                self.remote_type(),
                session.max_packets
            );
            return false;
        }

        let mut packet = vec![0u8; self.packet_len()];
        self.initialize_packet(&mut packet);
        self.session_mut().packets.push(packet);
        true
    }

    /// The packet most recently started
    fn current_packet(&mut self) -> Option<&mut Vec<u8>> {
        self.session_mut().packets.last_mut()
    }

    /// Finalize everything accumulated since `prepare`
    fn build_packets(&mut self) -> PacketStream {
        let mut packets = std::mem::take(&mut self.session_mut().packets);
        for packet in packets.iter_mut() {
            self.finalize_packet(packet);
        }
        PacketStream::new(packets)
    }

    fn bulb_id(&self) -> BulbId {
        let session = self.session();
        BulbId::new(session.device_id, session.group_id, self.remote_type())
    }

    fn unsupported(&self, operation: &str) {
        debug!("{} does not support {}", self.remote_type(), operation);
    }

    fn update_status(&mut self, _status: Status, _group_id: u8) {
        self.unsupported("update_status");
    }

    fn update_brightness(&mut self, _value: u8) {
        self.unsupported("update_brightness");
    }

    fn increase_brightness(&mut self) {
        self.unsupported("increase_brightness");
    }

    fn decrease_brightness(&mut self) {
        self.unsupported("decrease_brightness");
    }

    fn update_hue(&mut self, _value: u16) {
        self.unsupported("update_hue");
    }

    fn update_color_raw(&mut self, _value: u8) {
        self.unsupported("update_color_raw");
    }

    fn update_color_white(&mut self) {
        self.unsupported("update_color_white");
    }

    fn update_saturation(&mut self, _value: u8) {
        self.unsupported("update_saturation");
    }

    fn update_temperature(&mut self, _value: u8) {
        self.unsupported("update_temperature");
    }

    fn increase_temperature(&mut self) {
        self.unsupported("increase_temperature");
    }

    fn decrease_temperature(&mut self) {
        self.unsupported("decrease_temperature");
    }

    fn update_mode(&mut self, _mode: u8) {
        self.unsupported("update_mode");
    }

    fn next_mode(&mut self) {
        self.unsupported("next_mode");
    }

    fn previous_mode(&mut self) {
        self.unsupported("previous_mode");
    }

    fn mode_speed_up(&mut self) {
        self.unsupported("mode_speed_up");
    }

    fn mode_speed_down(&mut self) {
        self.unsupported("mode_speed_down");
    }

    fn enable_night_mode(&mut self) {
        self.unsupported("enable_night_mode");
    }

    fn pair(&mut self) {
        let group = self.session().group_id();
        for _ in 0..PAIR_REPEATS {
            self.update_status(Status::On, group);
        }
    }

    fn unpair(&mut self) {
        self.pair();
    }
}

/// Drive a value that has no absolute command with relative presses
///
/// `target` and `known` are in steps (`0..=steps`). With no known value the
/// value is first driven all the way down.
pub(crate) fn step_to<F: PacketFormatter + ?Sized>(
    formatter: &mut F,
    increase: fn(&mut F),
    decrease: fn(&mut F),
    steps: u8,
    target: u8,
    known: Option<u8>,
) {
    let target = target.min(steps);
    let (press, count) = match known {
        None => {
            for _ in 0..steps {
                decrease(formatter);
            }
            (increase, target)
        }
        Some(current) if target < current => (decrease, current - target),
        Some(current) if target > current => (increase, target - current),
        Some(_) => return,
    };

    for _ in 0..count {
        press(formatter);
    }
}

/// Check a raw buffer against a fixed packet length
pub(crate) fn expect_len(bytes: &[u8], expected: usize) -> Result<(), ParseError> {
    if bytes.len() != expected {
        return Err(ParseError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        session: Session,
        ups: usize,
        downs: usize,
    }

    impl PacketFormatter for Counting {
        fn remote_type(&self) -> RemoteType {
            RemoteType::Cct
        }
        fn session(&self) -> &Session {
            &self.session
        }
        fn session_mut(&mut self) -> &mut Session {
            &mut self.session
        }
        fn initialize_packet(&mut self, _packet: &mut [u8]) {}
        fn command(&mut self, _command: u8, _arg: u8) {
            self.push_packet();
        }
        fn can_handle(&self, _bytes: &[u8]) -> bool {
            false
        }
        fn parse_packet(&self, bytes: &[u8], _states: &dyn StateStore) -> Result<ParsedPacket, ParseError> {
            expect_len(bytes, 7)?;
            Ok(ParsedPacket::new(self.bulb_id()))
        }
        fn increase_brightness(&mut self) {
            self.ups += 1;
        }
        fn decrease_brightness(&mut self) {
            self.downs += 1;
        }
    }

    fn counting(max_packets: usize) -> Counting {
        Counting {
            session: Session::new(max_packets),
            ups: 0,
            downs: 0,
        }
    }

    fn run(known: Option<u8>, target: u8) -> (usize, usize) {
        let mut f = counting(20);
        step_to(
            &mut f,
            |f: &mut Counting| f.increase_brightness(),
            |f: &mut Counting| f.decrease_brightness(),
            10,
            target,
            known,
        );
        (f.ups, f.downs)
    }

    #[test]
    fn test_step_function() {
        assert_eq!(run(None, 4), (4, 10));
        assert_eq!(run(Some(7), 4), (0, 3));
        assert_eq!(run(Some(2), 9), (7, 0));
        assert_eq!(run(Some(5), 5), (0, 0));
        assert_eq!(run(None, 30), (10, 10));
    }

    #[test]
    fn test_session_limit_drops_extra_commands() {
        let mut f = counting(2);
        f.prepare(0x0102, 1, None);
        f.command(1, 0);
        f.command(2, 0);
        f.command(3, 0);
        assert_eq!(f.session().packets().len(), 2);
        assert_eq!(f.build_packets().len(), 2);
        assert!(f.session().packets().is_empty());
    }

    #[test]
    fn test_reset_clears_target() {
        let mut f = counting(2);
        f.prepare(0x0102, 3, Some(BulbState::default()));
        f.set_held(true);
        assert!(f.session().is_prepared());
        f.reset();
        assert!(!f.session().is_prepared());
        assert!(!f.session().held());
        assert!(f.session().snapshot().is_none());
        assert_eq!(f.bulb_id().group_id, 0);
    }

    #[test]
    fn test_pair_presses_on_five_times() {
        let mut f = counting(8);
        f.prepare(1, 1, None);
        // Counting has no status support, so pairing only logs
        f.pair();
        assert!(f.build_packets().is_empty());
    }

    #[test]
    fn test_expect_len() {
        assert_eq!(
            expect_len(&[0; 6], 7),
            Err(ParseError::InvalidLength {
                expected: 7,
                actual: 6
            })
        );
    }
}
