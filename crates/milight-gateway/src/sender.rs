//! Throttled packet sender
//!
//! Each call to [`PacketSender::tick_at`] does one unit of work: pick up the
//! next queued packet, or transmit one batch of repeats of the current one.
//!
//! Repeats are throttled under bursty load. On every pick-up the resend count
//! moves by `(elapsed_ms - threshold_ms) * multiplier`, clamped to
//! `[packet_repeat_minimum, packet_repeats]`, and the packet's repeats are
//! reduced by however far the resend count sits below the maximum.

use std::time::Instant;

use milight_protocol::RemoteConfig;
use tracing::{debug, warn};

use crate::queue::{PacketQueue, QueuedPacket};
use crate::settings::SenderSettings;
use crate::switchboard::RadioSwitchboard;

/// Called once per packet, after its last repeat
pub type PacketSentHandler = Box<dyn FnMut(&[u8], &'static RemoteConfig)>;

pub struct PacketSender {
    switchboard: RadioSwitchboard,
    queue: PacketQueue,
    settings: SenderSettings,
    current: Option<QueuedPacket>,
    repeats_remaining: usize,
    throttle_multiplier: usize,
    resend_count: usize,
    last_pickup: Option<Instant>,
    transmissions: u64,
    on_sent: Option<PacketSentHandler>,
}

impl PacketSender {
    pub fn new(switchboard: RadioSwitchboard, settings: SenderSettings) -> Self {
        Self {
            switchboard,
            queue: PacketQueue::new(settings.queue_capacity),
            throttle_multiplier: settings.throttle_multiplier(),
            resend_count: settings.packet_repeats,
            settings,
            current: None,
            repeats_remaining: 0,
            last_pickup: None,
            transmissions: 0,
            on_sent: None,
        }
    }

    pub fn on_packet_sent(&mut self, handler: impl FnMut(&[u8], &'static RemoteConfig) + 'static) {
        self.on_sent = Some(Box::new(handler));
    }

    /// Queue a packet; `repeats_override` of `None` or 0 uses the configured count
    pub fn enqueue(
        &mut self,
        packet: Vec<u8>,
        remote: &'static RemoteConfig,
        repeats_override: Option<usize>,
    ) {
        let repeats = repeats_override
            .filter(|r| *r > 0)
            .unwrap_or(self.settings.packet_repeats);
        self.queue.push(QueuedPacket {
            packet,
            remote,
            repeats,
        });
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if self.current.is_some() {
            self.send_batch(now);
        } else {
            self.next_packet(now);
        }
    }

    /// Tick until everything queued has been sent
    pub fn flush(&mut self) {
        while self.is_sending() {
            self.tick();
        }
    }

    /// Whether a packet is in flight or waiting
    pub fn is_sending(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped_packets(&self) -> u64 {
        self.queue.dropped_packets()
    }

    /// Physical radio writes since construction
    pub fn transmissions(&self) -> u64 {
        self.transmissions
    }

    pub fn resend_count(&self) -> usize {
        self.resend_count
    }

    pub fn repeats_remaining(&self) -> usize {
        self.repeats_remaining
    }

    pub fn settings(&self) -> &SenderSettings {
        &self.settings
    }

    pub fn switchboard(&self) -> &RadioSwitchboard {
        &self.switchboard
    }

    pub fn switchboard_mut(&mut self) -> &mut RadioSwitchboard {
        &mut self.switchboard
    }

    fn next_packet(&mut self, now: Instant) {
        while let Some(entry) = self.queue.pop() {
            if let Err(e) = self.switchboard.switch_for(entry.remote) {
                warn!("Dropping {} packet: {}", entry.remote.remote_type, e);
                continue;
            }

            self.update_resend_count(now);
            self.repeats_remaining = self.throttled_repeats(entry.repeats);
            debug!(
                "Sending {} packet with {} of {} repeats",
                entry.remote.remote_type, self.repeats_remaining, entry.repeats
            );
            self.current = Some(entry);
            return;
        }
    }

    fn send_batch(&mut self, now: Instant) {
        let Some(current) = self.current.as_ref() else {
            return;
        };

        let batch = self.settings.packet_repeats_per_loop.min(self.repeats_remaining);
        for _ in 0..batch {
            if let Err(e) = self.switchboard.write(&current.packet) {
                warn!(
                    "Radio write failed for {} packet, abandoning it: {}",
                    current.remote.remote_type, e
                );
                self.current = None;
                self.repeats_remaining = 0;
                return;
            }
            self.transmissions += 1;
        }

        self.repeats_remaining -= batch;
        if self.repeats_remaining == 0 {
            if let Some(done) = self.current.take() {
                if let Some(handler) = self.on_sent.as_mut() {
                    handler(&done.packet, done.remote);
                }
            }
            self.next_packet(now);
        }
    }

    fn update_resend_count(&mut self, now: Instant) {
        let max = self.settings.packet_repeats;
        let min = self.settings.packet_repeat_minimum.min(max);

        self.resend_count = match self.last_pickup {
            None => max,
            Some(last) => {
                let elapsed = i64::try_from(now.saturating_duration_since(last).as_millis())
                    .unwrap_or(i64::MAX);
                let threshold = i64::try_from(self.settings.throttle_threshold_ms).unwrap_or(i64::MAX);
                let multiplier = i64::try_from(self.throttle_multiplier).unwrap_or(i64::MAX);
                let delta = elapsed.saturating_sub(threshold).saturating_mul(multiplier);
                let next = i64::try_from(self.resend_count)
                    .unwrap_or(i64::MAX)
                    .saturating_add(delta);
                usize::try_from(next.max(0)).unwrap_or(max).clamp(min, max)
            }
        };
        self.last_pickup = Some(now);
    }

    fn throttled_repeats(&self, requested: usize) -> usize {
        let discount = self.settings.packet_repeats.saturating_sub(self.resend_count);
        requested
            .saturating_sub(discount)
            .max(self.settings.packet_repeat_minimum.min(requested))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingFactory, RecordingLog};
    use milight_protocol::{RemoteType, ALL_RADIO_CONFIGS};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn sender(log: &RecordingLog, settings: SenderSettings) -> PacketSender {
        let factory = RecordingFactory::new(log.clone());
        PacketSender::new(RadioSwitchboard::new(&factory, ALL_RADIO_CONFIGS.iter()), settings)
    }

    #[test]
    fn test_sends_all_repeats_in_batches() {
        let log = RecordingLog::default();
        let mut sender = sender(&log, SenderSettings::default());
        let start = Instant::now();

        sender.enqueue(vec![0xB0, 1, 2, 3, 4, 5, 6], RemoteType::Rgbw.config(), None);
        sender.tick_at(start);
        assert_eq!(sender.repeats_remaining(), 50);

        let mut ticks = 0;
        while sender.is_sending() {
            sender.tick_at(start);
            ticks += 1;
        }
        assert_eq!(ticks, 5);
        assert_eq!(log.writes().len(), 50);
        assert!(log.writes().iter().all(|(radio, _)| *radio == 0));
    }

    #[test]
    fn test_repeats_override() {
        let log = RecordingLog::default();
        let mut sender = sender(&log, SenderSettings::default());
        sender.enqueue(vec![0xA4, 0, 0, 0, 2, 0], RemoteType::Rgb.config(), Some(3));
        sender.enqueue(vec![0xA4, 0, 0, 0, 1, 1], RemoteType::Rgb.config(), Some(0));
        sender.flush();
        assert_eq!(sender.transmissions(), 53);
    }

    #[test]
    fn test_callback_fires_once_per_packet() {
        let log = RecordingLog::default();
        let mut sender = sender(&log, SenderSettings::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        sender.on_packet_sent(move |packet, remote| {
            sink.borrow_mut().push((packet.to_vec(), remote.remote_type));
        });

        sender.enqueue(vec![0x5A, 0, 1, 1, 8, 0, 0], RemoteType::Cct.config(), None);
        sender.enqueue(vec![0xA5, 0, 1, 0, 4, 0], RemoteType::Fut020.config(), None);
        sender.flush();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, RemoteType::Cct);
        assert_eq!(seen[1].1, RemoteType::Fut020);
    }

    #[test]
    fn test_packet_without_radio_is_dropped() {
        let log = RecordingLog::default();
        let factory = RecordingFactory::new(log.clone());
        let board = RadioSwitchboard::new(&factory, ALL_RADIO_CONFIGS[..1].iter());
        let mut sender = PacketSender::new(board, SenderSettings::default());

        sender.enqueue(vec![0xA4, 0, 0, 0, 2, 0], RemoteType::Rgb.config(), None);
        sender.enqueue(vec![0xB0, 0, 0, 0, 0, 1, 0], RemoteType::Rgbw.config(), Some(2));
        sender.flush();

        assert_eq!(log.writes().len(), 2);
        assert!(log.writes().iter().all(|(radio, _)| *radio == 0));
    }

    #[test]
    fn test_throttle_recovers_after_idle() {
        let log = RecordingLog::default();
        let settings = SenderSettings {
            throttle_sensitivity: 100,
            ..Default::default()
        };
        let mut sender = sender(&log, settings);
        let start = Instant::now();
        let remote = RemoteType::RgbCct.config();

        sender.enqueue(vec![0; 9], remote, None);
        sender.tick_at(start);
        assert_eq!(sender.resend_count(), 50);

        // Burst: the second pick-up happens 10ms later
        sender.enqueue(vec![1; 9], remote, None);
        for _ in 0..5 {
            sender.tick_at(start + Duration::from_millis(10));
        }
        assert_eq!(sender.resend_count(), 3);
        assert_eq!(sender.repeats_remaining(), 3);

        sender.tick_at(start + Duration::from_millis(20));
        sender.enqueue(vec![2; 9], remote, None);
        sender.tick_at(start + Duration::from_secs(5));
        assert_eq!(sender.resend_count(), 50);
        assert_eq!(sender.repeats_remaining(), 50);
    }
}
