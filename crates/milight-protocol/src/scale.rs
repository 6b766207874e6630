//! Percentage scales and status/group argument packing used on the wire

use crate::command::Status;

/// Default tolerance, in steps, accepted past either end of a V2 scale
pub const V2_RANGE_BUFFER: u8 = 0x13;

/// A folded `[0, 100]` scale
///
/// The wire value starts at `end`, counts in steps of `interval`, wraps
/// through zero and continues upward. For example with `end = 0x8F` and
/// `interval = 2` the sequence is `0x8F, 0x91, ..., 0xFF, 0x01, ...`. When
/// `reverse` is set, 100 maps to `end` instead of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2Scale {
    pub end: u8,
    pub interval: u8,
    pub reverse: bool,
    pub buffer: u8,
}

impl V2Scale {
    pub const fn new(end: u8, interval: u8, reverse: bool) -> Self {
        Self {
            end,
            interval,
            reverse,
            buffer: V2_RANGE_BUFFER,
        }
    }

    /// Encode a percentage (values above 100 are clamped)
    pub fn encode(&self, percent: u8) -> u8 {
        let percent = percent.min(100);
        let steps = if self.reverse { 100 - percent } else { percent };
        steps.wrapping_mul(self.interval).wrapping_add(self.end)
    }

    /// Decode a wire value back into a percentage
    ///
    /// Values up to `buffer` steps beyond 100 decode as 100. Anything further
    /// out is treated as having wrapped below zero and decodes as 0.
    pub fn decode(&self, wire: u8) -> u8 {
        let interval = self.interval.max(1);
        let mut steps = wire.wrapping_sub(self.end) / interval;

        if steps > 100 {
            steps = if steps <= 100u8.saturating_add(self.buffer) {
                100
            } else {
                0
            };
        }

        if self.reverse {
            100 - steps
        } else {
            steps
        }
    }
}

/// Packs status and group into one argument byte
///
/// `slots` is the number of addressable groups including group 0 ("all").
/// ON is sent as `group`, OFF as `group + slots`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusGroupArg {
    pub slots: u8,
}

impl StatusGroupArg {
    /// Packing for a protocol with `num_groups` numbered groups plus "all"
    pub const fn for_groups(num_groups: u8) -> Self {
        Self {
            slots: num_groups + 1,
        }
    }

    pub fn encode(&self, status: Status, group: u8) -> u8 {
        match status {
            Status::On => group,
            Status::Off => group.wrapping_add(self.slots),
        }
    }

    /// Returns `None` when `arg` does not encode a status
    pub fn decode(&self, arg: u8) -> Option<(Status, u8)> {
        if arg < self.slots {
            Some((Status::On, arg))
        } else if (arg as u16) < 2 * self.slots as u16 {
            Some((Status::Off, arg - self.slots))
        } else {
            None
        }
    }
}
