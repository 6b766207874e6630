//! Bounded packet queue
//!
//! Overflow never fails: the oldest pending entry is evicted and counted.

use std::collections::VecDeque;

use milight_protocol::RemoteConfig;
use tracing::debug;

/// A finalized packet waiting to be transmitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPacket {
    pub packet: Vec<u8>,
    pub remote: &'static RemoteConfig,
    /// Requested repeat count, before throttling
    pub repeats: usize,
}

#[derive(Debug)]
pub struct PacketQueue {
    entries: VecDeque<QueuedPacket>,
    capacity: usize,
    dropped_packets: u64,
}

impl PacketQueue {
    /// A zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            dropped_packets: 0,
        }
    }

    pub fn push(&mut self, entry: QueuedPacket) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.dropped_packets += 1;
                debug!(
                    "Queue full, dropped oldest {} packet ({} dropped so far)",
                    evicted.remote.remote_type, self.dropped_packets
                );
            }
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<QueuedPacket> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries evicted by overflow since construction
    pub fn dropped_packets(&self) -> u64 {
        self.dropped_packets
    }
}
