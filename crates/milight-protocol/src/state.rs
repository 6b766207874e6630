//! Bulb state snapshots consulted by the formatters
//!
//! Formatters only ever read state. Keeping it current after packets round-trip
//! is the caller's job; [`MemoryStateStore::apply`] folds parsed packets in.

use std::collections::HashMap;

use tracing::debug;

use crate::command::{BulbId, BulbMode, CommandName, FieldUpdates, ParsedPacket, Status};

/// Snapshot of what is believed about one bulb group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BulbState {
    pub status: Option<Status>,
    /// 0-100, `None` if never observed
    pub brightness: Option<u8>,
    /// 0-359 degrees
    pub hue: u16,
    /// 0-100
    pub saturation: u8,
    /// White value 0-100 (0 is coolest)
    pub kelvin: u8,
    /// Effect index
    pub mode: u8,
    pub bulb_mode: BulbMode,
}

impl Default for BulbState {
    fn default() -> Self {
        Self {
            status: None,
            brightness: None,
            hue: 0,
            saturation: 100,
            kelvin: 0,
            mode: 0,
            bulb_mode: BulbMode::White,
        }
    }
}

impl BulbState {
    /// Fold the updates of one parsed packet into this snapshot
    pub fn apply(&mut self, packet: &ParsedPacket) {
        self.apply_updates(&packet.updates);
    }

    pub fn apply_updates(&mut self, updates: &FieldUpdates) {
        if let Some(status) = updates.status {
            self.status = Some(status);
        }
        if let Some(brightness) = updates.brightness {
            self.brightness = Some(brightness);
        }
        if let Some(hue) = updates.hue {
            self.hue = hue;
            self.bulb_mode = BulbMode::Color;
        }
        if let Some(saturation) = updates.saturation {
            self.saturation = saturation;
        }
        if let Some(temperature) = updates.temperature {
            self.kelvin = temperature;
            self.bulb_mode = BulbMode::White;
        }
        if let Some(mode) = updates.mode {
            self.mode = mode;
            self.bulb_mode = BulbMode::Scene;
        }
        match updates.command {
            Some(CommandName::SetWhite) => self.bulb_mode = BulbMode::White,
            Some(CommandName::NightMode) => self.bulb_mode = BulbMode::Night,
            _ => {}
        }
    }
}

/// Read-only source of bulb state snapshots
pub trait StateStore {
    /// Snapshot for the given bulb group, if one is known
    fn get(&self, id: &BulbId) -> Option<BulbState>;
}

/// A store that never knows anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoState;

impl StateStore for NoState {
    fn get(&self, _id: &BulbId) -> Option<BulbState> {
        None
    }
}

/// In-memory state store keyed by [`BulbId`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    states: HashMap<BulbId, BulbState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: BulbId, state: BulbState) {
        self.states.insert(id, state);
    }

    pub fn remove(&mut self, id: &BulbId) -> Option<BulbState> {
        self.states.remove(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Record the effect of a parsed packet
    ///
    /// Packets addressed to group 0 also update every known group of the same
    /// device.
    pub fn apply(&mut self, packet: &ParsedPacket) {
        let id = packet.bulb_id;
        if id.is_undecoded() {
            debug!("Ignoring state update for undecoded packet");
            return;
        }

        self.states.entry(id).or_default().apply(packet);

        if id.group_id == 0 {
            for (other, state) in self.states.iter_mut() {
                if other.group_id != 0
                    && other.device_id == id.device_id
                    && other.remote_type == id.remote_type
                {
                    state.apply(packet);
                }
            }
        }
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, id: &BulbId) -> Option<BulbState> {
        self.states.get(id).copied()
    }
}
