//! Virtual radios
//!
//! Radios created by one [`VirtualRadioFactory`] share a [`RadioBus`]: every
//! write is recorded on the bus, and frames injected on the bus are what the
//! radio for that configuration reads back.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use milight_gateway::{Radio, RadioError, RadioFactory};
use milight_protocol::RadioConfig;
use serde::Serialize;
use tracing::{debug, trace};

/// One physical write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transmission {
    /// Radio configuration index the frame went out on
    pub radio: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct BusState {
    transmissions: Vec<Transmission>,
    configures: HashMap<usize, usize>,
    inbox: HashMap<usize, VecDeque<Vec<u8>>>,
    failing: HashSet<usize>,
}

/// Shared record of everything the virtual radios did
#[derive(Debug, Clone, Default)]
pub struct RadioBus {
    state: Rc<RefCell<BusState>>,
}

impl RadioBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for the radio on `radio` to receive
    pub fn inject(&self, radio: usize, frame: &[u8]) {
        self.state
            .borrow_mut()
            .inbox
            .entry(radio)
            .or_default()
            .push_back(frame.to_vec());
    }

    pub fn transmissions(&self) -> Vec<Transmission> {
        self.state.borrow().transmissions.clone()
    }

    pub fn transmission_count(&self) -> usize {
        self.state.borrow().transmissions.len()
    }

    /// Transmissions with consecutive repeats of the same frame collapsed
    pub fn distinct_packets(&self) -> Vec<Transmission> {
        let state = self.state.borrow();
        let mut packets: Vec<Transmission> = Vec::new();
        for t in &state.transmissions {
            if packets.last() != Some(t) {
                packets.push(t.clone());
            }
        }
        packets
    }

    /// How many times the radio for `radio` was reconfigured
    pub fn configure_count(&self, radio: usize) -> usize {
        self.state.borrow().configures.get(&radio).copied().unwrap_or(0)
    }

    /// Make writes (and `begin`) on `radio` fail
    pub fn set_failing(&self, radio: usize, failing: bool) {
        let mut state = self.state.borrow_mut();
        if failing {
            state.failing.insert(radio);
        } else {
            state.failing.remove(&radio);
        }
    }

    /// Forget recorded writes, keeping anything waiting to be received
    pub fn clear_transmissions(&self) {
        self.state.borrow_mut().transmissions.clear();
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.transmissions.clear();
        state.configures.clear();
        state.inbox.clear();
    }

    fn is_failing(&self, radio: usize) -> bool {
        self.state.borrow().failing.contains(&radio)
    }
}

/// A radio that lives on a [`RadioBus`]
#[derive(Debug)]
pub struct VirtualRadio {
    config: &'static RadioConfig,
    bus: RadioBus,
    started: bool,
}

impl VirtualRadio {
    pub fn new(config: &'static RadioConfig, bus: RadioBus) -> Self {
        Self {
            config,
            bus,
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn ensure_started(&self) -> Result<(), RadioError> {
        if self.started {
            Ok(())
        } else {
            Err(RadioError::NotStarted(self.config.index))
        }
    }
}

impl Radio for VirtualRadio {
    fn begin(&mut self) -> Result<(), RadioError> {
        if self.bus.is_failing(self.config.index) {
            return Err(RadioError::Io(format!(
                "virtual radio {} unavailable",
                self.config.index
            )));
        }
        self.started = true;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), RadioError> {
        self.ensure_started()?;
        debug!(
            "Virtual radio {} configured: sync 0x{:04X}/0x{:04X}, channels {:?}",
            self.config.index, self.config.syncword0, self.config.syncword3, self.config.channels
        );
        *self
            .bus
            .state
            .borrow_mut()
            .configures
            .entry(self.config.index)
            .or_default() += 1;
        Ok(())
    }

    fn available(&mut self) -> bool {
        self.started
            && self
                .bus
                .state
                .borrow()
                .inbox
                .get(&self.config.index)
                .is_some_and(|q| !q.is_empty())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        self.ensure_started()?;
        let frame = self
            .bus
            .state
            .borrow_mut()
            .inbox
            .get_mut(&self.config.index)
            .and_then(|q| q.pop_front());

        let Some(frame) = frame else {
            return Ok(0);
        };
        if frame.len() > buf.len() {
            return Err(RadioError::FrameTooLong {
                max: buf.len(),
                actual: frame.len(),
            });
        }
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        self.ensure_started()?;
        if frame.len() > self.config.packet_len {
            return Err(RadioError::FrameTooLong {
                max: self.config.packet_len,
                actual: frame.len(),
            });
        }
        if self.bus.is_failing(self.config.index) {
            return Err(RadioError::Io(format!(
                "virtual radio {} write failed",
                self.config.index
            )));
        }

        trace!("Virtual radio {} tx {:02X?}", self.config.index, frame);
        self.bus.state.borrow_mut().transmissions.push(Transmission {
            radio: self.config.index,
            bytes: frame.to_vec(),
        });
        Ok(())
    }

    fn config(&self) -> &'static RadioConfig {
        self.config
    }
}

/// Creates [`VirtualRadio`]s attached to one bus
#[derive(Debug, Clone, Default)]
pub struct VirtualRadioFactory {
    bus: RadioBus,
}

impl VirtualRadioFactory {
    pub fn new(bus: RadioBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &RadioBus {
        &self.bus
    }
}

impl RadioFactory for VirtualRadioFactory {
    fn create(&self, config: &'static RadioConfig) -> Box<dyn Radio> {
        Box::new(VirtualRadio::new(config, self.bus.clone()))
    }
}
