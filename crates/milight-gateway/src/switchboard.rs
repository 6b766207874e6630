//! Radio switchboard
//!
//! Holds one radio per radio configuration in use and forwards I/O to the
//! current one. Reprogramming a radio is expensive, so the switchboard only
//! calls `configure` when the requested radio differs from the current one.

use milight_protocol::{RadioConfig, RemoteConfig};
use tracing::{debug, info, warn};

use crate::error::RadioError;
use crate::radio::{Radio, RadioFactory};

pub struct RadioSwitchboard {
    radios: Vec<Box<dyn Radio>>,
    /// Position in `radios`, not a configuration index
    current: Option<usize>,
}

impl RadioSwitchboard {
    /// Create and start one radio per configuration
    ///
    /// A radio that fails to start is left out; remotes on that configuration
    /// then have no radio and their packets are dropped by the sender.
    pub fn new(
        factory: &dyn RadioFactory,
        configs: impl IntoIterator<Item = &'static RadioConfig>,
    ) -> Self {
        let mut radios = Vec::new();
        for config in configs {
            if radios.iter().any(|r: &Box<dyn Radio>| r.config().index == config.index) {
                continue;
            }
            let mut radio = factory.create(config);
            match radio.begin() {
                Ok(()) => {
                    debug!("Started radio for configuration {}", config.index);
                    radios.push(radio);
                }
                Err(e) => warn!("Radio for configuration {} failed to start: {}", config.index, e),
            }
        }

        info!("Radio switchboard ready with {} radios", radios.len());
        Self { radios, current: None }
    }

    pub fn num_radios(&self) -> usize {
        self.radios.len()
    }

    /// Whether a radio exists for the configuration index
    pub fn has_radio(&self, config_index: usize) -> bool {
        self.position(config_index).is_some()
    }

    /// Configuration of the current radio
    pub fn current_config(&self) -> Option<&'static RadioConfig> {
        self.current.map(|ix| self.radios[ix].config())
    }

    fn position(&self, config_index: usize) -> Option<usize> {
        self.radios.iter().position(|r| r.config().index == config_index)
    }

    /// Make the radio for `config_index` current
    pub fn switch_radio(&mut self, config_index: usize) -> Result<(), RadioError> {
        let ix = self
            .position(config_index)
            .ok_or(RadioError::NotFound(config_index))?;

        if self.current != Some(ix) {
            debug!("Switching to radio configuration {}", config_index);
            self.radios[ix].configure()?;
            self.current = Some(ix);
        }
        Ok(())
    }

    /// Make the radio used by `remote` current
    pub fn switch_for(&mut self, remote: &RemoteConfig) -> Result<(), RadioError> {
        self.switch_radio(remote.radio)
    }

    fn current_radio(&mut self) -> Option<&mut Box<dyn Radio>> {
        let ix = self.current?;
        self.radios.get_mut(ix)
    }

    pub fn available(&mut self) -> bool {
        self.current_radio().is_some_and(|r| r.available())
    }

    /// Read from the current radio; 0 when there is none
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        match self.current_radio() {
            Some(radio) => radio.read(buf),
            None => Ok(0),
        }
    }

    /// Write to the current radio; a no-op when there is none
    pub fn write(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        match self.current_radio() {
            Some(radio) => radio.write(frame),
            None => Ok(()),
        }
    }
}
