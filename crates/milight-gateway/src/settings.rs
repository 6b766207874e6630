//! Gateway settings
//!
//! Read once at construction. Defaults match stock firmware behaviour.

use milight_protocol::{FormatterOptions, RadioConfig, RemoteType};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Repeat and throttle tuning for the packet sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    /// Repeats per packet when the caller gives no override
    pub packet_repeats: usize,
    /// Repeats transmitted per tick
    pub packet_repeats_per_loop: usize,
    /// Pick-ups closer together than this are throttled (ms)
    pub throttle_threshold_ms: u64,
    /// How quickly repeats are scaled back; 0 disables throttling
    pub throttle_sensitivity: usize,
    /// Throttling never takes a packet below this many repeats
    pub packet_repeat_minimum: usize,
    pub queue_capacity: usize,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            packet_repeats: 50,
            packet_repeats_per_loop: 10,
            throttle_threshold_ms: 200,
            throttle_sensitivity: 0,
            packet_repeat_minimum: 3,
            queue_capacity: 20,
        }
    }
}

impl SenderSettings {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.packet_repeats == 0 {
            return Err(GatewayError::InvalidSettings(
                "packet_repeats must be at least 1".into(),
            ));
        }
        if self.packet_repeats_per_loop == 0 {
            return Err(GatewayError::InvalidSettings(
                "packet_repeats_per_loop must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(GatewayError::InvalidSettings(
                "queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Repeats added or removed per millisecond away from the threshold
    pub fn throttle_multiplier(&self) -> usize {
        self.throttle_sensitivity
            .saturating_mul(self.packet_repeats)
            .div_ceil(1000)
    }
}

/// Everything the gateway client needs at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub sender: SenderSettings,
    pub formatter: FormatterOptions,
    /// Remotes to bring radios up for
    pub remotes: Vec<RemoteType>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            sender: SenderSettings::default(),
            formatter: FormatterOptions::default(),
            remotes: RemoteType::ALL.to_vec(),
        }
    }
}

impl GatewaySettings {
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.sender.validate()?;
        if self.remotes.is_empty() {
            return Err(GatewayError::InvalidSettings(
                "at least one remote type must be enabled".into(),
            ));
        }
        Ok(())
    }

    /// Radio configurations used by the enabled remotes, without duplicates
    pub fn radio_configs(&self) -> Vec<&'static RadioConfig> {
        let mut configs: Vec<&'static RadioConfig> = Vec::new();
        for remote in &self.remotes {
            let config = remote.config().radio_config();
            if !configs.iter().any(|c| c.index == config.index) {
                configs.push(config);
            }
        }
        configs
    }
}
