//! MiLight gateway core
//!
//! Turns semantic bulb commands into queued, throttled radio transmissions,
//! and turns received frames back into parsed packets.
//!
//! # Architecture
//!
//! - [`MiLightClient`] runs a formatter cycle per command and queues the packets
//! - [`PacketSender`] drains the bounded [`PacketQueue`] one batch per tick,
//!   throttling repeats when commands arrive in bursts
//! - [`RadioSwitchboard`] owns one [`Radio`] per radio configuration and only
//!   reconfigures when the required configuration changes
//!
//! Everything is single-threaded and non-blocking. Callers that need a command
//! to be on air before answering spin on [`MiLightClient::flush`].

pub mod client;
pub mod error;
pub mod queue;
pub mod radio;
pub mod sender;
pub mod settings;
pub mod switchboard;

#[cfg(test)]
mod testing;

pub use client::MiLightClient;
pub use error::{GatewayError, RadioError};
pub use queue::{PacketQueue, QueuedPacket};
pub use radio::{Radio, RadioFactory};
pub use sender::{PacketSender, PacketSentHandler};
pub use settings::{GatewaySettings, SenderSettings};
pub use switchboard::RadioSwitchboard;
