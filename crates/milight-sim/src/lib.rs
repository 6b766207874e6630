//! MiLight radio simulation
//!
//! In-memory radios for exercising the gateway without hardware.
//!
//! # Example
//!
//! ```rust
//! use milight_gateway::{GatewaySettings, MiLightClient};
//! use milight_protocol::{RemoteType, Status};
//! use milight_sim::{RadioBus, VirtualRadioFactory};
//!
//! let bus = RadioBus::new();
//! let factory = VirtualRadioFactory::new(bus.clone());
//! let mut client = MiLightClient::new(&GatewaySettings::default(), &factory).unwrap();
//!
//! client.prepare(RemoteType::RgbCct, 0x1234, 1, None);
//! client.update_status(Status::On).unwrap();
//! client.flush();
//!
//! assert_eq!(bus.transmission_count(), 50);
//! assert_eq!(bus.distinct_packets().len(), 1);
//! ```

pub mod radio;

pub use radio::{RadioBus, Transmission, VirtualRadio, VirtualRadioFactory};
