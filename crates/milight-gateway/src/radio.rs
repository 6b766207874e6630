//! Radio driver contract

use milight_protocol::RadioConfig;

use crate::error::RadioError;

/// One physical radio programmed for a single [`RadioConfig`]
///
/// Drivers never block: `available` and `read` only look at frames that have
/// already arrived.
pub trait Radio {
    /// Bring the hardware up. Called once, when the switchboard is built.
    fn begin(&mut self) -> Result<(), RadioError>;

    /// Program sync words and channels. Called each time this radio becomes
    /// current.
    fn configure(&mut self) -> Result<(), RadioError>;

    /// Whether a received frame is waiting
    fn available(&mut self) -> bool;

    /// Copy the next received frame into `buf`, returning its length
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError>;

    /// Transmit one frame on every channel of the configuration
    fn write(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    fn config(&self) -> &'static RadioConfig;
}

/// Builds a radio for a given configuration
pub trait RadioFactory {
    fn create(&self, config: &'static RadioConfig) -> Box<dyn Radio>;
}
