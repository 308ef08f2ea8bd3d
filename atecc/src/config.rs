//! Device configuration

use std::time::Duration;

use atecc_core::constants::{DEFAULT_RX_RETRIES, DEFAULT_WAKE_DELAY_US};
use atecc_core::DeviceType;

/// Settings for a [`Device`](crate::Device)
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use atecc::DeviceConfig;
///
/// let config = DeviceConfig::i2c_default().with_rx_retries(5);
/// assert_eq!(config.wake_delay, Duration::from_micros(1500));
/// assert_eq!(config.rx_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device type, selects the execution time table
    pub device_type: DeviceType,

    /// Delay between transmit attempts, also used after a raw wake pulse
    pub wake_delay: Duration,

    /// Number of transmit retries after the first attempt
    pub rx_retries: u32,
}

impl DeviceConfig {
    /// Settings for a chip wired directly to an I²C bus
    pub fn i2c_default() -> Self {
        Self {
            device_type: DeviceType::Atecc608,
            wake_delay: Duration::from_micros(DEFAULT_WAKE_DELAY_US),
            rx_retries: DEFAULT_RX_RETRIES,
        }
    }

    /// Settings for a chip behind a kit board, which handles retries itself
    pub fn kit_default() -> Self {
        Self {
            device_type: DeviceType::Atecc608,
            wake_delay: Duration::ZERO,
            rx_retries: 0,
        }
    }

    /// Set device type
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Set wake delay
    pub fn with_wake_delay(mut self, delay: Duration) -> Self {
        self.wake_delay = delay;
        self
    }

    /// Set transmit retry count
    pub fn with_rx_retries(mut self, retries: u32) -> Self {
        self.rx_retries = retries;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::i2c_default()
    }
}
