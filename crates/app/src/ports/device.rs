//! Device capability ports — what the control core needs from hardware.
//!
//! Implementations live in adapter crates (one-wire, GPIO, Bluetooth beacons,
//! or the virtual adapter). Calls are synchronous: sensor and relay IO is fast
//! compared to a control cycle.

use fermhub_domain::error::DeviceError;

/// A device that can read a temperature in degrees Celsius.
pub trait Thermometer: Send + Sync {
    /// Read the current temperature.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the sensor cannot be read.
    fn temperature(&self) -> Result<f64, DeviceError>;
}

/// A device that can read specific gravity.
pub trait Hydrometer: Send + Sync {
    /// Read the current specific gravity.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the sensor cannot be read.
    fn gravity(&self) -> Result<f64, DeviceError>;
}

/// A device that reads both, such as a floating beacon hydrometer.
pub trait ThermometerAndHydrometer: Thermometer + Hydrometer {}

impl<T: Thermometer + Hydrometer> ThermometerAndHydrometer for T {}

/// A device that can be switched on and off (relay, SSR, …).
pub trait Actuator: Send + Sync {
    /// Energize the device.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the output cannot be written.
    fn on(&self) -> Result<(), DeviceError>;

    /// De-energize the device.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the output cannot be written.
    fn off(&self) -> Result<(), DeviceError>;
}
