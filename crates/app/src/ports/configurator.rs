//! Configurator port — turns a device identifier into a live capability.
//!
//! The resolver in [`crate::devices`] only ever talks to this trait, which keeps
//! the control logic independent from physical IO.

use std::sync::Arc;

use fermhub_domain::device::TiltColor;
use fermhub_domain::error::DeviceError;

use super::device::{Actuator, Thermometer, ThermometerAndHydrometer};

/// Factory for device capabilities.
pub trait Configurator: Send + Sync {
    /// Open a one-wire thermometer by address.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the device does not exist or cannot be opened.
    fn create_thermometer(&self, id: &str) -> Result<Arc<dyn Thermometer>, DeviceError>;

    /// Attach to the beacon hydrometer broadcasting with the given color.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the beacon cannot be monitored.
    fn create_beacon_hydrometer(
        &self,
        color: TiltColor,
    ) -> Result<Arc<dyn ThermometerAndHydrometer>, DeviceError>;

    /// Open a GPIO pin as an output.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the pin does not exist or is busy.
    fn create_gpio_actuator(&self, pin: &str) -> Result<Arc<dyn Actuator>, DeviceError>;
}

impl<T: Configurator> Configurator for Arc<T> {
    fn create_thermometer(&self, id: &str) -> Result<Arc<dyn Thermometer>, DeviceError> {
        (**self).create_thermometer(id)
    }

    fn create_beacon_hydrometer(
        &self,
        color: TiltColor,
    ) -> Result<Arc<dyn ThermometerAndHydrometer>, DeviceError> {
        (**self).create_beacon_hydrometer(color)
    }

    fn create_gpio_actuator(&self, pin: &str) -> Result<Arc<dyn Actuator>, DeviceError> {
        (**self).create_gpio_actuator(pin)
    }
}
