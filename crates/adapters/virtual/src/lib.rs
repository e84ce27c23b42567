//! # fermhub-adapter-virtual
//!
//! Simulated hardware for running fermhub without sensors or relays.
//!
//! ## Provided devices
//!
//! | Device type | Id | Behaviour |
//! |-------------|----|-----------|
//! | `ds18b20` | any one-wire address | Reports the temperature last set, 20 °C initially |
//! | `tilt` | beacon color | Reports the last simulated broadcast |
//! | `gpio` | any pin name | Remembers its output and counts activations |
//!
//! Devices are created on first use and shared afterwards, so a test can grab
//! the same handle the controller drives. A device can be
//! [`unplug`](VirtualConfigurator::unplug)ged to make its creation fail.
//!
//! ## Dependency rule
//!
//! Depends on `fermhub-app` (port traits) and `fermhub-domain` only.

mod devices;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fermhub_app::ports::{Actuator, Configurator, Thermometer, ThermometerAndHydrometer};
use fermhub_domain::device::TiltColor;
use fermhub_domain::error::DeviceError;

pub use devices::{VirtualBeacon, VirtualRelay, VirtualThermometer};

const INITIAL_TEMPERATURE: f64 = 20.0;

#[derive(Default)]
struct Registry {
    thermometers: HashMap<String, Arc<VirtualThermometer>>,
    beacons: HashMap<TiltColor, Arc<VirtualBeacon>>,
    relays: HashMap<String, Arc<VirtualRelay>>,
    unplugged: HashSet<String>,
}

/// [`Configurator`] backed by simulated devices.
#[derive(Default)]
pub struct VirtualConfigurator {
    registry: Mutex<Registry>,
}

impl VirtualConfigurator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later creation of `id` fail as if the device were absent.
    pub fn unplug(&self, id: impl Into<String>) {
        self.registry().unplugged.insert(id.into());
    }

    /// The thermometer with this address, created if needed.
    pub fn thermometer(&self, id: &str) -> Arc<VirtualThermometer> {
        self.registry()
            .thermometers
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(VirtualThermometer::new(id, INITIAL_TEMPERATURE)))
            .clone()
    }

    /// The beacon with this color, created if needed.
    pub fn beacon(&self, color: TiltColor) -> Arc<VirtualBeacon> {
        self.registry()
            .beacons
            .entry(color)
            .or_insert_with(|| Arc::new(VirtualBeacon::new(color)))
            .clone()
    }

    /// The relay on this pin, created if needed.
    pub fn relay(&self, pin: &str) -> Arc<VirtualRelay> {
        self.registry()
            .relays
            .entry(pin.to_string())
            .or_insert_with(|| Arc::new(VirtualRelay::new(pin)))
            .clone()
    }

    fn ensure_plugged(&self, id: &str) -> Result<(), DeviceError> {
        if self.registry().unplugged.contains(id) {
            tracing::debug!(id, "virtual device is unplugged");
            return Err(DeviceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl Configurator for VirtualConfigurator {
    fn create_thermometer(&self, id: &str) -> Result<Arc<dyn Thermometer>, DeviceError> {
        self.ensure_plugged(id)?;
        Ok(self.thermometer(id))
    }

    fn create_beacon_hydrometer(
        &self,
        color: TiltColor,
    ) -> Result<Arc<dyn ThermometerAndHydrometer>, DeviceError> {
        self.ensure_plugged(color.as_str())?;
        Ok(self.beacon(color))
    }

    fn create_gpio_actuator(&self, pin: &str) -> Result<Arc<dyn Actuator>, DeviceError> {
        self.ensure_plugged(pin)?;
        Ok(self.relay(pin))
    }
}

#[cfg(test)]
mod tests {
    use fermhub_app::ports::Hydrometer;

    use super::*;

    #[test]
    fn should_hand_out_shared_thermometer() {
        let configurator = VirtualConfigurator::new();
        let created = configurator.create_thermometer("28-01").unwrap();
        configurator.thermometer("28-01").set_temperature(12.5);
        assert!((created.temperature().unwrap() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn should_start_thermometer_at_twenty_degrees() {
        let configurator = VirtualConfigurator::new();
        let thermometer = configurator.create_thermometer("28-02").unwrap();
        assert!((thermometer.temperature().unwrap() - INITIAL_TEMPERATURE).abs() < f64::EPSILON);
    }

    #[test]
    fn should_drive_registered_relay() {
        let configurator = VirtualConfigurator::new();
        let actuator = configurator.create_gpio_actuator("GPIO2").unwrap();
        actuator.on().unwrap();
        assert!(configurator.relay("GPIO2").is_on());
        assert_eq!(configurator.relay("GPIO2").pin(), "GPIO2");
    }

    #[test]
    fn should_share_beacon_between_thermometer_and_hydrometer_roles() {
        let configurator = VirtualConfigurator::new();
        let beacon = configurator.create_beacon_hydrometer(TiltColor::Red).unwrap();
        configurator.beacon(TiltColor::Red).broadcast(18.0, 1.050);
        assert!((beacon.temperature().unwrap() - 18.0).abs() < f64::EPSILON);
        assert!((beacon.gravity().unwrap() - 1.050).abs() < f64::EPSILON);
    }

    #[test]
    fn should_fail_to_create_unplugged_device() {
        let configurator = VirtualConfigurator::new();
        configurator.unplug("GPIO9");
        configurator.unplug("pink");
        assert!(matches!(
            configurator.create_gpio_actuator("GPIO9"),
            Err(DeviceError::NotFound(pin)) if pin == "GPIO9"
        ));
        assert!(configurator.create_beacon_hydrometer(TiltColor::Pink).is_err());
        assert!(configurator.create_gpio_actuator("GPIO2").is_ok());
    }
}
