//! Virtual beacon hydrometer.

use std::sync::Mutex;

use fermhub_app::ports::{Hydrometer, Thermometer};
use fermhub_domain::device::TiltColor;
use fermhub_domain::error::DeviceError;

use super::lock;

#[derive(Debug, Clone, Copy)]
struct Broadcast {
    temperature: f64,
    gravity: f64,
}

/// A simulated floating hydrometer. Starts silent: reads fail until the first
/// broadcast is received.
pub struct VirtualBeacon {
    color: TiltColor,
    last: Mutex<Option<Broadcast>>,
}

impl VirtualBeacon {
    #[must_use]
    pub fn new(color: TiltColor) -> Self {
        Self {
            color,
            last: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn color(&self) -> TiltColor {
        self.color
    }

    /// Simulate a received broadcast.
    pub fn broadcast(&self, temperature: f64, gravity: f64) {
        *lock(&self.last) = Some(Broadcast {
            temperature,
            gravity,
        });
    }

    fn last(&self) -> Result<Broadcast, DeviceError> {
        lock(&self.last).ok_or_else(|| DeviceError::NoReading(self.color.to_string()))
    }
}

impl Thermometer for VirtualBeacon {
    fn temperature(&self) -> Result<f64, DeviceError> {
        self.last().map(|broadcast| broadcast.temperature)
    }
}

impl Hydrometer for VirtualBeacon {
    fn gravity(&self) -> Result<f64, DeviceError> {
        self.last().map(|broadcast| broadcast.gravity)
    }
}
