//! Virtual thermometer — reports whatever temperature it was last given.

use std::sync::Mutex;

use fermhub_app::ports::Thermometer;
use fermhub_domain::error::DeviceError;

use super::lock;

/// A simulated one-wire thermometer.
///
/// A thermometer that has been [`disconnect`](Self::disconnect)ed fails every
/// read until a temperature is set again.
pub struct VirtualThermometer {
    id: String,
    temperature: Mutex<Option<f64>>,
}

impl VirtualThermometer {
    #[must_use]
    pub fn new(id: impl Into<String>, temperature: f64) -> Self {
        Self {
            id: id.into(),
            temperature: Mutex::new(Some(temperature)),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_temperature(&self, temperature: f64) {
        *lock(&self.temperature) = Some(temperature);
    }

    pub fn disconnect(&self) {
        *lock(&self.temperature) = None;
    }
}

impl Thermometer for VirtualThermometer {
    fn temperature(&self) -> Result<f64, DeviceError> {
        lock(&self.temperature).ok_or_else(|| DeviceError::NoReading(self.id.clone()))
    }
}
