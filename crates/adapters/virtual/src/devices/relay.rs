//! Virtual relay — remembers its output and how often it was switched on.

use std::sync::Mutex;

use fermhub_app::ports::Actuator;
use fermhub_domain::error::DeviceError;

use super::lock;

#[derive(Debug, Default)]
struct Output {
    on: bool,
    activations: usize,
}

/// A simulated GPIO relay.
pub struct VirtualRelay {
    pin: String,
    output: Mutex<Output>,
}

impl VirtualRelay {
    #[must_use]
    pub fn new(pin: impl Into<String>) -> Self {
        Self {
            pin: pin.into(),
            output: Mutex::new(Output::default()),
        }
    }

    #[must_use]
    pub fn pin(&self) -> &str {
        &self.pin
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        lock(&self.output).on
    }

    /// Number of off-to-on transitions since creation.
    #[must_use]
    pub fn activations(&self) -> usize {
        lock(&self.output).activations
    }

    fn switch(&self, on: bool) {
        let mut output = lock(&self.output);
        if output.on != on {
            tracing::debug!(pin = %self.pin, on, "virtual relay switched");
            if on {
                output.activations += 1;
            }
        }
        output.on = on;
    }
}

impl Actuator for VirtualRelay {
    fn on(&self) -> Result<(), DeviceError> {
        self.switch(true);
        Ok(())
    }

    fn off(&self) -> Result<(), DeviceError> {
        self.switch(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_off() {
        let relay = VirtualRelay::new("GPIO2");
        assert!(!relay.is_on());
        assert_eq!(relay.activations(), 0);
    }

    #[test]
    fn should_count_only_transitions_to_on() {
        let relay = VirtualRelay::new("GPIO2");
        relay.on().unwrap();
        relay.on().unwrap();
        relay.off().unwrap();
        relay.on().unwrap();
        assert!(relay.is_on());
        assert_eq!(relay.activations(), 2);
    }
}
