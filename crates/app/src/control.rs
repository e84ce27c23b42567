//! Temperature controllers.
//!
//! A controller drives a chamber's chiller and heater toward a setpoint read
//! from its beer thermometer. Two strategies exist:
//!
//! - [`HysteresisController`]: bang-bang switching around a dead band, with a
//!   compressor cooldown between chiller runs.
//! - [`PidController`]: one PID regulator per actuator, each turned into a
//!   duty cycle inside a fixed period with a minimum on-time.
//!
//! Both share the same lifecycle: [`TemperatureController::run`] loops until
//! its [`CancellationToken`] fires, the setpoint can be moved while running
//! with [`TemperatureController::set_temperature`], and every exit path
//! switches all actuators off.

pub mod hysteresis;
pub mod pid;
pub mod regulator;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fermhub_domain::control::{ControlSettings, ControlTiming};
use fermhub_domain::error::{ControlError, DeviceError, FermHubError};
use tokio_util::sync::CancellationToken;

use crate::ports::{Actuator, Thermometer};

pub use hysteresis::HysteresisController;
pub use pid::PidController;

/// Devices a controller acts on.
#[derive(Clone, Default)]
pub struct Wiring {
    pub thermometer: Option<Arc<dyn Thermometer>>,
    pub chiller: Option<Arc<dyn Actuator>>,
    pub heater: Option<Arc<dyn Actuator>>,
}

impl Wiring {
    /// Check that the controller has something to read and something to drive.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::ThermometerMissing`] without a thermometer and
    /// [`ControlError::ActuatorMissing`] when neither actuator is present.
    pub fn check(&self) -> Result<&Arc<dyn Thermometer>, ControlError> {
        let thermometer = self
            .thermometer
            .as_ref()
            .ok_or(ControlError::ThermometerMissing)?;
        if self.chiller.is_none() && self.heater.is_none() {
            return Err(ControlError::ActuatorMissing);
        }
        Ok(thermometer)
    }

    /// Switch every present actuator off, attempting all of them.
    fn switch_off(&self) -> Result<(), ControlError> {
        let errors: Vec<DeviceError> = [&self.chiller, &self.heater]
            .into_iter()
            .flatten()
            .filter_map(|actuator| actuator.off().err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            for error in &errors {
                tracing::error!(%error, "could not switch actuator off");
            }
            Err(ControlError::Shutdown(errors))
        }
    }
}

/// Read the beer temperature. A non-finite value counts as a failed read.
fn beer_temperature(thermometer: &Arc<dyn Thermometer>) -> Result<f64, DeviceError> {
    let temperature = thermometer.temperature()?;
    if temperature.is_finite() {
        Ok(temperature)
    } else {
        Err(DeviceError::InvalidReading(temperature))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Allows a single concurrent run per controller instance.
#[derive(Debug, Default)]
struct RunState {
    running: Mutex<bool>,
}

impl RunState {
    fn try_start(&self) -> Result<RunGuard<'_>, ControlError> {
        let mut running = lock(&self.running);
        if *running {
            return Err(ControlError::AlreadyRunning);
        }
        *running = true;
        Ok(RunGuard { state: self })
    }

    fn is_running(&self) -> bool {
        *lock(&self.running)
    }
}

/// Clears the running flag on every exit path, including a dropped future.
struct RunGuard<'a> {
    state: &'a RunState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.state.running) = false;
    }
}

/// Controller selected by a chamber's [`ControlSettings`].
#[derive(Clone)]
pub enum TemperatureController {
    Hysteresis(Arc<HysteresisController>),
    Pid(Arc<PidController>),
}

impl TemperatureController {
    /// Build the controller described by `settings` around `wiring`.
    #[must_use]
    pub fn from_settings(
        settings: &ControlSettings,
        timing: &ControlTiming,
        wiring: Wiring,
    ) -> Self {
        match *settings {
            ControlSettings::Hysteresis { band } => Self::Hysteresis(Arc::new(
                HysteresisController::new(wiring, band)
                    .cycle_period(timing.hysteresis_cycle())
                    .chiller_cooldown(timing.chiller_cooldown())
                    .error_backoff(timing.error_backoff()),
            )),
            ControlSettings::Pid { chiller, heater } => Self::Pid(Arc::new(
                PidController::new(wiring, chiller, heater)
                    .chilling(timing.chilling_cycle(), timing.chilling_minimum())
                    .heating(timing.heating_cycle(), timing.heating_minimum())
                    .error_backoff(timing.error_backoff()),
            )),
        }
    }

    /// Regulate toward `setpoint` until `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`HysteresisController::run`] and [`PidController::run`].
    pub async fn run(&self, cancel: CancellationToken, setpoint: f64) -> Result<(), FermHubError> {
        match self {
            Self::Hysteresis(controller) => controller.run(cancel, setpoint).await,
            Self::Pid(controller) => controller.run(cancel, setpoint).await,
        }
    }

    /// Move the target of a running controller. Never blocks.
    pub fn set_temperature(&self, setpoint: f64) {
        match self {
            Self::Hysteresis(controller) => controller.set_temperature(setpoint),
            Self::Pid(controller) => controller.set_temperature(setpoint),
        }
    }

    /// The target the controller regulates toward.
    #[must_use]
    pub fn setpoint(&self) -> f64 {
        match self {
            Self::Hysteresis(controller) => controller.setpoint(),
            Self::Pid(controller) => controller.setpoint(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        match self {
            Self::Hysteresis(controller) => controller.is_running(),
            Self::Pid(controller) => controller.is_running(),
        }
    }

    /// Check the wiring without running.
    ///
    /// # Errors
    ///
    /// See [`Wiring::check`].
    pub fn check_wiring(&self) -> Result<(), ControlError> {
        let wiring = match self {
            Self::Hysteresis(controller) => controller.wiring(),
            Self::Pid(controller) => controller.wiring(),
        };
        wiring.check().map(|_| ())
    }
}
