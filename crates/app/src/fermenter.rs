//! Fermenter — a registered chamber with its devices and controller.
//!
//! The fermenter owns the fermentation state machine of one chamber:
//!
//! ```text
//! Idle --start(step)--> Fermenting --start(other step)--> Fermenting (retarget)
//!  ^                        |
//!  +-------- stop ----------+
//! ```
//!
//! While fermenting, exactly one control task runs for the chamber. Stopping
//! cancels it without waiting; the cancelled task is kept and chained before the
//! next task so two runs never drive the same actuators at once. The same task
//! refreshes the chamber's readings on a fixed interval.

use std::time::Duration;

use fermhub_domain::chamber::{Chamber, Readings};
use fermhub_domain::control::ControlTiming;
use fermhub_domain::error::{FermHubError, FermentationError, InvalidConfigurationError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::control::TemperatureController;
use crate::devices::ChamberDevices;
use crate::ports::Configurator;

struct ControlTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live counterpart of a persisted [`Chamber`].
pub struct Fermenter {
    chamber: Chamber,
    devices: ChamberDevices,
    controller: TemperatureController,
    task: Option<ControlTask>,
    draining: Option<JoinHandle<()>>,
    readings_interval: Duration,
    latest: watch::Receiver<Option<Readings>>,
}

impl Fermenter {
    /// Resolve the chamber's devices and build its controller.
    ///
    /// The fermenter is always returned, even when some devices could not be
    /// bound; such a chamber is registered but refuses to start.
    pub fn configure(
        mut chamber: Chamber,
        configurator: &impl Configurator,
        timing: &ControlTiming,
    ) -> (Self, Option<InvalidConfigurationError>) {
        let (devices, error) = ChamberDevices::resolve(&chamber.devices, configurator);
        let controller =
            TemperatureController::from_settings(&chamber.control, timing, devices.wiring());
        chamber.current_fermentation_step = 0;
        let fermenter = Self {
            chamber,
            devices,
            controller,
            task: None,
            draining: None,
            readings_interval: timing.readings_interval(),
            latest: watch::channel(None).1,
        };
        (fermenter, error)
    }

    #[must_use]
    pub fn chamber(&self) -> &Chamber {
        &self.chamber
    }

    #[must_use]
    pub fn devices(&self) -> &ChamberDevices {
        &self.devices
    }

    #[must_use]
    pub fn is_fermenting(&self) -> bool {
        self.task.is_some()
    }

    /// Target temperature of the running controller, if fermenting.
    #[must_use]
    pub fn setpoint(&self) -> Option<f64> {
        self.task.as_ref().map(|_| self.controller.setpoint())
    }

    /// Start fermenting at the step labelled `step`, or move a running
    /// fermentation to it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`FermentationError::NoCurrentBatch`] / [`FermentationError::InvalidStep`]
    ///   when the step cannot be resolved.
    /// - [`ControlError`](fermhub_domain::error::ControlError) when the chamber
    ///   has no beer thermometer or no actuator.
    pub fn start_fermentation(&mut self, step: &str) -> Result<(), FermHubError> {
        let (position, resolved) = self.chamber.resolve_step(step)?;
        let temperature = resolved.temperature;

        if self.task.is_some() {
            tracing::info!(
                chamber = %self.chamber.name,
                step,
                temperature,
                "changing fermentation step"
            );
            self.controller.set_temperature(temperature);
        } else {
            self.controller.check_wiring()?;
            self.controller.set_temperature(temperature);
            tracing::info!(
                chamber = %self.chamber.name,
                step,
                temperature,
                "starting fermentation"
            );
            self.task = Some(self.spawn(temperature));
        }
        self.chamber.current_fermentation_step = position;
        Ok(())
    }

    /// Stop the running fermentation. Returns without waiting for the
    /// controller to wind down.
    ///
    /// # Errors
    ///
    /// Returns [`FermentationError::NotFermenting`] when idle.
    pub fn stop_fermentation(&mut self) -> Result<(), FermHubError> {
        let task = self.task.take().ok_or(FermentationError::NotFermenting)?;
        tracing::info!(chamber = %self.chamber.name, "stopping fermentation");
        task.cancel.cancel();
        self.draining = Some(task.handle);
        self.chamber.current_fermentation_step = 0;
        Ok(())
    }

    #[must_use]
    pub fn readings(&self) -> Readings {
        self.devices.readings()
    }

    /// Readings from the last periodic refresh. Kept after the fermentation
    /// stops, `None` until a fermentation has started.
    #[must_use]
    pub fn latest_readings(&self) -> Option<Readings> {
        *self.latest.borrow()
    }

    /// Hand over the task still winding down, so a replacement fermenter can
    /// wait for it.
    pub(crate) fn take_draining(&mut self) -> Option<JoinHandle<()>> {
        self.draining.take()
    }

    pub(crate) fn inherit_draining(&mut self, draining: Option<JoinHandle<()>>) {
        self.draining = draining;
    }

    fn spawn(&mut self, setpoint: f64) -> ControlTask {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.controller.clone();
        let devices = self.devices.clone();
        let period = self.readings_interval;
        let previous = self.draining.take();
        let chamber = self.chamber.name.clone();
        let (publish, latest) = watch::channel(None);
        self.latest = latest;

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous
                && let Err(error) = previous.await
            {
                tracing::warn!(%chamber, %error, "previous control task did not finish cleanly");
            }
            let refresh = refresh_readings(&chamber, &devices, period, &token, &publish);
            let (result, ()) = tokio::join!(controller.run(token.clone(), setpoint), refresh);
            match result {
                Ok(()) => tracing::info!(%chamber, "temperature controller stopped"),
                Err(error) => tracing::error!(%chamber, %error, "temperature controller failed"),
            }
        });
        ControlTask { cancel, handle }
    }
}

/// Sample every sensor each `period` until `cancel` fires, starting at once.
async fn refresh_readings(
    chamber: &str,
    devices: &ChamberDevices,
    period: Duration,
    cancel: &CancellationToken,
    publish: &watch::Sender<Option<Readings>>,
) {
    // a zero period would panic
    let mut ticks = interval(period.max(Duration::from_millis(1)));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = ticks.tick() => {}
        }
        let readings = devices.readings();
        tracing::info!(
            chamber,
            beer_temperature = readings.beer_temperature,
            auxiliary_temperature = readings.auxiliary_temperature,
            external_temperature = readings.external_temperature,
            hydrometer_gravity = readings.hydrometer_gravity,
            "readings refreshed"
        );
        publish.send_replace(Some(readings));
    }
}

impl Drop for Fermenter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel.cancel();
        }
    }
}
