//! Bang-bang controller with a dead band and compressor protection.

use std::sync::Mutex;
use std::time::Duration;

use fermhub_domain::error::FermHubError;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::{RunState, Wiring, beer_temperature, lock};

/// Last known output of each actuator.
///
/// `None` means unknown: the next request always writes. The chiller rest
/// period starts whenever a chiller that may have been running is confirmed
/// off, including after failed writes left its state unknown.
#[derive(Debug, Default)]
struct Outputs {
    chiller: Option<bool>,
    heater: Option<bool>,
    /// Set before every attempt to switch the chiller on, cleared once it is
    /// confirmed off.
    chiller_may_run: bool,
    chiller_off_at: Option<Instant>,
}

/// Hysteresis temperature controller.
///
/// Every cycle the beer temperature is compared to `setpoint ± band / 2`:
/// above the band the heater is switched off and the chiller on, below it the
/// chiller is switched off and the heater on, inside it nothing changes. The
/// chiller is only switched on again once it has rested for the cooldown.
pub struct HysteresisController {
    wiring: Wiring,
    band: f64,
    cycle_period: Duration,
    chiller_cooldown: Duration,
    error_backoff: Duration,
    setpoint: watch::Sender<f64>,
    run_state: RunState,
    outputs: Mutex<Outputs>,
}

impl HysteresisController {
    #[must_use]
    pub fn new(wiring: Wiring, band: f64) -> Self {
        Self {
            wiring,
            band,
            cycle_period: Duration::from_secs(10),
            chiller_cooldown: Duration::from_secs(10 * 60),
            error_backoff: Duration::from_secs(10),
            setpoint: watch::channel(0.0).0,
            run_state: RunState::default(),
            outputs: Mutex::new(Outputs::default()),
        }
    }

    #[must_use]
    pub fn cycle_period(mut self, period: Duration) -> Self {
        self.cycle_period = period;
        self
    }

    #[must_use]
    pub fn chiller_cooldown(mut self, cooldown: Duration) -> Self {
        self.chiller_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub(crate) fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    #[must_use]
    pub fn setpoint(&self) -> f64 {
        *self.setpoint.borrow()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Move the target. A running loop re-evaluates immediately.
    pub fn set_temperature(&self, setpoint: f64) {
        self.setpoint.send_replace(setpoint);
    }

    /// Regulate toward `setpoint` until `cancel` fires, then switch every
    /// actuator off.
    ///
    /// Read failures and actuator write failures are logged and retried after
    /// the error backoff.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`](fermhub_domain::error::ControlError) when
    /// the controller cannot start. A failed fail-safe shutdown is reported as
    /// `ControlError::Shutdown`.
    #[tracing::instrument(skip(self, cancel), fields(band = self.band))]
    pub async fn run(&self, cancel: CancellationToken, setpoint: f64) -> Result<(), FermHubError> {
        let _guard = self.run_state.try_start()?;
        let thermometer = self.wiring.check()?;
        self.setpoint.send_replace(setpoint);
        let mut updates = self.setpoint.subscribe();
        tracing::info!("hysteresis controller started");

        loop {
            let target = *updates.borrow_and_update();
            let wait = match beer_temperature(thermometer) {
                Ok(temperature) => {
                    if self.evaluate(temperature, target) {
                        self.cycle_period
                    } else {
                        self.error_backoff
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "could not read beer temperature");
                    self.error_backoff
                }
            };

            tokio::select! {
                () = cancel.cancelled() => break,
                () = sleep(wait) => {}
                _ = updates.changed() => tracing::debug!("setpoint changed"),
            }
        }

        tracing::info!("hysteresis controller stopping");
        self.shut_down()
    }

    /// Apply one decision. Returns `false` when an actuator write failed.
    fn evaluate(&self, temperature: f64, setpoint: f64) -> bool {
        let half_band = self.band / 2.0;
        if temperature > setpoint + half_band {
            tracing::debug!(temperature, setpoint, "above band, chilling");
            self.request_chilling()
        } else if temperature < setpoint - half_band {
            tracing::debug!(temperature, setpoint, "below band, heating");
            self.request_heating()
        } else {
            tracing::trace!(temperature, setpoint, "within band");
            true
        }
    }

    fn request_chilling(&self) -> bool {
        let heater_ok = self.switch_heater(false);
        let Some(chiller) = &self.wiring.chiller else {
            return heater_ok;
        };

        let mut outputs = lock(&self.outputs);
        if outputs.chiller == Some(true) {
            return heater_ok;
        }
        if let Some(off_at) = outputs.chiller_off_at {
            let rested = off_at.elapsed();
            if rested <= self.chiller_cooldown {
                tracing::debug!(
                    rested_secs = rested.as_secs(),
                    "chiller is cooling down, not switching on"
                );
                return heater_ok;
            }
        }
        outputs.chiller_may_run = true;
        match chiller.on() {
            Ok(()) => {
                outputs.chiller = Some(true);
                heater_ok
            }
            Err(error) => {
                tracing::error!(%error, "could not switch chiller on");
                outputs.chiller = None;
                false
            }
        }
    }

    fn request_heating(&self) -> bool {
        let chiller_ok = self.switch_chiller_off();
        self.switch_heater(true) && chiller_ok
    }

    fn switch_chiller_off(&self) -> bool {
        let Some(chiller) = &self.wiring.chiller else {
            return true;
        };
        let mut outputs = lock(&self.outputs);
        if outputs.chiller == Some(false) {
            return true;
        }
        match chiller.off() {
            Ok(()) => {
                if outputs.chiller_may_run {
                    outputs.chiller_off_at = Some(Instant::now());
                    outputs.chiller_may_run = false;
                }
                outputs.chiller = Some(false);
                true
            }
            Err(error) => {
                tracing::error!(%error, "could not switch chiller off");
                outputs.chiller = None;
                false
            }
        }
    }

    fn switch_heater(&self, on: bool) -> bool {
        let Some(heater) = &self.wiring.heater else {
            return true;
        };
        let mut outputs = lock(&self.outputs);
        if outputs.heater == Some(on) {
            return true;
        }
        let result = if on { heater.on() } else { heater.off() };
        match result {
            Ok(()) => {
                outputs.heater = Some(on);
                true
            }
            Err(error) => {
                tracing::error!(%error, on, "could not switch heater");
                outputs.heater = None;
                false
            }
        }
    }

    fn shut_down(&self) -> Result<(), FermHubError> {
        let result = self.wiring.switch_off();
        let mut outputs = lock(&self.outputs);
        if outputs.chiller_may_run {
            outputs.chiller_off_at = Some(Instant::now());
            // a failed switch-off leaves the chiller possibly running
            outputs.chiller_may_run = result.is_err();
        }
        outputs.chiller = None;
        outputs.heater = None;
        result.map_err(Into::into)
    }
}
