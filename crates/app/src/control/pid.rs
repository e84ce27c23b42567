//! Duty-cycle controller driven by two PID regulators.

use std::sync::Arc;
use std::time::Duration;

use fermhub_domain::control::PidGains;
use fermhub_domain::error::FermHubError;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::regulator::{Action, Regulator};
use super::{RunState, Wiring, beer_temperature};
use crate::ports::{Actuator, Thermometer};

/// PWM period and minimum on-time of one actuator.
#[derive(Debug, Clone, Copy)]
struct DutyCycle {
    period: Duration,
    minimum: Duration,
}

impl DutyCycle {
    /// On-time for a regulator output in percent.
    ///
    /// A non-zero on-time shorter than the minimum is raised to the minimum.
    /// A non-finite output yields no on-time.
    fn on_time(self, output: f64) -> Duration {
        if !output.is_finite() {
            return Duration::ZERO;
        }
        let on_time = self.period.mul_f64((output / 100.0).clamp(0.0, 1.0));
        if !on_time.is_zero() && on_time < self.minimum {
            self.minimum.min(self.period)
        } else {
            on_time
        }
    }
}

/// PID temperature controller.
///
/// The chiller and the heater each run their own cycle: sample the beer
/// temperature, compute a duty percentage, keep the actuator on for that share
/// of the period, then off for the rest. The chiller path is reverse acting,
/// the heater path direct acting, so at most one of them asks for a non-zero
/// duty for a given reading.
pub struct PidController {
    wiring: Wiring,
    chiller_gains: PidGains,
    heater_gains: PidGains,
    chilling: DutyCycle,
    heating: DutyCycle,
    error_backoff: Duration,
    setpoint: watch::Sender<f64>,
    run_state: RunState,
}

impl PidController {
    #[must_use]
    pub fn new(wiring: Wiring, chiller_gains: PidGains, heater_gains: PidGains) -> Self {
        Self {
            wiring,
            chiller_gains,
            heater_gains,
            chilling: DutyCycle {
                period: Duration::from_secs(30 * 60),
                minimum: Duration::from_secs(10 * 60),
            },
            heating: DutyCycle {
                period: Duration::from_secs(10 * 60),
                minimum: Duration::from_secs(10),
            },
            error_backoff: Duration::from_secs(10),
            setpoint: watch::channel(0.0).0,
            run_state: RunState::default(),
        }
    }

    #[must_use]
    pub fn chilling(mut self, period: Duration, minimum: Duration) -> Self {
        self.chilling = DutyCycle { period, minimum };
        self
    }

    #[must_use]
    pub fn heating(mut self, period: Duration, minimum: Duration) -> Self {
        self.heating = DutyCycle { period, minimum };
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

    /// Move the target. A cycle waiting in its off phase restarts immediately.
    pub fn set_temperature(&self, setpoint: f64) {
        self.setpoint.send_replace(setpoint);
    }

    /// Run both duty cycles until `cancel` fires.
    ///
    /// An actuator that is on when cancellation arrives stays on until its
    /// minimum on-time has elapsed, then every actuator is switched off. A
    /// missing chiller or heater simply has no cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlError`](fermhub_domain::error::ControlError) when
    /// the controller cannot start. A failed fail-safe shutdown is reported as
    /// `ControlError::Shutdown`.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn run(&self, cancel: CancellationToken, setpoint: f64) -> Result<(), FermHubError> {
        let _guard = self.run_state.try_start()?;
        let thermometer = self.wiring.check()?;
        self.setpoint.send_replace(setpoint);
        tracing::info!("pid controller started");

        let chilling = async {
            if let Some(chiller) = &self.wiring.chiller {
                let regulator = Regulator::new(self.chiller_gains, Action::Reverse);
                self.cycle("chiller", regulator, self.chilling, thermometer, chiller, &cancel)
                    .await;
            }
        };
        let heating = async {
            if let Some(heater) = &self.wiring.heater {
                let regulator = Regulator::new(self.heater_gains, Action::Direct);
                self.cycle("heater", regulator, self.heating, thermometer, heater, &cancel)
                    .await;
            }
        };
        tokio::join!(chilling, heating);

        tracing::info!("pid controller stopping");
        self.wiring.switch_off().map_err(Into::into)
    }

    #[tracing::instrument(skip_all, fields(actuator = name))]
    async fn cycle(
        &self,
        name: &'static str,
        mut regulator: Regulator,
        duty: DutyCycle,
        thermometer: &Arc<dyn Thermometer>,
        actuator: &Arc<dyn Actuator>,
        cancel: &CancellationToken,
    ) {
        let mut updates = self.setpoint.subscribe();
        let mut last_sample = Instant::now();

        loop {
            let temperature = match beer_temperature(thermometer) {
                Ok(temperature) => temperature,
                Err(error) => {
                    tracing::warn!(%error, "could not read beer temperature");
                    if self.back_off(cancel).await {
                        continue;
                    }
                    return;
                }
            };

            let setpoint = *updates.borrow_and_update();
            let now = Instant::now();
            let output = regulator.update(setpoint, temperature, now - last_sample);
            last_sample = now;

            let on_time = duty.on_time(output);
            let off_time = duty.period.saturating_sub(on_time);
            tracing::debug!(
                temperature,
                setpoint,
                output,
                on_secs = on_time.as_secs_f64(),
                off_secs = off_time.as_secs_f64(),
                "duty cycle computed"
            );

            if !on_time.is_zero() {
                if let Err(error) = actuator.on() {
                    tracing::error!(%error, "could not switch actuator on");
                    if self.back_off(cancel).await {
                        continue;
                    }
                    return;
                }
                let switched_on = Instant::now();
                tokio::select! {
                    () = cancel.cancelled() => {
                        let held = switched_on.elapsed();
                        if held < duty.minimum {
                            tracing::debug!("holding actuator until its minimum on-time");
                            sleep(duty.minimum - held).await;
                        }
                        return;
                    }
                    () = sleep(on_time) => {}
                }
            }

            if !off_time.is_zero() {
                if let Err(error) = actuator.off() {
                    tracing::error!(%error, "could not switch actuator off");
                    if self.back_off(cancel).await {
                        continue;
                    }
                    return;
                }
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(off_time) => {}
                    _ = updates.changed() => tracing::debug!("setpoint changed, restarting cycle"),
                }
            }
        }
    }

    /// Wait for the error backoff. Returns `false` when cancelled meanwhile.
    async fn back_off(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            () = cancel.cancelled() => false,
            () = sleep(self.error_backoff) => true,
        }
    }
}
