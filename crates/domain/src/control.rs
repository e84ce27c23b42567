//! Control settings — which temperature-control strategy a chamber uses, and
//! the timing constraints that protect the hardware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FermHubError, ValidationError};

/// Strategy selected for a chamber when it is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlSettings {
    /// Bang-bang control with a dead zone of `band` degrees centred on the
    /// setpoint.
    Hysteresis { band: f64 },
    /// Duty-cycle control with independent gains per actuator.
    Pid { chiller: PidGains, heater: PidGains },
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self::Hysteresis { band: 1.0 }
    }
}

impl ControlSettings {
    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::Validation`] when the hysteresis band is not a
    /// positive number or a PID gain is not finite.
    pub fn validate(&self) -> Result<(), FermHubError> {
        match *self {
            Self::Hysteresis { band } if !(band.is_finite() && band > 0.0) => {
                Err(ValidationError::NotPositive {
                    field: "band",
                    value: band,
                }
                .into())
            }
            Self::Hysteresis { .. } => Ok(()),
            Self::Pid { chiller, heater } => {
                chiller.validate()?;
                heater.validate()?;
                Ok(())
            }
        }
    }
}

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    #[must_use]
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NotFinite`] for a NaN or infinite gain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field, value });
            }
        }
        Ok(())
    }
}

/// Cycle periods and protective minimums shared by every chamber.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControlTiming {
    /// PWM period of the chiller under PID control, in seconds.
    pub chilling_cycle_secs: u64,
    /// PWM period of the heater under PID control, in seconds.
    pub heating_cycle_secs: u64,
    /// Minimum on-time of the chiller under PID control, in seconds.
    pub chilling_minimum_secs: u64,
    /// Minimum on-time of the heater under PID control, in seconds.
    pub heating_minimum_secs: u64,
    /// Period between two hysteresis evaluations, in seconds.
    pub hysteresis_cycle_secs: u64,
    /// Minimum rest time of the compressor between two chiller runs, in seconds.
    pub chiller_cooldown_secs: u64,
    /// Wait after a failed sensor read or actuator write, in seconds.
    pub error_backoff_secs: u64,
    /// Period between two sensor refreshes of a fermenting chamber, in seconds.
    pub readings_interval_secs: u64,
}

impl Default for ControlTiming {
    fn default() -> Self {
        Self {
            chilling_cycle_secs: 30 * 60,
            heating_cycle_secs: 10 * 60,
            chilling_minimum_secs: 10 * 60,
            heating_minimum_secs: 10,
            hysteresis_cycle_secs: 10,
            chiller_cooldown_secs: 10 * 60,
            error_backoff_secs: 10,
            readings_interval_secs: 60,
        }
    }
}

impl ControlTiming {
    #[must_use]
    pub fn chilling_cycle(&self) -> Duration {
        Duration::from_secs(self.chilling_cycle_secs)
    }

    #[must_use]
    pub fn heating_cycle(&self) -> Duration {
        Duration::from_secs(self.heating_cycle_secs)
    }

    #[must_use]
    pub fn chilling_minimum(&self) -> Duration {
        Duration::from_secs(self.chilling_minimum_secs)
    }

    #[must_use]
    pub fn heating_minimum(&self) -> Duration {
        Duration::from_secs(self.heating_minimum_secs)
    }

    #[must_use]
    pub fn hysteresis_cycle(&self) -> Duration {
        Duration::from_secs(self.hysteresis_cycle_secs)
    }

    #[must_use]
    pub fn chiller_cooldown(&self) -> Duration {
        Duration::from_secs(self.chiller_cooldown_secs)
    }

    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    #[must_use]
    pub fn readings_interval(&self) -> Duration {
        Duration::from_secs(self.readings_interval_secs)
    }

    /// Check that every period is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotPositive`] for a zero cycle period or
    /// backoff, which would make a control loop spin.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let periods = [
            ("chilling_cycle_secs", self.chilling_cycle_secs),
            ("heating_cycle_secs", self.heating_cycle_secs),
            ("hysteresis_cycle_secs", self.hysteresis_cycle_secs),
            ("error_backoff_secs", self.error_backoff_secs),
            ("readings_interval_secs", self.readings_interval_secs),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ValidationError::NotPositive { field, value: 0.0 });
            }
        }
        Ok(())
    }
}
