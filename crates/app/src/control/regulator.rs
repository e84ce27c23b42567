//! Discrete PID regulator with output clamping.

use std::time::Duration;

use fermhub_domain::control::PidGains;

/// Sign convention of the regulated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Output grows when the value is below the setpoint (heating).
    Direct,
    /// Output grows when the value is above the setpoint (chilling).
    Reverse,
}

/// PID regulator producing a duty percentage in `[min, max]`.
///
/// A non-positive error yields a zero output and discharges the integral, so a
/// path never stores demand accumulated while the other path was active.
#[derive(Debug, Clone)]
pub struct Regulator {
    gains: PidGains,
    action: Action,
    min: f64,
    max: f64,
    integral: f64,
    previous: Option<f64>,
}

impl Regulator {
    #[must_use]
    pub fn new(gains: PidGains, action: Action) -> Self {
        Self {
            gains,
            action,
            min: 0.0,
            max: 100.0,
            integral: 0.0,
            previous: None,
        }
    }

    /// Feed a new measurement taken `elapsed` after the previous one.
    pub fn update(&mut self, setpoint: f64, value: f64, elapsed: Duration) -> f64 {
        let dt = elapsed.as_secs_f64();
        let error = match self.action {
            Action::Direct => setpoint - value,
            Action::Reverse => value - setpoint,
        };
        // derivative on measurement: a setpoint step does not kick the output
        let derivative = match self.previous {
            Some(previous) if dt > 0.0 => match self.action {
                Action::Direct => (previous - value) / dt,
                Action::Reverse => (value - previous) / dt,
            },
            _ => 0.0,
        };
        self.previous = Some(value);

        if error <= 0.0 {
            self.integral = 0.0;
            return 0.0;
        }

        self.integral = (self.integral + self.gains.ki * error * dt).clamp(self.min, self.max);
        let output = self.gains.kp * error + self.integral + self.gains.kd * derivative;
        output.clamp(self.min, self.max)
    }
}
