//! Common error types used across the workspace.
//!
//! Every layer converts its own failures into [`FermHubError`] through
//! `#[from]` conversions. Sentinel conditions (not found, fermenting, invalid
//! step, …) are dedicated variants so callers can branch on them with
//! `matches!` instead of inspecting messages.

use std::error::Error as StdError;

/// Top-level error shared by the domain, application and adapter crates.
#[derive(Debug, thiserror::Error)]
pub enum FermHubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Fermentation(#[from] FermentationError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Configuration(#[from] InvalidConfigurationError),

    #[error("device error")]
    Device(#[from] DeviceError),

    /// Failure reported by a persistence adapter.
    #[error("storage error")]
    Storage(#[source] Box<dyn StdError + Send + Sync>),
}

/// Domain invariant violations detected while building or saving a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Rejected fermentation state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FermentationError {
    #[error("chamber does not have a current batch")]
    NoCurrentBatch,

    #[error("invalid step {0:?}")]
    InvalidStep(String),

    #[error("fermentation has not started")]
    NotFermenting,

    #[error("fermentation has started")]
    Fermenting,
}

/// Failures of a temperature controller run.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("temperature controller is already running")]
    AlreadyRunning,

    #[error("thermometer is not configured")]
    ThermometerMissing,

    #[error("no actuator is configured")]
    ActuatorMissing,

    /// The fail-safe shutdown could not switch every actuator off.
    #[error("{} actuator(s) could not be switched off", .0.len())]
    Shutdown(Vec<DeviceError>),
}

/// Errors raised by a physical or simulated device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device {0} not found")]
    NotFound(String),

    #[error("device {0} has not reported a value yet")]
    NoReading(String),

    #[error("device reported an unusable value {0}")]
    InvalidReading(f64),

    #[error("invalid beacon color {0:?}")]
    InvalidColor(String),

    #[error("io error on device {device}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single reason why part of a chamber's device configuration failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationProblem {
    #[error("device {device_id}: unknown role {role:?}")]
    UnknownRole { device_id: String, role: String },

    #[error("device {device_id}: a {device_type} device cannot act as {role}")]
    UnsupportedRole {
        device_id: String,
        device_type: &'static str,
        role: &'static str,
    },

    #[error("device {device_id}: role {role} is already bound to device {bound_to}")]
    DuplicateRole {
        device_id: String,
        role: &'static str,
        bound_to: String,
    },

    #[error("device {device_id}: could not create {role}")]
    Device {
        device_id: String,
        role: &'static str,
        #[source]
        source: DeviceError,
    },
}

/// Aggregated device configuration failure.
///
/// Configuration never stops at the first problem; every problem found while
/// resolving a chamber is collected here.
#[derive(Debug, thiserror::Error)]
#[error("configuration is invalid ({} problem(s))", .problems.len())]
pub struct InvalidConfigurationError {
    pub problems: Vec<ConfigurationProblem>,
}

impl InvalidConfigurationError {
    /// Every problem found, in device declaration order.
    #[must_use]
    pub fn problems(&self) -> &[ConfigurationProblem] {
        &self.problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Chamber",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Chamber abc not found");
    }

    #[test]
    fn should_keep_sentinel_variant_when_converted() {
        let err: FermHubError = FermentationError::NoCurrentBatch.into();
        assert!(matches!(
            err,
            FermHubError::Fermentation(FermentationError::NoCurrentBatch)
        ));
        assert_eq!(err.to_string(), "chamber does not have a current batch");
    }

    #[test]
    fn should_count_problems_in_configuration_message() {
        let err = InvalidConfigurationError {
            problems: vec![
                ConfigurationProblem::UnknownRole {
                    device_id: "28-0001".to_string(),
                    role: "blender".to_string(),
                },
                ConfigurationProblem::UnsupportedRole {
                    device_id: "GPIO2".to_string(),
                    device_type: "gpio",
                    role: "hydrometer",
                },
            ],
        };
        assert_eq!(err.to_string(), "configuration is invalid (2 problem(s))");
        assert_eq!(err.problems().len(), 2);
    }

    #[test]
    fn should_expose_device_error_as_source_of_problem() {
        let problem = ConfigurationProblem::Device {
            device_id: "orange".to_string(),
            role: "hydrometer",
            source: DeviceError::InvalidColor("orange".to_string()),
        };
        let source = StdError::source(&problem).unwrap();
        assert_eq!(source.to_string(), "invalid beacon color \"orange\"");
    }

    #[test]
    fn should_count_failed_actuators_in_shutdown_error() {
        let err = ControlError::Shutdown(vec![DeviceError::NotFound("GPIO2".to_string())]);
        assert_eq!(err.to_string(), "1 actuator(s) could not be switched off");
    }
}
