//! Chamber — an insulated enclosure with its own heating/cooling hardware.
//!
//! [`Chamber`] is the persisted definition. The live controller and device
//! handles belong to the application layer, which wraps a chamber while it is
//! registered.

use serde::{Deserialize, Serialize};

use crate::batch::{Batch, FermentationStep};
use crate::control::ControlSettings;
use crate::device::DeviceConfig;
use crate::error::{FermHubError, FermentationError, ValidationError};
use crate::id::ChamberId;
use crate::time::{self, Timestamp};

/// Persisted definition of a fermentation chamber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chamber {
    /// Assigned on deserialization when absent.
    #[serde(default)]
    pub id: ChamberId,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub control: ControlSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_batch: Option<Batch>,
    /// 1-based position of the active step in the batch schedule, 0 when the
    /// chamber is not fermenting.
    #[serde(default)]
    pub current_fermentation_step: u32,
    #[serde(default = "time::now")]
    pub mod_time: Timestamp,
}

impl Chamber {
    /// Create a builder for constructing a [`Chamber`].
    #[must_use]
    pub fn builder() -> ChamberBuilder {
        ChamberBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::Validation`] when `name` is empty or the
    /// control settings are unusable.
    pub fn validate(&self) -> Result<(), FermHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.control.validate()
    }

    #[must_use]
    pub fn is_fermenting(&self) -> bool {
        self.current_fermentation_step > 0
    }

    /// The active fermentation step, if any.
    #[must_use]
    pub fn current_step(&self) -> Option<&FermentationStep> {
        self.current_batch
            .as_ref()?
            .step_at(self.current_fermentation_step)
    }

    /// Resolve a step label against the current batch.
    ///
    /// # Errors
    ///
    /// Returns [`FermentationError::NoCurrentBatch`] without a batch and
    /// [`FermentationError::InvalidStep`] when no step carries `label`.
    pub fn resolve_step(&self, label: &str) -> Result<(u32, &FermentationStep), FermentationError> {
        let batch = self
            .current_batch
            .as_ref()
            .ok_or(FermentationError::NoCurrentBatch)?;
        batch
            .find_step(label)
            .ok_or_else(|| FermentationError::InvalidStep(label.to_string()))
    }
}

/// Step-by-step builder for [`Chamber`].
#[derive(Debug, Default)]
pub struct ChamberBuilder {
    id: Option<ChamberId>,
    name: Option<String>,
    devices: Vec<DeviceConfig>,
    control: ControlSettings,
    current_batch: Option<Batch>,
}

impl ChamberBuilder {
    #[must_use]
    pub fn id(mut self, id: ChamberId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.devices.push(device);
        self
    }

    #[must_use]
    pub fn control(mut self, control: ControlSettings) -> Self {
        self.control = control;
        self
    }

    #[must_use]
    pub fn current_batch(mut self, batch: Batch) -> Self {
        self.current_batch = Some(batch);
        self
    }

    /// Consume the builder, validate, and return a [`Chamber`].
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::Validation`] if `name` is missing or empty.
    pub fn build(self) -> Result<Chamber, FermHubError> {
        let chamber = Chamber {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            devices: self.devices,
            control: self.control,
            current_batch: self.current_batch,
            current_fermentation_step: 0,
            mod_time: time::now(),
        };
        chamber.validate()?;
        Ok(chamber)
    }
}

/// Latest sample of every sensor bound to a chamber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beer_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydrometer_gravity: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Fermentation, Recipe};
    use crate::device::{DeviceRole, DeviceType};

    fn batch() -> Batch {
        Batch {
            id: "b1".to_string(),
            number: 1,
            recipe: Recipe {
                name: "Saison".to_string(),
                fermentation: Fermentation {
                    name: "Saison".to_string(),
                    steps: vec![
                        FermentationStep::new("Primary", 22.0, 7),
                        FermentationStep::new("Secondary", 20.0, 7),
                    ],
                },
                original_gravity: 1.060,
                final_gravity: 1.004,
            },
        }
    }

    #[test]
    fn should_build_chamber_that_is_not_fermenting() {
        let chamber = Chamber::builder()
            .name("Fermenter 1")
            .device(DeviceConfig::new(
                "GPIO2",
                DeviceType::Gpio,
                &[DeviceRole::Chiller],
            ))
            .build()
            .unwrap();
        assert_eq!(chamber.devices.len(), 1);
        assert!(!chamber.is_fermenting());
        assert!(chamber.current_step().is_none());
    }

    #[test]
    fn should_return_validation_error_when_name_is_blank() {
        let result = Chamber::builder().name("  ").build();
        assert!(matches!(
            result,
            Err(FermHubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_report_no_current_batch_when_resolving_without_batch() {
        let chamber = Chamber::builder().name("Fermenter").build().unwrap();
        assert_eq!(
            chamber.resolve_step("Primary").unwrap_err(),
            FermentationError::NoCurrentBatch
        );
    }

    #[test]
    fn should_report_invalid_step_for_unknown_label() {
        let chamber = Chamber::builder()
            .name("Fermenter")
            .current_batch(batch())
            .build()
            .unwrap();
        assert_eq!(
            chamber.resolve_step("Diacetyl Rest").unwrap_err(),
            FermentationError::InvalidStep("Diacetyl Rest".to_string())
        );
    }

    #[test]
    fn should_expose_current_step_from_position() {
        let mut chamber = Chamber::builder()
            .name("Fermenter")
            .current_batch(batch())
            .build()
            .unwrap();
        chamber.current_fermentation_step = 2;
        assert!(chamber.is_fermenting());
        assert_eq!(chamber.current_step().unwrap().name, "Secondary");
    }

    #[test]
    fn should_assign_id_when_absent_from_json() {
        let chamber: Chamber = serde_json::from_str(r#"{"name": "Keezer"}"#).unwrap();
        assert_eq!(chamber.name, "Keezer");
        assert_eq!(chamber.control, ControlSettings::default());
        assert_eq!(chamber.current_fermentation_step, 0);
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let chamber = Chamber::builder()
            .name("Fermenter")
            .current_batch(batch())
            .build()
            .unwrap();
        let json = serde_json::to_string(&chamber).unwrap();
        let parsed: Chamber = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, chamber);
    }

    #[test]
    fn should_omit_missing_readings() {
        let readings = Readings {
            beer_temperature: Some(19.5),
            ..Readings::default()
        };
        let json = serde_json::to_value(readings).unwrap();
        assert_eq!(json, serde_json::json!({"beerTemperature": 19.5}));
    }
}
