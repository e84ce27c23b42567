//! Device resolver — binds a chamber's declared devices to live capabilities.
//!
//! Resolution never stops at the first problem: every device and role is
//! inspected, whatever can be bound is bound, and all problems are returned
//! together in one [`InvalidConfigurationError`].

use std::collections::HashMap;
use std::sync::Arc;

use fermhub_domain::chamber::Readings;
use fermhub_domain::device::{DeviceConfig, DeviceRole, DeviceType, TiltColor};
use fermhub_domain::error::{ConfigurationProblem, DeviceError, InvalidConfigurationError};

use crate::control::Wiring;
use crate::ports::{Actuator, Configurator, Hydrometer, Thermometer, ThermometerAndHydrometer};

/// Live capability created for one device.
enum Capability {
    Thermometer(Arc<dyn Thermometer>),
    Beacon(Arc<dyn ThermometerAndHydrometer>),
    Actuator(Arc<dyn Actuator>),
}

/// Capabilities bound to the roles of a chamber.
#[derive(Clone, Default)]
pub struct ChamberDevices {
    pub beer_thermometer: Option<Arc<dyn Thermometer>>,
    pub auxiliary_thermometer: Option<Arc<dyn Thermometer>>,
    pub external_thermometer: Option<Arc<dyn Thermometer>>,
    pub hydrometer: Option<Arc<dyn Hydrometer>>,
    pub chiller: Option<Arc<dyn Actuator>>,
    pub heater: Option<Arc<dyn Actuator>>,
}

impl ChamberDevices {
    /// Resolve `configs` into capabilities using `configurator`.
    ///
    /// Returns the devices that could be bound, along with every problem
    /// found. A role is bound at most once: the first device declaring it
    /// wins and later ones are reported.
    pub fn resolve(
        configs: &[DeviceConfig],
        configurator: &impl Configurator,
    ) -> (Self, Option<InvalidConfigurationError>) {
        let mut devices = Self::default();
        let mut bound: HashMap<DeviceRole, &str> = HashMap::new();
        let mut problems = Vec::new();

        for config in configs {
            let mut roles = Vec::with_capacity(config.roles.len());
            for raw in &config.roles {
                let role = match raw.parse::<DeviceRole>() {
                    Ok(role) => role,
                    Err(unknown) => {
                        problems.push(ConfigurationProblem::UnknownRole {
                            device_id: config.id.clone(),
                            role: unknown.0,
                        });
                        continue;
                    }
                };
                if !config.device_type.supports(role) {
                    problems.push(ConfigurationProblem::UnsupportedRole {
                        device_id: config.id.clone(),
                        device_type: config.device_type.as_str(),
                        role: role.as_str(),
                    });
                    continue;
                }
                if let Some(bound_to) = bound.get(&role) {
                    problems.push(ConfigurationProblem::DuplicateRole {
                        device_id: config.id.clone(),
                        role: role.as_str(),
                        bound_to: (*bound_to).to_string(),
                    });
                    continue;
                }
                bound.insert(role, &config.id);
                roles.push(role);
            }

            let Some(&first_role) = roles.first() else {
                continue;
            };
            match create(config, configurator) {
                Ok(capability) => {
                    for role in roles {
                        devices.bind(role, &capability);
                    }
                }
                Err(source) => {
                    tracing::warn!(device_id = %config.id, %source, "could not create device");
                    problems.push(ConfigurationProblem::Device {
                        device_id: config.id.clone(),
                        role: first_role.as_str(),
                        source,
                    });
                }
            }
        }

        let error = (!problems.is_empty()).then_some(InvalidConfigurationError { problems });
        (devices, error)
    }

    fn bind(&mut self, role: DeviceRole, capability: &Capability) {
        let thermometer = || -> Option<Arc<dyn Thermometer>> {
            match capability {
                Capability::Thermometer(thermometer) => Some(thermometer.clone()),
                Capability::Beacon(beacon) => {
                    let thermometer: Arc<dyn Thermometer> = beacon.clone();
                    Some(thermometer)
                }
                Capability::Actuator(_) => None,
            }
        };
        let actuator = || match capability {
            Capability::Actuator(actuator) => Some(actuator.clone()),
            _ => None,
        };
        match role {
            DeviceRole::BeerThermometer => self.beer_thermometer = thermometer(),
            DeviceRole::AuxiliaryThermometer => self.auxiliary_thermometer = thermometer(),
            DeviceRole::ExternalThermometer => self.external_thermometer = thermometer(),
            DeviceRole::Hydrometer => {
                if let Capability::Beacon(beacon) = capability {
                    let hydrometer: Arc<dyn Hydrometer> = beacon.clone();
                    self.hydrometer = Some(hydrometer);
                }
            }
            DeviceRole::Chiller => self.chiller = actuator(),
            DeviceRole::Heater => self.heater = actuator(),
        }
    }

    /// The devices a temperature controller acts on.
    #[must_use]
    pub fn wiring(&self) -> Wiring {
        Wiring {
            thermometer: self.beer_thermometer.clone(),
            chiller: self.chiller.clone(),
            heater: self.heater.clone(),
        }
    }

    /// Sample every bound sensor. A failing sensor yields no value.
    #[must_use]
    pub fn readings(&self) -> Readings {
        fn sample(role: DeviceRole, sensor: Option<&Arc<dyn Thermometer>>) -> Option<f64> {
            sensor?
                .temperature()
                .inspect_err(|error| tracing::warn!(%role, %error, "could not read sensor"))
                .ok()
        }

        Readings {
            beer_temperature: sample(DeviceRole::BeerThermometer, self.beer_thermometer.as_ref()),
            auxiliary_temperature: sample(
                DeviceRole::AuxiliaryThermometer,
                self.auxiliary_thermometer.as_ref(),
            ),
            external_temperature: sample(
                DeviceRole::ExternalThermometer,
                self.external_thermometer.as_ref(),
            ),
            hydrometer_gravity: self.hydrometer.as_ref().and_then(|hydrometer| {
                hydrometer
                    .gravity()
                    .inspect_err(|error| tracing::warn!(%error, "could not read hydrometer"))
                    .ok()
            }),
        }
    }
}

fn create(
    config: &DeviceConfig,
    configurator: &impl Configurator,
) -> Result<Capability, DeviceError> {
    match config.device_type {
        DeviceType::Ds18b20 => configurator
            .create_thermometer(&config.id)
            .map(Capability::Thermometer),
        DeviceType::Tilt => {
            let color: TiltColor = config.id.parse()?;
            configurator
                .create_beacon_hydrometer(color)
                .map(Capability::Beacon)
        }
        DeviceType::Gpio => configurator
            .create_gpio_actuator(&config.id)
            .map(Capability::Actuator),
    }
}
