//! In-memory fakes shared by the unit tests of this crate.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use fermhub_domain::chamber::Chamber;
use fermhub_domain::device::TiltColor;
use fermhub_domain::error::{DeviceError, FermHubError};
use fermhub_domain::id::ChamberId;

use crate::ports::{
    Actuator, ChamberRepository, Configurator, Hydrometer, Thermometer, ThermometerAndHydrometer,
};

pub struct FakeThermometer {
    value: Mutex<Option<f64>>,
}

impl FakeThermometer {
    pub fn shared(value: f64) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(Some(value)),
        })
    }

    pub fn set(&self, value: f64) {
        *self.value.lock().unwrap() = Some(value);
    }

    pub fn fail(&self) {
        *self.value.lock().unwrap() = None;
    }
}

impl Thermometer for FakeThermometer {
    fn temperature(&self) -> Result<f64, DeviceError> {
        self.value
            .lock()
            .unwrap()
            .ok_or_else(|| DeviceError::NoReading("fake".to_string()))
    }
}

pub struct FakeBeacon {
    temperature: f64,
    gravity: f64,
}

impl Thermometer for FakeBeacon {
    fn temperature(&self) -> Result<f64, DeviceError> {
        Ok(self.temperature)
    }
}

impl Hydrometer for FakeBeacon {
    fn gravity(&self) -> Result<f64, DeviceError> {
        Ok(self.gravity)
    }
}

#[derive(Default)]
struct Switches {
    on: bool,
    on_count: usize,
    failing: bool,
}

#[derive(Default)]
pub struct FakeActuator {
    switches: Mutex<Switches>,
}

impl FakeActuator {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_on(&self) -> bool {
        self.switches.lock().unwrap().on
    }

    pub fn on_count(&self) -> usize {
        self.switches.lock().unwrap().on_count
    }

    pub fn fail_writes(&self, failing: bool) {
        self.switches.lock().unwrap().failing = failing;
    }

    fn write(&self, on: bool) -> Result<(), DeviceError> {
        let mut switches = self.switches.lock().unwrap();
        if switches.failing {
            return Err(DeviceError::NotFound("fake".to_string()));
        }
        if on && !switches.on {
            switches.on_count += 1;
        }
        switches.on = on;
        Ok(())
    }
}

impl Actuator for FakeActuator {
    fn on(&self) -> Result<(), DeviceError> {
        self.write(true)
    }

    fn off(&self) -> Result<(), DeviceError> {
        self.write(false)
    }
}

/// Hands out fakes keyed by device id and remembers them for inspection.
#[derive(Default)]
pub struct FakeConfigurator {
    thermometers: Mutex<BTreeMap<String, Arc<FakeThermometer>>>,
    actuators: Mutex<BTreeMap<String, Arc<FakeActuator>>>,
    missing: HashSet<String>,
}

impl FakeConfigurator {
    /// A configurator that fails for every id in `missing`.
    pub fn without(missing: &[&str]) -> Self {
        Self {
            missing: missing.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn thermometer(&self, id: &str) -> Arc<FakeThermometer> {
        self.thermometers
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(|| FakeThermometer::shared(20.0))
            .clone()
    }

    pub fn actuator(&self, id: &str) -> Arc<FakeActuator> {
        self.actuators
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_insert_with(FakeActuator::shared)
            .clone()
    }

    fn check(&self, id: &str) -> Result<(), DeviceError> {
        if self.missing.contains(id) {
            Err(DeviceError::NotFound(id.to_string()))
        } else {
            Ok(())
        }
    }
}

impl Configurator for FakeConfigurator {
    fn create_thermometer(&self, id: &str) -> Result<Arc<dyn Thermometer>, DeviceError> {
        self.check(id)?;
        Ok(self.thermometer(id))
    }

    fn create_beacon_hydrometer(
        &self,
        color: TiltColor,
    ) -> Result<Arc<dyn ThermometerAndHydrometer>, DeviceError> {
        self.check(color.as_str())?;
        Ok(Arc::new(FakeBeacon {
            temperature: 19.5,
            gravity: 1.012,
        }))
    }

    fn create_gpio_actuator(&self, pin: &str) -> Result<Arc<dyn Actuator>, DeviceError> {
        self.check(pin)?;
        Ok(self.actuator(pin))
    }
}

#[derive(Default)]
pub struct InMemoryChamberRepository {
    chambers: Mutex<BTreeMap<ChamberId, Chamber>>,
    failing: Mutex<bool>,
}

impl InMemoryChamberRepository {
    pub fn with(chambers: Vec<Chamber>) -> Self {
        let repo = Self::default();
        repo.chambers
            .lock()
            .unwrap()
            .extend(chambers.into_iter().map(|chamber| (chamber.id, chamber)));
        repo
    }

    pub fn stored(&self, id: ChamberId) -> Option<Chamber> {
        self.chambers.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_writes(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), FermHubError> {
        if *self.failing.lock().unwrap() {
            Err(FermHubError::Storage("disk full".into()))
        } else {
            Ok(())
        }
    }
}

impl ChamberRepository for InMemoryChamberRepository {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Chamber>, FermHubError>> + Send {
        let result: Vec<Chamber> = self.chambers.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn get_by_id(
        &self,
        id: ChamberId,
    ) -> impl Future<Output = Result<Option<Chamber>, FermHubError>> + Send {
        let result = self.stored(id);
        async { Ok(result) }
    }

    fn save(&self, chamber: Chamber) -> impl Future<Output = Result<Chamber, FermHubError>> + Send {
        let result = self.check().map(|()| {
            self.chambers
                .lock()
                .unwrap()
                .insert(chamber.id, chamber.clone());
            chamber
        });
        async { result }
    }

    fn delete(&self, id: ChamberId) -> impl Future<Output = Result<(), FermHubError>> + Send {
        let result = self.check().map(|()| {
            self.chambers.lock().unwrap().remove(&id);
        });
        async { result }
    }
}
