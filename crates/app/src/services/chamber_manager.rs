//! Chamber manager — registry of live chambers and entry point for every
//! chamber use-case.
//!
//! The registry is guarded by a single async read-write lock. Queries take the
//! read side; saves, deletes and fermentation transitions take the write side,
//! which serializes them per manager. Saves and deletes keep the write side
//! across the repository call, so the idle check and the write are atomic.
//! Sensor IO for readings happens after the lock is released.

use std::collections::HashMap;

use fermhub_domain::chamber::{Chamber, Readings};
use fermhub_domain::control::ControlTiming;
use fermhub_domain::error::{
    FermHubError, FermentationError, InvalidConfigurationError, NotFoundError,
};
use fermhub_domain::id::ChamberId;
use fermhub_domain::time;
use tokio::sync::RwLock;

use crate::fermenter::Fermenter;
use crate::ports::{ChamberRepository, Configurator};

/// A chamber whose devices could not all be configured at boot.
#[derive(Debug)]
pub struct ConfigurationFailure {
    pub chamber_id: ChamberId,
    pub chamber_name: String,
    pub error: InvalidConfigurationError,
}

/// Outcome of loading the stored chambers.
#[derive(Debug, Default)]
pub struct BootReport {
    /// Number of chambers registered, including the misconfigured ones.
    pub loaded: usize,
    pub failures: Vec<ConfigurationFailure>,
}

/// Manages the chambers of one installation.
pub struct ChamberManager<R, C> {
    repo: R,
    configurator: C,
    timing: ControlTiming,
    chambers: RwLock<HashMap<ChamberId, Fermenter>>,
}

impl<R: ChamberRepository, C: Configurator> ChamberManager<R, C> {
    /// Load every stored chamber and register it.
    ///
    /// Loading is best-effort: a chamber whose devices cannot be configured is
    /// still registered and reported in the [`BootReport`]. Chambers always
    /// boot idle, whatever step was persisted.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the stored chambers cannot be listed.
    #[tracing::instrument(skip_all)]
    pub async fn new(
        repo: R,
        configurator: C,
        timing: ControlTiming,
    ) -> Result<(Self, BootReport), FermHubError> {
        let stored = repo.get_all().await?;
        let mut report = BootReport::default();
        let mut chambers = HashMap::with_capacity(stored.len());

        for chamber in stored {
            if chamber.is_fermenting() {
                tracing::warn!(
                    chamber = %chamber.name,
                    step = chamber.current_fermentation_step,
                    "chamber was fermenting at shutdown, booting idle"
                );
            }
            let (fermenter, error) = Fermenter::configure(chamber, &configurator, &timing);
            if let Some(error) = error {
                let chamber = fermenter.chamber();
                tracing::warn!(chamber = %chamber.name, %error, "chamber is misconfigured");
                report.failures.push(ConfigurationFailure {
                    chamber_id: chamber.id,
                    chamber_name: chamber.name.clone(),
                    error,
                });
            }
            chambers.insert(fermenter.chamber().id, fermenter);
        }
        report.loaded = chambers.len();
        tracing::info!(loaded = report.loaded, failed = report.failures.len(), "chambers loaded");

        let manager = Self {
            repo,
            configurator,
            timing,
            chambers: RwLock::new(chambers),
        };
        Ok((manager, report))
    }

    /// All registered chambers, sorted by name.
    pub async fn get_all(&self) -> Vec<Chamber> {
        let chambers = self.chambers.read().await;
        let mut all: Vec<Chamber> = chambers
            .values()
            .map(|fermenter| fermenter.chamber().clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Look up a registered chamber.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::NotFound`] when no chamber has this id.
    pub async fn get(&self, id: ChamberId) -> Result<Chamber, FermHubError> {
        let chambers = self.chambers.read().await;
        chambers
            .get(&id)
            .map(|fermenter| fermenter.chamber().clone())
            .ok_or_else(|| not_found(id))
    }

    /// Create or replace a chamber.
    ///
    /// The chamber is persisted idle with a fresh modification time, then
    /// reconfigured and registered. A chamber whose devices cannot all be
    /// configured is still persisted and registered; the configuration error
    /// is returned afterwards.
    ///
    /// # Errors
    ///
    /// - [`FermHubError::Validation`] for an invalid chamber.
    /// - [`FermentationError::Fermenting`] when the registered chamber is fermenting.
    /// - A storage error when persisting fails; the registry is left unchanged.
    /// - [`FermHubError::Configuration`] listing every device problem.
    #[tracing::instrument(
        skip(self, chamber),
        fields(chamber_id = %chamber.id, chamber_name = %chamber.name)
    )]
    pub async fn save(&self, mut chamber: Chamber) -> Result<Chamber, FermHubError> {
        chamber.validate()?;
        let mut chambers = self.chambers.write().await;

        let mut previous_mod_time = chamber.mod_time;
        if let Some(existing) = chambers.get(&chamber.id) {
            if existing.is_fermenting() {
                return Err(FermentationError::Fermenting.into());
            }
            previous_mod_time = previous_mod_time.max(existing.chamber().mod_time);
        }
        chamber.current_fermentation_step = 0;
        chamber.mod_time = time::now_after(previous_mod_time);

        let saved = self.repo.save(chamber).await?;
        let (mut fermenter, error) =
            Fermenter::configure(saved.clone(), &self.configurator, &self.timing);
        if let Some(mut replaced) = chambers.remove(&saved.id) {
            fermenter.inherit_draining(replaced.take_draining());
        }
        chambers.insert(saved.id, fermenter);
        tracing::info!("chamber saved");

        match error {
            Some(error) => Err(error.into()),
            None => Ok(saved),
        }
    }

    /// Remove an idle chamber.
    ///
    /// # Errors
    ///
    /// - [`FermHubError::NotFound`] when no chamber has this id.
    /// - [`FermentationError::Fermenting`] when the chamber is fermenting.
    /// - A storage error when the chamber cannot be removed from the store.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ChamberId) -> Result<(), FermHubError> {
        let mut chambers = self.chambers.write().await;
        let fermenter = chambers.get(&id).ok_or_else(|| not_found(id))?;
        if fermenter.is_fermenting() {
            return Err(FermentationError::Fermenting.into());
        }
        self.repo.delete(id).await?;
        chambers.remove(&id);
        tracing::info!("chamber deleted");
        Ok(())
    }

    /// Start fermenting at the step labelled `step`, or move a running
    /// fermentation to it.
    ///
    /// # Errors
    ///
    /// - [`FermHubError::NotFound`] when no chamber has this id.
    /// - See [`Fermenter::start_fermentation`].
    #[tracing::instrument(skip(self))]
    pub async fn start_fermentation(&self, id: ChamberId, step: &str) -> Result<(), FermHubError> {
        let mut chambers = self.chambers.write().await;
        let fermenter = chambers.get_mut(&id).ok_or_else(|| not_found(id))?;
        fermenter.start_fermentation(step)
    }

    /// Stop fermenting.
    ///
    /// # Errors
    ///
    /// - [`FermHubError::NotFound`] when no chamber has this id.
    /// - [`FermentationError::NotFermenting`] when the chamber is idle.
    #[tracing::instrument(skip(self))]
    pub async fn stop_fermentation(&self, id: ChamberId) -> Result<(), FermHubError> {
        let mut chambers = self.chambers.write().await;
        let fermenter = chambers.get_mut(&id).ok_or_else(|| not_found(id))?;
        fermenter.stop_fermentation()
    }

    /// Sample the chamber's sensors.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::NotFound`] when no chamber has this id.
    pub async fn readings(&self, id: ChamberId) -> Result<Readings, FermHubError> {
        let devices = {
            let chambers = self.chambers.read().await;
            chambers
                .get(&id)
                .map(|fermenter| fermenter.devices().clone())
                .ok_or_else(|| not_found(id))?
        };
        Ok(devices.readings())
    }

    /// Readings from the last periodic refresh of a fermenting chamber.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::NotFound`] when no chamber has this id.
    pub async fn latest_readings(&self, id: ChamberId) -> Result<Option<Readings>, FermHubError> {
        let chambers = self.chambers.read().await;
        chambers
            .get(&id)
            .map(Fermenter::latest_readings)
            .ok_or_else(|| not_found(id))
    }

    /// Target temperature of a fermenting chamber, `None` when idle.
    ///
    /// # Errors
    ///
    /// Returns [`FermHubError::NotFound`] when no chamber has this id.
    pub async fn setpoint(&self, id: ChamberId) -> Result<Option<f64>, FermHubError> {
        let chambers = self.chambers.read().await;
        chambers
            .get(&id)
            .map(Fermenter::setpoint)
            .ok_or_else(|| not_found(id))
    }

    /// Stop every fermentation and wait until all actuators are switched off.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        let draining: Vec<_> = {
            let mut chambers = self.chambers.write().await;
            chambers
                .values_mut()
                .filter_map(|fermenter| {
                    if fermenter.is_fermenting()
                        && let Err(error) = fermenter.stop_fermentation()
                    {
                        tracing::warn!(%error, "could not stop fermentation");
                    }
                    fermenter.take_draining()
                })
                .collect()
        };
        tracing::info!(tasks = draining.len(), "waiting for temperature controllers");
        for handle in draining {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "temperature controller task failed");
            }
        }
    }
}

fn not_found(id: ChamberId) -> FermHubError {
    NotFoundError {
        entity: "Chamber",
        id: id.to_string(),
    }
    .into()
}
