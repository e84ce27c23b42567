//! # fermhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Thermometer`, `Hydrometer`, `Actuator` — device capabilities
//!   - `Configurator` — creates capabilities from device ids
//!   - `ChamberRepository` — persistence of chamber definitions
//! - Run **temperature controllers** (hysteresis and PID) as cancellable tasks
//! - Resolve a chamber's declared devices into live capabilities
//! - Expose the **chamber manager**, the driving port used by every surface
//!
//! ## Dependency rule
//! Depends on `fermhub-domain` only (plus `tokio` and `tokio-util` for tasks,
//! timers and cancellation). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod control;
pub mod devices;
pub mod fermenter;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
