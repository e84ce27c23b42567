//! Simulated devices handed out by the virtual configurator.

mod beacon;
mod relay;
mod thermometer;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use beacon::VirtualBeacon;
pub use relay::VirtualRelay;
pub use thermometer::VirtualThermometer;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
