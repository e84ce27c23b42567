//! Device configuration — which physical devices a chamber uses, and for what.
//!
//! A chamber declares an ordered list of [`DeviceConfig`]s. Each one names a
//! vendor-specific device id, the class of hardware behind it and the roles it
//! plays in the chamber. Roles are kept as the raw strings the user entered so
//! that an unrecognized role survives persistence and is reported when the
//! chamber is configured instead of failing deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Class of hardware behind a [`DeviceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// One-wire DS18B20 thermometer, addressed by its one-wire id.
    Ds18b20,
    /// Tilt beacon hydrometer (thermometer + hydrometer), addressed by color.
    Tilt,
    /// GPIO-driven relay, addressed by pin name.
    Gpio,
}

impl DeviceType {
    /// Whether a device of this type can fulfil `role`.
    #[must_use]
    pub fn supports(self, role: DeviceRole) -> bool {
        match self {
            Self::Ds18b20 => role.is_thermometer(),
            Self::Tilt => role.is_thermometer() || role == DeviceRole::Hydrometer,
            Self::Gpio => role.is_actuator(),
        }
    }

    /// Lowercase name as used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ds18b20 => "ds18b20",
            Self::Tilt => "tilt",
            Self::Gpio => "gpio",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional purpose of a device inside a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceRole {
    BeerThermometer,
    AuxiliaryThermometer,
    ExternalThermometer,
    Hydrometer,
    Chiller,
    Heater,
}

impl DeviceRole {
    /// All roles, in display order.
    pub const ALL: [Self; 6] = [
        Self::BeerThermometer,
        Self::AuxiliaryThermometer,
        Self::ExternalThermometer,
        Self::Hydrometer,
        Self::Chiller,
        Self::Heater,
    ];

    #[must_use]
    pub fn is_thermometer(self) -> bool {
        matches!(
            self,
            Self::BeerThermometer | Self::AuxiliaryThermometer | Self::ExternalThermometer
        )
    }

    #[must_use]
    pub fn is_actuator(self) -> bool {
        matches!(self, Self::Chiller | Self::Heater)
    }

    /// camelCase name as used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeerThermometer => "beerThermometer",
            Self::AuxiliaryThermometer => "auxiliaryThermometer",
            Self::ExternalThermometer => "externalThermometer",
            Self::Hydrometer => "hydrometer",
            Self::Chiller => "chiller",
            Self::Heater => "heater",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is not one of [`DeviceRole::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl FromStr for DeviceRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// One physical device used by a chamber and the roles it plays there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Vendor-specific id: one-wire address, beacon color or GPIO pin.
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub roles: Vec<String>,
}

impl DeviceConfig {
    /// Build a config from typed roles.
    #[must_use]
    pub fn new(id: impl Into<String>, device_type: DeviceType, roles: &[DeviceRole]) -> Self {
        Self {
            id: id.into(),
            device_type,
            roles: roles.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Color of a Tilt beacon; each color is a distinct iBeacon UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiltColor {
    Red,
    Green,
    Black,
    Purple,
    Orange,
    Blue,
    Yellow,
    Pink,
}

impl TiltColor {
    pub const ALL: [Self; 8] = [
        Self::Red,
        Self::Green,
        Self::Black,
        Self::Purple,
        Self::Orange,
        Self::Blue,
        Self::Yellow,
        Self::Pink,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Black => "black",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Pink => "pink",
        }
    }
}

impl fmt::Display for TiltColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TiltColor {
    type Err = crate::error::DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::error::DeviceError::InvalidColor(s.to_string()))
    }
}
