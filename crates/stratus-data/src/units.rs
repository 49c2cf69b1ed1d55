//! Unit normalization.
//!
//! Converts a raw `(value, source_unit)` pair into the canonical unit of its
//! variable:
//!
//! | Variable | Canonical | Accepted source units |
//! |---|---|---|
//! | `temp_2m` | °C (`C`) | C, °C, degC, celsius, F, °F, degF, fahrenheit, K, kelvin |
//! | `wind_speed_10m` | `m/s` | m/s, mps, km/h, kmh, kph, mph, kn, kt, knots |
//! | `precipitation` | `mm` | mm, cm, in, inch, inches |
//!
//! Normalizing a value already in the canonical unit returns it unchanged.

use crate::error::{DataError, Result};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalUnit {
    /// Degrees Celsius
    #[serde(rename = "C")]
    Celsius,
    /// Metres per second
    #[serde(rename = "m/s")]
    MetresPerSecond,
    /// Millimetres
    #[serde(rename = "mm")]
    Millimetres,
}

impl CanonicalUnit {
    /// Database tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::MetresPerSecond => "m/s",
            Self::Millimetres => "mm",
        }
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalUnit {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "C" => Ok(Self::Celsius),
            "m/s" => Ok(Self::MetresPerSecond),
            "mm" => Ok(Self::Millimetres),
            _ => Err(DataError::Parse(format!("Invalid canonical unit: {}", s))),
        }
    }
}

const KMH_TO_MS: f64 = 1.0 / 3.6;
const MPH_TO_MS: f64 = 0.447_04;
const KNOT_TO_MS: f64 = 1852.0 / 3600.0;
const INCH_TO_MM: f64 = 25.4;

/// Normalize a value for a variable given by name.
///
/// Unknown variables and unknown units are configuration errors.
pub fn normalize(variable: &str, value: f64, source_unit: &str) -> Result<(f64, CanonicalUnit)> {
    let variable: Variable = variable.parse()?;
    normalize_variable(variable, value, source_unit)
}

/// Normalize a value for an already-parsed variable.
pub fn normalize_variable(
    variable: Variable,
    value: f64,
    source_unit: &str,
) -> Result<(f64, CanonicalUnit)> {
    let unit = source_unit.trim().to_lowercase();
    let converted = match variable {
        Variable::Temperature2m => match unit.as_str() {
            "c" | "°c" | "degc" | "celsius" => Some(value),
            "f" | "°f" | "degf" | "fahrenheit" => Some((value - 32.0) * 5.0 / 9.0),
            "k" | "kelvin" => Some(value - 273.15),
            _ => None,
        },
        Variable::WindSpeed10m => match unit.as_str() {
            "m/s" | "mps" => Some(value),
            "km/h" | "kmh" | "kph" => Some(value * KMH_TO_MS),
            "mph" => Some(value * MPH_TO_MS),
            "kn" | "kt" | "knots" => Some(value * KNOT_TO_MS),
            _ => None,
        },
        Variable::Precipitation => match unit.as_str() {
            "mm" => Some(value),
            "cm" => Some(value * 10.0),
            "in" | "inch" | "inches" => Some(value * INCH_TO_MM),
            _ => None,
        },
    };

    converted
        .map(|v| (v, variable.canonical_unit()))
        .ok_or_else(|| DataError::UnknownUnit {
            variable: variable.to_string(),
            unit: source_unit.to_string(),
        })
}
