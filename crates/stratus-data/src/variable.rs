//! Variables, vendors and forecast sources.
//!
//! Every tag that crosses the store boundary is parsed into one of these
//! enums, so an unknown vendor or variable is rejected at the edge instead of
//! silently becoming an absent column.

use crate::error::{DataError, Result};
use crate::units::CanonicalUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    /// Air temperature at 2 m
    #[serde(rename = "temp_2m")]
    Temperature2m,
    /// Wind speed at 10 m
    #[serde(rename = "wind_speed_10m")]
    WindSpeed10m,
    /// Hourly precipitation
    #[serde(rename = "precipitation")]
    Precipitation,
}

impl Variable {
    /// All known variables.
    pub const ALL: [Self; 3] = [Self::Temperature2m, Self::WindSpeed10m, Self::Precipitation];

    /// Database / configuration tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature2m => "temp_2m",
            Self::WindSpeed10m => "wind_speed_10m",
            Self::Precipitation => "precipitation",
        }
    }

    /// Canonical unit every stored value of this variable is expressed in.
    pub const fn canonical_unit(&self) -> CanonicalUnit {
        match self {
            Self::Temperature2m => CanonicalUnit::Celsius,
            Self::WindSpeed10m => CanonicalUnit::MetresPerSecond,
            Self::Precipitation => CanonicalUnit::Millimetres,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| DataError::UnknownVariable(s.to_string()))
    }
}

/// External forecast vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vendor {
    /// Open-Meteo
    #[serde(rename = "open_meteo")]
    OpenMeteo,
    /// MET Norway locationforecast
    #[serde(rename = "met_no")]
    MetNo,
    /// OpenWeather One Call
    #[serde(rename = "openweather")]
    OpenWeather,
    /// Visual Crossing timeline
    #[serde(rename = "visual_crossing")]
    VisualCrossing,
    /// US National Weather Service
    #[serde(rename = "weather_gov")]
    WeatherGov,
}

impl Vendor {
    /// All known vendors, in feature-column order.
    pub const ALL: [Self; 5] = [
        Self::OpenMeteo,
        Self::MetNo,
        Self::OpenWeather,
        Self::VisualCrossing,
        Self::WeatherGov,
    ];

    /// Database tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenMeteo => "open_meteo",
            Self::MetNo => "met_no",
            Self::OpenWeather => "openweather",
            Self::VisualCrossing => "visual_crossing",
            Self::WeatherGov => "weather_gov",
        }
    }

    /// Position of this vendor in [`Vendor::ALL`].
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| DataError::UnknownSource(s.to_string()))
    }
}

/// Producer of a forecast record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ForecastSource {
    /// One of the external vendors
    Vendor(Vendor),
    /// The champion model's own output
    OurModel,
}

impl ForecastSource {
    /// Tag used for the champion model's own forecasts.
    pub const OUR_MODEL_TAG: &'static str = "our_model";

    /// Database tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vendor(v) => v.as_str(),
            Self::OurModel => Self::OUR_MODEL_TAG,
        }
    }

    /// The vendor behind this source, if any.
    pub const fn vendor(&self) -> Option<Vendor> {
        match self {
            Self::Vendor(v) => Some(*v),
            Self::OurModel => None,
        }
    }
}

impl fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastSource {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim() == Self::OUR_MODEL_TAG {
            Ok(Self::OurModel)
        } else {
            s.parse().map(Self::Vendor)
        }
    }
}

impl TryFrom<String> for ForecastSource {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ForecastSource> for String {
    fn from(source: ForecastSource) -> Self {
        source.as_str().to_string()
    }
}
