//! Common types used across the platform

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// (latitude, longitude) as floats; unrepresentable values become NaN
    pub fn as_f64(&self) -> (f64, f64) {
        (
            self.latitude.to_f64().unwrap_or(f64::NAN),
            self.longitude.to_f64().unwrap_or(f64::NAN),
        )
    }

    /// Label used when no geocoder can name the place
    pub fn fallback_label(&self) -> String {
        let (latitude, longitude) = self.as_f64();
        format!("Location at {:.4}, {:.4}", latitude, longitude)
    }
}

/// Temperature unit requested from the weather API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "fahrenheit",
            TemperatureUnit::Celsius => "celsius",
        }
    }

    /// Precipitation unit understood by the upstream API
    pub fn precipitation_param(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "inch",
            TemperatureUnit::Celsius => "mm",
        }
    }

    /// Precipitation unit as shown to users
    pub fn precipitation_label(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "inches",
            TemperatureUnit::Celsius => "mm",
        }
    }

    pub fn windspeed_param(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "mph",
            TemperatureUnit::Celsius => "kmh",
        }
    }

    /// Convert a temperature in this unit to Celsius
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            TemperatureUnit::Celsius => value,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Units parameter must be 'fahrenheit' or 'celsius'")]
pub struct ParseUnitError;

impl FromStr for TemperatureUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            "celsius" => Ok(TemperatureUnit::Celsius),
            _ => Err(ParseUnitError),
        }
    }
}
