//! Weather forecast models

use serde::{Deserialize, Serialize};

use crate::types::TemperatureUnit;

/// Precipitation for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Precipitation {
    pub amount: f64,
    /// Maximum probability of precipitation, percent
    pub chance: i32,
}

/// Daily weather forecast entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyForecast {
    /// Date formatted as `M/D/YYYY`
    pub date: String,
    pub temp_high: Option<f64>,
    pub temp_low: Option<f64>,
    /// Mean relative humidity for the day, percent
    pub humidity: Option<i32>,
    pub precipitation: Precipitation,
    pub weather: String,
}

impl DailyForecast {
    /// Mean of high and low, if both are known
    pub fn mean_temperature(&self) -> Option<f64> {
        match (self.temp_high, self.temp_low) {
            (Some(high), Some(low)) => Some((high + low) / 2.0),
            _ => None,
        }
    }
}

/// Units block of a forecast report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastUnits {
    pub temperature: TemperatureUnit,
    pub precipitation: String,
}

impl From<TemperatureUnit> for ForecastUnits {
    fn from(unit: TemperatureUnit) -> Self {
        Self {
            temperature: unit,
            precipitation: unit.precipitation_label().to_string(),
        }
    }
}

/// Forecast report for a location, as stored on uploads and returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastReport {
    pub location: String,
    pub units: ForecastUnits,
    pub days: Vec<DailyForecast>,
    /// Time the report was produced, `YYYY-MM-DD HH:MM`
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ForecastReport {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Convert a WMO weather code to a description
pub fn weather_description(code: Option<i32>) -> &'static str {
    let Some(code) = code else {
        return "Unknown";
    };

    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}
