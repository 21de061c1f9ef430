//! Disease spread risk against forecast conditions
//!
//! The favourable-condition bands below are a placeholder business rule
//! pending agronomist input. They are kept in one table so they can be
//! replaced without touching the correlation logic.

use serde::{Deserialize, Serialize};

use crate::models::{DailyForecast, DiseaseLabel, ForecastReport, Prediction};

/// Forecast day offsets used for risk estimation
pub const CHECKPOINTS: [usize; 2] = [7, 14];

/// Qualitative likelihood that a disease spreads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpreadLikelihood {
    /// Nothing to spread (healthy leaf or failed classification)
    None,
    Low,
    Moderate,
    High,
    /// No usable forecast data in the checkpoint window
    Unknown,
}

/// Conditions under which a disease spreads readily
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FavourableConditions {
    pub min_temp_celsius: f64,
    pub max_temp_celsius: f64,
    pub min_humidity_fraction: f64,
}

impl FavourableConditions {
    pub fn for_disease(label: DiseaseLabel) -> Option<Self> {
        match label {
            DiseaseLabel::Blight => Some(Self {
                min_temp_celsius: 18.0,
                max_temp_celsius: 27.0,
                min_humidity_fraction: 0.80,
            }),
            DiseaseLabel::CommonRust => Some(Self {
                min_temp_celsius: 16.0,
                max_temp_celsius: 25.0,
                min_humidity_fraction: 0.85,
            }),
            DiseaseLabel::GrayLeafSpot => Some(Self {
                min_temp_celsius: 24.0,
                max_temp_celsius: 30.0,
                min_humidity_fraction: 0.90,
            }),
            DiseaseLabel::Healthy => None,
        }
    }

    fn likelihood(&self, temp_celsius: Option<f64>, humidity: Option<f64>) -> SpreadLikelihood {
        if temp_celsius.is_none() && humidity.is_none() {
            return SpreadLikelihood::Unknown;
        }

        let temp_ok = temp_celsius
            .map(|t| t >= self.min_temp_celsius && t <= self.max_temp_celsius)
            .unwrap_or(false);
        let humidity_ok = humidity
            .map(|h| h >= self.min_humidity_fraction)
            .unwrap_or(false);

        match (temp_ok, humidity_ok) {
            (true, true) => SpreadLikelihood::High,
            (true, false) | (false, true) => SpreadLikelihood::Moderate,
            (false, false) => SpreadLikelihood::Low,
        }
    }
}

/// Conditions and likelihood at one checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointRisk {
    pub day: usize,
    /// Number of forecast days that fed the averages
    pub days_considered: usize,
    pub avg_temperature_celsius: Option<f64>,
    /// Mean relative humidity as a fraction in [0, 1]
    pub avg_humidity: Option<f64>,
    pub likelihood: SpreadLikelihood,
}

/// Spread risk for one prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub disease: String,
    pub checkpoints: Vec<CheckpointRisk>,
}

/// Correlate a prediction with a forecast report.
///
/// Checkpoint N averages the forecast days after the previous checkpoint up to
/// and including day N, so day 7 covers days 1-7 and day 14 covers days 8-14.
pub fn assess_spread_risk(prediction: &Prediction, forecast: &ForecastReport) -> RiskAssessment {
    let conditions = prediction
        .disease()
        .and_then(FavourableConditions::for_disease);
    let unit = forecast.units.temperature;

    let mut checkpoints = Vec::with_capacity(CHECKPOINTS.len());
    let mut window_start = 0;

    for day in CHECKPOINTS {
        let window: &[DailyForecast] = if window_start < forecast.days.len() {
            &forecast.days[window_start..day.min(forecast.days.len())]
        } else {
            &[]
        };
        window_start = day;

        let avg_temperature_celsius = mean(
            window
                .iter()
                .filter_map(|d| d.mean_temperature())
                .map(|t| unit.to_celsius(t)),
        )
        .map(round2);
        let avg_humidity = mean(
            window
                .iter()
                .filter_map(|d| d.humidity)
                .map(|h| f64::from(h) / 100.0),
        )
        .map(round2);

        let likelihood = match conditions {
            Some(c) => c.likelihood(avg_temperature_celsius, avg_humidity),
            None => SpreadLikelihood::None,
        };

        checkpoints.push(CheckpointRisk {
            day,
            days_considered: window.len(),
            avg_temperature_celsius,
            avg_humidity,
            likelihood,
        });
    }

    RiskAssessment {
        disease: prediction.label.clone(),
        checkpoints,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
