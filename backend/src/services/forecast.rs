//! Forecast lookup service behind the public forecast endpoint

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_coordinates, validate_query_days, ForecastReport, GpsCoordinates, TemperatureUnit,
    DEFAULT_QUERY_DAYS,
};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::external::WeatherClient;

/// Raw query string of `GET /forecast`
#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub days: Option<String>,
    pub units: Option<String>,
}

/// Validated forecast request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRequest {
    pub coordinates: GpsCoordinates,
    pub days: i32,
    pub units: TemperatureUnit,
}

/// A trimmed, non-blank query value
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ForecastQuery {
    /// Validate the query, rejecting rather than clamping out-of-range values
    pub fn validate(&self) -> AppResult<ForecastRequest> {
        let (lat, lon) = match (present(&self.lat), present(&self.lon)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(AppError::ValidationError(
                    "Latitude and longitude parameters are required".to_string(),
                ))
            }
        };

        let invalid_numbers = || {
            AppError::ValidationError(
                "Latitude and longitude must be valid numbers, and days must be an integer"
                    .to_string(),
            )
        };

        let latitude = Decimal::from_str(lat).map_err(|_| invalid_numbers())?;
        let longitude = Decimal::from_str(lon).map_err(|_| invalid_numbers())?;
        let days = match present(&self.days) {
            Some(d) => d.parse::<i32>().map_err(|_| invalid_numbers())?,
            None => DEFAULT_QUERY_DAYS,
        };

        validate_query_days(days).map_err(|msg| AppError::field("days", msg))?;

        let units = match present(&self.units) {
            Some(u) => u
                .parse::<TemperatureUnit>()
                .map_err(|e| AppError::field("units", e.to_string()))?,
            None => TemperatureUnit::default(),
        };

        let coordinates = GpsCoordinates::new(latitude, longitude);
        let (lat_f, lon_f) = coordinates.as_f64();
        validate_coordinates(lat_f, lon_f).map_err(|msg| AppError::ValidationError(msg.to_string()))?;

        Ok(ForecastRequest {
            coordinates,
            days,
            units,
        })
    }
}

/// Forecast service
#[derive(Clone)]
pub struct ForecastService {
    weather: WeatherClient,
}

impl ForecastService {
    pub fn new(weather: WeatherClient) -> Self {
        Self { weather }
    }

    /// Fetch a forecast report; upstream failures propagate as 503
    pub async fn forecast(&self, request: ForecastRequest) -> AppResult<ForecastReport> {
        self.weather
            .get_report(request.coordinates, request.days, request.units)
            .await
    }
}
