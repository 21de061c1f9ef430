//! Weather API client for daily forecasts and place names
//!
//! Integrates with Open-Meteo for forecasts, and with Open-Meteo geocoding
//! followed by Nominatim for resolving coordinates to a place name.

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::{
    clamp_api_days, truncate_chars, weather_description, DailyForecast, ForecastReport,
    GpsCoordinates, Precipitation, TemperatureUnit, MAX_TEXT_LEN,
};
use std::time::Duration;

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,\
precipitation_probability_max,weathercode,sunrise,sunset";
const HOURLY_FIELDS: &str = "relative_humidity_2m";

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    forecast_url: String,
    geocoding_url: String,
    nominatim_url: String,
    user_agent: String,
}

/// Open-Meteo forecast response
#[derive(Debug, Default, Deserialize)]
struct OMForecastResponse {
    daily: Option<OMDaily>,
    hourly: Option<OMHourly>,
}

#[derive(Debug, Default, Deserialize)]
struct OMDaily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    weathercode: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct OMHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
}

/// Open-Meteo geocoding response
#[derive(Debug, Deserialize)]
struct OMGeocodingResponse {
    results: Option<Vec<OMPlace>>,
}

#[derive(Debug, Deserialize)]
struct OMPlace {
    name: Option<String>,
    admin1: Option<String>,
    country: Option<String>,
}

/// Nominatim reverse geocoding response
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl WeatherClient {
    /// Create a new WeatherClient from configuration
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            forecast_url: config.forecast_endpoint.clone(),
            geocoding_url: config.geocoding_endpoint.clone(),
            nominatim_url: config.nominatim_endpoint.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Create a client with every endpoint under one base URL (for testing)
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> AppResult<Self> {
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            forecast_url: format!("{}/v1/forecast", base),
            geocoding_url: format!("{}/v1/search", base),
            nominatim_url: format!("{}/reverse", base),
            user_agent: "CropWatch Weather Forecast/1.0".to_string(),
        })
    }

    /// Fetch daily forecast records for the given coordinates.
    ///
    /// `days` is clamped to the range the API accepts.
    pub async fn get_daily_forecast(
        &self,
        coords: GpsCoordinates,
        days: i32,
        units: TemperatureUnit,
    ) -> AppResult<Vec<DailyForecast>> {
        let days = clamp_api_days(days);
        let params = [
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("temperature_unit", units.as_str().to_string()),
            ("precipitation_unit", units.precipitation_param().to_string()),
            ("windspeed_unit", units.windspeed_param().to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", days.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
        ];

        tracing::debug!(
            "Requesting {}-day forecast for {}, {}",
            days,
            coords.latitude,
            coords.longitude
        );

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                AppError::WeatherServiceUnavailable(format!("Forecast request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WeatherServiceUnavailable(format!(
                "Forecast API error: {} - {}",
                status, body
            )));
        }

        let data: OMForecastResponse = response.json().await.map_err(|e| {
            AppError::WeatherServiceUnavailable(format!("Failed to parse forecast response: {}", e))
        })?;

        Ok(convert_forecast_response(data, days as usize))
    }

    /// Resolve coordinates to a place name.
    ///
    /// Tries Open-Meteo geocoding, then Nominatim, then falls back to the
    /// formatted coordinates. Never fails. Names are capped at
    /// [`MAX_TEXT_LEN`] characters.
    pub async fn resolve_location_name(&self, coords: GpsCoordinates) -> String {
        let name = match self.lookup_open_meteo(coords).await {
            Ok(Some(name)) => Some(name),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Primary geocoding failed: {}", e);
                None
            }
        };

        let name = match name {
            Some(name) => Some(name),
            None => match self.lookup_nominatim(coords).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Nominatim fallback failed: {}", e);
                    None
                }
            },
        };

        match name {
            Some(name) => truncate_chars(&name, MAX_TEXT_LEN),
            None => coords.fallback_label(),
        }
    }

    /// Build a full forecast report, propagating upstream failures
    pub async fn get_report(
        &self,
        coords: GpsCoordinates,
        days: i32,
        units: TemperatureUnit,
    ) -> AppResult<ForecastReport> {
        let location = self.resolve_location_name(coords).await;
        let days = self.get_daily_forecast(coords, days, units).await?;

        Ok(ForecastReport {
            location,
            units: units.into(),
            days,
            updated: timestamp(),
            error: None,
        })
    }

    /// Build a forecast report, degrading to an empty report with an error
    /// message instead of failing
    pub async fn forecast_or_degraded(
        &self,
        coords: GpsCoordinates,
        days: i32,
        units: TemperatureUnit,
    ) -> ForecastReport {
        match self.get_report(coords, days, units).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Forecast unavailable, degrading: {}", e);
                ForecastReport {
                    location: coords.fallback_label(),
                    units: units.into(),
                    days: Vec::new(),
                    updated: "Error fetching forecast".to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn lookup_open_meteo(&self, coords: GpsCoordinates) -> AppResult<Option<String>> {
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("count", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let data: OMGeocodingResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse geocoding: {}", e)))?;

        Ok(data
            .results
            .and_then(|results| results.into_iter().next())
            .map(format_open_meteo_place))
    }

    async fn lookup_nominatim(&self, coords: GpsCoordinates) -> AppResult<Option<String>> {
        let response = self
            .client
            .get(&self.nominatim_url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let data: NominatimResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse Nominatim: {}", e)))?;

        Ok(format_nominatim_place(data))
    }
}

fn build_http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M").to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn format_open_meteo_place(place: OMPlace) -> String {
    let name = non_empty(place.name).unwrap_or_else(|| "Unknown".to_string());
    match (non_empty(place.admin1), non_empty(place.country)) {
        (Some(admin1), Some(country)) => format!("{}, {}, {}", name, admin1, country),
        (None, Some(country)) => format!("{}, {}", name, country),
        (Some(admin1), None) => format!("{}, {}", name, admin1),
        (None, None) => name,
    }
}

fn format_nominatim_place(data: NominatimResponse) -> Option<String> {
    let address = data.address?;
    let city = non_empty(address.city)
        .or(non_empty(address.town))
        .or(non_empty(address.village))
        .or(non_empty(address.hamlet))
        .or(non_empty(address.municipality))
        .or(non_empty(address.county));

    match (city, non_empty(address.state), non_empty(address.country)) {
        (Some(city), Some(state), Some(country)) => Some(format!("{}, {}, {}", city, state, country)),
        (Some(city), None, Some(country)) => Some(format!("{}, {}", city, country)),
        (Some(city), _, None) => Some(city),
        (None, _, _) => non_empty(data.display_name),
    }
}

fn value_at<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}

/// Format an ISO date as `M/D/YYYY`, leaving unparseable input untouched
fn format_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Convert an Open-Meteo response into at most `days` daily records
fn convert_forecast_response(data: OMForecastResponse, days: usize) -> Vec<DailyForecast> {
    let daily = data.daily.unwrap_or_default();
    let hourly = data.hourly.unwrap_or_default();

    daily
        .time
        .iter()
        .take(days)
        .enumerate()
        .map(|(i, date)| {
            let samples: Vec<f64> = hourly
                .time
                .iter()
                .enumerate()
                .filter(|(_, t)| t.starts_with(date.as_str()))
                .filter_map(|(j, _)| value_at(&hourly.relative_humidity_2m, j))
                .collect();
            let humidity = (!samples.is_empty())
                .then(|| (samples.iter().sum::<f64>() / samples.len() as f64).round() as i32);

            DailyForecast {
                date: format_date(date),
                temp_high: value_at(&daily.temperature_2m_max, i),
                temp_low: value_at(&daily.temperature_2m_min, i),
                humidity,
                precipitation: Precipitation {
                    amount: value_at(&daily.precipitation_sum, i).unwrap_or(0.0),
                    chance: value_at(&daily.precipitation_probability_max, i)
                        .map(|c| c.round() as i32)
                        .unwrap_or(0),
                },
                weather: weather_description(
                    value_at(&daily.weathercode, i).map(|c| c as i32),
                )
                .to_string(),
            }
        })
        .collect()
}
