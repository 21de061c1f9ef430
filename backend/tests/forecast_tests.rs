//! Forecast client integration tests
//!
//! Runs the weather client against a mock Open-Meteo / Nominatim server:
//! - daily forecast shaping and day counts
//! - place-name fallback chain
//! - degraded reports on upstream failure

use cropwatch_backend::error::AppError;
use cropwatch_backend::external::WeatherClient;
use rust_decimal::Decimal;
use shared::{GpsCoordinates, TemperatureUnit};
use std::str::FromStr;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coords() -> GpsCoordinates {
    GpsCoordinates::new(
        Decimal::from_str("40.0").unwrap(),
        Decimal::from_str("-75.0").unwrap(),
    )
}

fn forecast_body(days: usize) -> serde_json::Value {
    let dates: Vec<String> = (1..=days).map(|d| format!("2025-04-{:02}", d)).collect();
    let hourly_times: Vec<String> = dates
        .iter()
        .flat_map(|d| vec![format!("{}T00:00", d), format!("{}T12:00", d)])
        .collect();

    serde_json::json!({
        "daily": {
            "time": dates,
            "temperature_2m_max": vec![22.5; days],
            "temperature_2m_min": vec![14.0; days],
            "precipitation_sum": vec![1.2; days],
            "precipitation_probability_max": vec![40; days],
            "weathercode": vec![61; days]
        },
        "hourly": {
            "time": hourly_times,
            "relative_humidity_2m": vec![80; days * 2]
        }
    })
}

async fn mount_place(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"name": "Kennett Square", "admin1": "Pennsylvania", "country": "United States"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_day_celsius_forecast() {
    let server = MockServer::start().await;
    mount_place(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "3"))
        .and(query_param("temperature_unit", "celsius"))
        .and(query_param("precipitation_unit", "mm"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let report = client
        .get_report(coords(), 3, TemperatureUnit::Celsius)
        .await
        .unwrap();

    assert_eq!(report.location, "Kennett Square, Pennsylvania, United States");
    assert_eq!(report.units.temperature, TemperatureUnit::Celsius);
    assert_eq!(report.units.precipitation, "mm");
    assert!(report.error.is_none());
    assert_eq!(report.days.len(), 3);

    let first = &report.days[0];
    assert_eq!(first.date, "4/1/2025");
    assert_eq!(first.temp_high, Some(22.5));
    assert_eq!(first.temp_low, Some(14.0));
    assert_eq!(first.humidity, Some(80));
    assert_eq!(first.precipitation.amount, 1.2);
    assert_eq!(first.precipitation.chance, 40);
    assert_eq!(first.weather, "Slight rain");
}

#[tokio::test]
async fn test_days_are_clamped_to_api_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "16"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(16)))
        .expect(1)
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let days = client
        .get_daily_forecast(coords(), 40, TemperatureUnit::Fahrenheit)
        .await
        .unwrap();

    assert_eq!(days.len(), 16);
}

#[tokio::test]
async fn test_place_name_falls_back_to_nominatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(header("User-Agent", "CropWatch Weather Forecast/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": {"town": "Kennett Square", "state": "Pennsylvania", "country": "United States"},
            "display_name": "Kennett Square, Chester County, Pennsylvania, United States"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let name = client.resolve_location_name(coords()).await;

    assert_eq!(name, "Kennett Square, Pennsylvania, United States");
}

#[tokio::test]
async fn test_long_place_name_is_capped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let display_name = vec!["Township Road"; 40].join(", ");
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "address": {"country": "United States"},
            "display_name": display_name
        })))
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let name = client.resolve_location_name(coords()).await;

    assert_eq!(name.chars().count(), 255);
    assert!(display_name.starts_with(&name));
}

#[tokio::test]
async fn test_place_name_falls_back_to_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let name = client.resolve_location_name(coords()).await;

    assert_eq!(name, "Location at 40.0000, -75.0000");
}

#[tokio::test]
async fn test_upstream_failure_is_unavailable_or_degraded() {
    let server = MockServer::start().await;
    mount_place(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();

    let strict = client
        .get_report(coords(), 7, TemperatureUnit::Fahrenheit)
        .await;
    assert!(matches!(strict, Err(AppError::WeatherServiceUnavailable(_))));

    let degraded = client
        .forecast_or_degraded(coords(), 7, TemperatureUnit::Fahrenheit)
        .await;
    assert!(degraded.is_degraded());
    assert!(degraded.days.is_empty());
    assert!(degraded.error.is_some());
    assert_eq!(degraded.units.precipitation, "inches");
}

#[tokio::test]
async fn test_malformed_body_degrades() {
    let server = MockServer::start().await;
    mount_place(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = WeatherClient::with_base_url(&server.uri(), 5).unwrap();
    let report = client
        .forecast_or_degraded(coords(), 3, TemperatureUnit::Celsius)
        .await;

    assert!(report.is_degraded());
    assert_eq!(report.location, "Location at 40.0000, -75.0000");
}
