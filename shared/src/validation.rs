//! Validation utilities for CropWatch

use crate::models::DEFAULT_FORECAST_DAYS;

/// Forecast days an upload may request
pub const UPLOAD_DAYS_RANGE: (i32, i32) = (1, 14);

/// Forecast days the weather API accepts
pub const API_DAYS_RANGE: (i32, i32) = (1, 16);

/// Default day count for the forecast query endpoint
pub const DEFAULT_QUERY_DAYS: i32 = 15;

/// Clamp an upload's forecast-day count to [1, 14]
pub fn clamp_forecast_days(days: i32) -> i32 {
    days.clamp(UPLOAD_DAYS_RANGE.0, UPLOAD_DAYS_RANGE.1)
}

/// Clamp a day count to what the weather API accepts
pub fn clamp_api_days(days: i32) -> i32 {
    days.clamp(API_DAYS_RANGE.0, API_DAYS_RANGE.1)
}

/// Resolve the forecast days for an upload from the raw form value.
///
/// Non-numeric or missing input falls back to the account preference.
pub fn resolve_upload_days(raw: Option<&str>, account_default: Option<i32>) -> i32 {
    let parsed = raw.and_then(|r| r.trim().parse::<i32>().ok());
    clamp_forecast_days(parsed.or(account_default).unwrap_or(DEFAULT_FORECAST_DAYS))
}

/// Validate the day count of a forecast query (rejects instead of clamping)
pub fn validate_query_days(days: i32) -> Result<(), &'static str> {
    if days < API_DAYS_RANGE.0 || days > API_DAYS_RANGE.1 {
        return Err("Days parameter must be between 1 and 16");
    }
    Ok(())
}

/// Validate a latitude/longitude pair
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), &'static str> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Width of the bounded text columns of an upload
pub const MAX_TEXT_LEN: usize = 255;

/// Cut a string to at most `max` characters, keeping whole characters
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

/// Check that a new password matches its confirmation
pub fn validate_password_change(new_password: &str, confirm: &str) -> Result<(), &'static str> {
    if new_password != confirm {
        return Err("New passwords do not match");
    }
    if new_password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}
