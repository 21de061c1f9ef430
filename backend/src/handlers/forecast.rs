//! Forecast handlers

use axum::{
    extract::{Query, State},
    Json,
};
use shared::ForecastReport;

use crate::error::AppError;
use crate::services::forecast::ForecastQuery;
use crate::services::ForecastService;
use crate::AppState;

/// Daily forecast for a coordinate pair
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastReport>, AppError> {
    let request = query.validate()?;

    let service = ForecastService::new(state.weather.clone());
    let report = service.forecast(request).await?;

    Ok(Json(report))
}
