//! Uploaded leaf image models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ForecastReport, Prediction, RiskAssessment};

/// An uploaded leaf image with its derived classification and forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub farmer_id: Option<Uuid>,
    pub title: String,
    pub original_filename: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub location_name: Option<String>,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub forecast_days: i32,
    pub weather_forecast: Option<ForecastReport>,
}

impl Upload {
    pub fn prediction(&self) -> Option<Prediction> {
        self.prediction.as_ref().map(|label| Prediction {
            label: label.clone(),
            confidence: self.confidence.unwrap_or_default(),
        })
    }
}

/// Entry in the public history feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub id: Uuid,
    pub title: String,
    pub username: Option<String>,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub location_name: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Details of a processed upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedInfo {
    pub prediction: String,
    pub confidence: f64,
    pub location: Option<String>,
    pub forecast: Option<ForecastReport>,
    pub risk: Option<RiskAssessment>,
    /// `YYYY-MM-DD HH:MM`
    pub processed_at: String,
    pub error: Option<String>,
}

/// Response returned from the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub status: String,
    pub message: String,
    pub upload_id: Uuid,
    pub processed_info: ProcessedInfo,
}
