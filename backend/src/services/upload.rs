//! Upload service: store a leaf image, classify it, attach a forecast

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    assess_spread_risk, resolve_upload_days, truncate_chars, validate_coordinates,
    ForecastReport, GpsCoordinates, Prediction, ProcessedInfo, RiskAssessment, TemperatureUnit,
    Upload, UploadOutcome, UploadSummary, MAX_TEXT_LEN,
};
use sqlx::types::Json;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::WeatherClient;
use crate::services::classifier::{ClassifierError, ClassifierHandle};
use crate::services::storage::{default_title, MediaStore};

/// Number of entries in the public history feed
pub const RECENT_LIMIT: i64 = 10;

/// Upload service
#[derive(Clone)]
pub struct UploadService {
    db: PgPool,
    media: MediaStore,
    classifier: ClassifierHandle,
    weather: WeatherClient,
    units: TemperatureUnit,
}

/// Raw multipart form values for a new upload
#[derive(Debug, Default)]
pub struct NewUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub days: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct UploadRow {
    id: Uuid,
    farmer_id: Option<Uuid>,
    title: String,
    file_path: String,
    original_filename: Option<String>,
    uploaded_at: DateTime<Utc>,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    location_name: Option<String>,
    prediction: Option<String>,
    confidence: Option<f64>,
    forecast_days: i32,
    weather_forecast: Option<Json<ForecastReport>>,
}

impl From<UploadRow> for Upload {
    fn from(row: UploadRow) -> Self {
        Upload {
            id: row.id,
            farmer_id: row.farmer_id,
            title: row.title,
            original_filename: row.original_filename,
            uploaded_at: row.uploaded_at,
            latitude: row.latitude,
            longitude: row.longitude,
            location_name: row.location_name,
            prediction: row.prediction,
            confidence: row.confidence,
            forecast_days: row.forecast_days,
            weather_forecast: row.weather_forecast.map(|Json(report)| report),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    username: Option<String>,
    prediction: Option<String>,
    confidence: Option<f64>,
    location_name: Option<String>,
    uploaded_at: DateTime<Utc>,
}

const UPLOAD_COLUMNS: &str = "id, farmer_id, title, file_path, original_filename, uploaded_at, \
latitude, longitude, location_name, prediction, confidence, forecast_days, weather_forecast";

/// Parse an optional coordinate form value; blank means absent
fn parse_coordinate(field: &str, raw: Option<&str>) -> AppResult<Option<Decimal>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => Decimal::from_str(value)
            .map(Some)
            .map_err(|_| AppError::field(field, format!("Invalid {} value", field))),
    }
}

/// Parse and range-check the coordinate pair of an upload form
pub fn parse_coordinates(
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> AppResult<(Option<Decimal>, Option<Decimal>)> {
    let latitude = parse_coordinate("latitude", latitude)?;
    let longitude = parse_coordinate("longitude", longitude)?;

    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        let (lat_f, lon_f) = GpsCoordinates::new(lat, lon).as_f64();
        validate_coordinates(lat_f, lon_f).map_err(|msg| {
            let field = if msg.starts_with("Latitude") { "latitude" } else { "longitude" };
            AppError::field(field, msg)
        })?;
    }

    Ok((latitude, longitude))
}

/// Title for a new upload: the given title, else the filename stem, capped
/// at the column width
fn upload_title(title: Option<&str>, filename: &str) -> String {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_title(filename));
    truncate_chars(&title, MAX_TEXT_LEN)
}

/// Prediction and error message from a classification attempt.
///
/// Errors and undecodable images both become the sentinel prediction.
fn classification_result(
    result: Result<Prediction, ClassifierError>,
) -> (Prediction, Option<String>) {
    match result {
        Ok(p) if p.is_failed() => (
            p,
            Some("Error processing image: image could not be decoded".to_string()),
        ),
        Ok(p) => (p, None),
        Err(e) => (Prediction::failed(), Some(format!("Error processing image: {}", e))),
    }
}

/// Build the response for a processed upload.
///
/// A degraded forecast keeps its location label but is not attached; its
/// error is reported only when classification succeeded.
fn assemble_outcome(
    upload_id: Uuid,
    prediction: Prediction,
    classify_error: Option<String>,
    report: Option<ForecastReport>,
    processed_at: String,
) -> UploadOutcome {
    let mut error = classify_error;
    let mut location = None;
    let mut forecast = None;

    if let Some(report) = report {
        location = Some(report.location.clone());
        if report.is_degraded() {
            if error.is_none() {
                error = report.error;
            }
        } else {
            forecast = Some(report);
        }
    }

    let risk = forecast
        .as_ref()
        .map(|report| assess_spread_risk(&prediction, report));

    let failed = prediction.is_failed();
    let message = if failed {
        error.clone().unwrap_or_else(|| "Error processing image".to_string())
    } else {
        format!(
            "File uploaded and processed successfully! Prediction: {} (Confidence: {:.2}%)",
            prediction.label,
            prediction.confidence * 100.0
        )
    };

    UploadOutcome {
        status: if failed { "error" } else { "success" }.to_string(),
        message,
        upload_id,
        processed_info: ProcessedInfo {
            prediction: prediction.label,
            confidence: prediction.confidence,
            location,
            forecast,
            risk,
            processed_at,
            error,
        },
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M").to_string()
}

impl UploadService {
    pub fn new(
        db: PgPool,
        media: MediaStore,
        classifier: ClassifierHandle,
        weather: WeatherClient,
        units: TemperatureUnit,
    ) -> Self {
        Self {
            db,
            media,
            classifier,
            weather,
            units,
        }
    }

    /// Store, classify and forecast a new upload.
    ///
    /// Classification and forecast failures are recorded on the upload
    /// rather than returned as errors.
    pub async fn create(&self, farmer_id: Uuid, input: NewUpload) -> AppResult<UploadOutcome> {
        if input.bytes.is_empty() {
            return Err(AppError::field("file", "No file was uploaded"));
        }

        let (latitude, longitude) =
            parse_coordinates(input.latitude.as_deref(), input.longitude.as_deref())?;

        let account_days =
            sqlx::query_scalar::<_, i32>("SELECT days FROM farmers WHERE id = $1")
                .bind(farmer_id)
                .fetch_optional(&self.db)
                .await?;
        let forecast_days = resolve_upload_days(input.days.as_deref(), account_days);

        let title = upload_title(input.title.as_deref(), &input.filename);
        let original_filename = truncate_chars(&input.filename, MAX_TEXT_LEN);

        let upload_id = Uuid::new_v4();
        let file_path = self.media.save(upload_id, &input.filename, &input.bytes).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO uploads (id, farmer_id, title, file_path, original_filename, latitude, longitude, forecast_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(upload_id)
        .bind(farmer_id)
        .bind(&title)
        .bind(&file_path)
        .bind(&original_filename)
        .bind(latitude)
        .bind(longitude)
        .bind(forecast_days)
        .execute(&self.db)
        .await;

        if let Err(e) = inserted {
            // Do not leave an orphaned file behind
            self.media.remove(&file_path).await?;
            return Err(e.into());
        }

        tracing::info!("Stored upload {} for farmer {}", upload_id, farmer_id);

        let classified = self
            .classifier
            .classify(&self.media.resolve(&file_path))
            .await;
        if let Err(e) = &classified {
            tracing::warn!("Classification failed for upload {}: {}", upload_id, e);
        }
        let (prediction, classify_error) = classification_result(classified);

        let report = match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(
                self.weather
                    .forecast_or_degraded(GpsCoordinates::new(lat, lon), forecast_days, self.units)
                    .await,
            ),
            _ => None,
        };

        let outcome = assemble_outcome(upload_id, prediction, classify_error, report, timestamp());
        let info = &outcome.processed_info;

        sqlx::query(
            r#"
            UPDATE uploads
            SET prediction = $2, confidence = $3, location_name = $4, weather_forecast = $5
            WHERE id = $1
            "#,
        )
        .bind(upload_id)
        .bind(&info.prediction)
        .bind(info.confidence)
        .bind(&info.location)
        .bind(info.forecast.as_ref().map(Json))
        .execute(&self.db)
        .await?;

        Ok(outcome)
    }

    /// A farmer's uploads, newest first
    pub async fn list(&self, farmer_id: Uuid) -> AppResult<Vec<Upload>> {
        let rows = sqlx::query_as::<_, UploadRow>(&format!(
            "SELECT {} FROM uploads WHERE farmer_id = $1 ORDER BY uploaded_at DESC",
            UPLOAD_COLUMNS
        ))
        .bind(farmer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Upload::from).collect())
    }

    /// The most recent classified uploads across all farmers
    pub async fn recent(&self) -> AppResult<Vec<UploadSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT u.id, u.title, f.username, u.prediction, u.confidence, u.location_name, u.uploaded_at
            FROM uploads u
            LEFT JOIN farmers f ON f.id = u.farmer_id
            WHERE u.prediction IS NOT NULL
            ORDER BY u.uploaded_at DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UploadSummary {
                id: r.id,
                title: r.title,
                username: r.username,
                prediction: r.prediction,
                confidence: r.confidence,
                location_name: r.location_name,
                uploaded_at: r.uploaded_at,
            })
            .collect())
    }

    /// One of a farmer's uploads
    pub async fn get(&self, farmer_id: Uuid, upload_id: Uuid) -> AppResult<Upload> {
        self.find_row(farmer_id, upload_id).await.map(Upload::from)
    }

    /// Spread risk for one of a farmer's uploads
    pub async fn risk(&self, farmer_id: Uuid, upload_id: Uuid) -> AppResult<RiskAssessment> {
        let upload = self.get(farmer_id, upload_id).await?;

        let prediction = upload
            .prediction()
            .ok_or_else(|| AppError::ValidationError("Upload has not been classified".to_string()))?;

        // No stored forecast assesses as unknown at every checkpoint
        let forecast = upload.weather_forecast.unwrap_or_else(|| ForecastReport {
            location: upload.location_name.clone().unwrap_or_default(),
            units: self.units.into(),
            days: Vec::new(),
            updated: String::new(),
            error: None,
        });

        Ok(assess_spread_risk(&prediction, &forecast))
    }

    /// Delete one of a farmer's uploads and its stored file
    pub async fn delete(&self, farmer_id: Uuid, upload_id: Uuid) -> AppResult<()> {
        let row = self.find_row(farmer_id, upload_id).await?;

        self.media.remove(&row.file_path).await?;

        sqlx::query("DELETE FROM uploads WHERE id = $1 AND farmer_id = $2")
            .bind(upload_id)
            .bind(farmer_id)
            .execute(&self.db)
            .await?;

        tracing::info!("Deleted upload {} for farmer {}", upload_id, farmer_id);
        Ok(())
    }

    async fn find_row(&self, farmer_id: Uuid, upload_id: Uuid) -> AppResult<UploadRow> {
        sqlx::query_as::<_, UploadRow>(&format!(
            "SELECT {} FROM uploads WHERE id = $1 AND farmer_id = $2",
            UPLOAD_COLUMNS
        ))
        .bind(upload_id)
        .bind(farmer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Upload".to_string()))
    }
}
