//! Farmer account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default forecast-day preference for new accounts
pub const DEFAULT_FORECAST_DAYS: i32 = 7;

/// A farmer account as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub farm_location: Option<String>,
    /// Preferred number of forecast days (1-14)
    pub days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
