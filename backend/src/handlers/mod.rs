//! HTTP request handlers

pub mod auth;
pub mod forecast;
pub mod health;
pub mod profile;
pub mod upload;

pub use auth::{login, register};
pub use forecast::get_forecast;
pub use health::health_check;
pub use profile::{change_password, get_profile, update_profile};
pub use upload::{
    create_upload, delete_upload, get_upload, get_upload_risk, list_uploads, recent_uploads,
};
