//! Shared types and models for CropWatch
//!
//! Domain types used by the backend and by any client that consumes the API:
//! accounts, uploads, forecasts, disease labels and the spread-risk correlator.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
