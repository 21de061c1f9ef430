//! Business logic services for CropWatch

pub mod auth;
pub mod classifier;
pub mod forecast;
pub mod storage;
pub mod upload;

pub use auth::AuthService;
pub use classifier::{ClassifierError, ClassifierHandle, DiseaseClassifier};
pub use forecast::ForecastService;
pub use storage::MediaStore;
pub use upload::UploadService;
