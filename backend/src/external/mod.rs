//! External API integrations

pub mod inference;
pub mod model_hub;
pub mod weather;

pub use inference::{InferenceClient, LabelScore};
pub use model_hub::ModelArtifactFetcher;
pub use weather::WeatherClient;
