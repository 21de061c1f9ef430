//! Hosted inference client
//!
//! Client for an image-classification endpoint that accepts
//! `{"inputs": "<base64 image>"}` and answers with `[{label, score}]`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Client for the hosted classification endpoint
#[derive(Clone)]
pub struct InferenceClient {
    api_endpoint: String,
    api_token: Option<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
}

/// One scored class from the endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl InferenceClient {
    pub fn new(
        api_endpoint: String,
        api_token: Option<String>,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_endpoint,
            api_token,
            http_client,
        })
    }

    /// Send raw image bytes for classification
    pub async fn classify(&self, image: &[u8]) -> AppResult<Vec<LabelScore>> {
        let body = InferenceRequest {
            inputs: STANDARD.encode(image),
        };

        let mut request = self.http_client.post(&self.api_endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Classifier(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Classifier(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Classifier(format!("Failed to parse response: {}", e)))
    }
}
