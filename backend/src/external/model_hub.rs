//! Model hub client
//!
//! Fetches the classifier artifact from a Hugging Face style model hub
//! (`{hub}/{repo}/resolve/main/{file}`), caching it on disk.

use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ClassifierConfig;
use crate::error::{AppError, AppResult};

const PLACEHOLDER_CONTENTS: &str = "Placeholder model file - download failed";

/// Fetch-or-placeholder access to the model artifact
#[derive(Clone)]
pub struct ModelArtifactFetcher {
    http_client: Client,
    hub_endpoint: String,
    repo_id: String,
    filename: String,
    model_dir: PathBuf,
    persistent_dir: Option<PathBuf>,
    token: Option<String>,
}

impl ModelArtifactFetcher {
    pub fn new(config: &ClassifierConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            hub_endpoint: config.hub_endpoint.trim_end_matches('/').to_string(),
            repo_id: config.model_repo.clone(),
            filename: config.model_filename.clone(),
            model_dir: config.model_dir.clone(),
            persistent_dir: config.persistent_dir.clone(),
            token: config.api_token.clone(),
        })
    }

    /// Download URL of the artifact
    pub fn download_url(&self) -> String {
        format!(
            "{}/{}/resolve/main/{}",
            self.hub_endpoint, self.repo_id, self.filename
        )
    }

    /// Return a local path to the artifact, downloading it when missing.
    ///
    /// A failed download leaves a placeholder file behind so later runs do not
    /// retry on every start. Returns `None` only when nothing could be written.
    pub async fn fetch(&self) -> Option<PathBuf> {
        let mut target = self.model_dir.join(&self.filename);

        if let Some(dir) = self.usable_persistent_dir().await {
            tracing::info!("Using persistent model storage at {}", dir.display());
            target = dir.join(&self.filename);
        }

        if is_file(&target).await {
            tracing::info!("Model artifact already present at {}", target.display());
            return Some(target);
        }

        let fallback = self.model_dir.join(&self.filename);
        if fallback != target && is_file(&fallback).await {
            tracing::info!("Model artifact already present at {}", fallback.display());
            return Some(fallback);
        }

        match self.download(&target).await {
            Ok(()) => {
                tracing::info!("Model artifact downloaded to {}", target.display());
                Some(target)
            }
            Err(e) => {
                tracing::warn!("Model download failed: {}", e);
                match write_placeholder(&target).await {
                    Ok(()) => {
                        tracing::warn!("Created placeholder model file at {}", target.display());
                        Some(target)
                    }
                    Err(e) => {
                        tracing::error!("Failed to create placeholder model file: {}", e);
                        None
                    }
                }
            }
        }
    }

    async fn usable_persistent_dir(&self) -> Option<PathBuf> {
        let dir = self.persistent_dir.as_ref()?;
        let metadata = tokio::fs::metadata(dir).await.ok()?;
        (metadata.is_dir() && !metadata.permissions().readonly()).then(|| dir.clone())
    }

    async fn download(&self, target: &Path) -> AppResult<()> {
        let url = self.download_url();
        tracing::info!("Downloading model artifact from {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        } else {
            tracing::debug!("No hub token configured, downloading anonymously");
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Model download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Model hub returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalService(format!("Model download failed: {}", e)))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| AppError::StorageError(e.to_string()))?;

        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn write_placeholder(target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, PLACEHOLDER_CONTENTS).await
}
