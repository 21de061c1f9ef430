//! Local media storage for uploaded images

use shared::truncate_chars;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const UPLOAD_DIR: &str = "uploads";

/// Longest stem kept in a stored filename
const MAX_STEM_LEN: usize = 100;

/// Longest extension kept in a stored filename, dot included
const MAX_EXTENSION_LEN: usize = 16;

/// Writes and removes uploaded files under the media root
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist file bytes, returning the path relative to the media root.
    ///
    /// Stored names are prefixed with the upload id so identical client
    /// filenames never collide.
    pub async fn save(&self, upload_id: Uuid, filename: &str, bytes: &[u8]) -> AppResult<String> {
        let relative = format!("{}/{}_{}", UPLOAD_DIR, upload_id, sanitize_filename(filename));
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to write file: {}", e)))?;

        tracing::debug!("Stored upload at {}", path.display());
        Ok(relative)
    }

    /// Absolute location of a stored file
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> AppResult<()> {
        match tokio::fs::remove_file(self.resolve(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Stored file {} was already missing", relative);
                Ok(())
            }
            Err(e) => Err(AppError::StorageError(format!("Failed to remove file: {}", e))),
        }
    }
}

/// Keep only the final path component, replace anything outside
/// `[A-Za-z0-9._-]` and cap the stem at 100 characters
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "upload".to_string();
    }

    let (stem, extension) = match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= MAX_EXTENSION_LEN => cleaned.split_at(dot),
        _ => (cleaned, ""),
    };
    format!("{}{}", truncate_chars(stem, MAX_STEM_LEN), extension)
}

/// Title derived from a filename: its stem
pub fn default_title(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Untitled")
        .to_string()
}
