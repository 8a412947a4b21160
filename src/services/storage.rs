// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food image uploads.

use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 500 * 1024;

/// Accepts a binary blob and returns a reference URL for it.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError>;

    /// Delete a file previously returned by `upload`. Already gone is fine.
    async fn remove(&self, url: &str) -> Result<(), AppError>;
}

/// Check size and type of an uploaded image.
pub fn validate_image(content_type: &str, bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "Please upload an image of 500KB or less".to_string(),
        ));
    }
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "Unsupported file type: {}",
            content_type
        )));
    }
    Ok(())
}

/// Stores files in a local directory served under `public_url`.
pub struct LocalFileStorage {
    dir: PathBuf,
    public_url: String,
}

impl LocalFileStorage {
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Random stored name keeping a sanitized extension of the original.
    fn stored_name(filename: &str) -> String {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase());

        match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        validate_image(content_type, bytes)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("create upload dir: {}", e)))?;

        let name = Self::stored_name(filename);
        tokio::fs::write(self.dir.join(&name), bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("write upload: {}", e)))?;

        tracing::debug!(file = %name, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_url, name))
    }

    async fn remove(&self, url: &str) -> Result<(), AppError> {
        let name = url
            .strip_prefix(&self.public_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| {
                !name.is_empty()
                    && !name.starts_with('.')
                    && !name.contains(|c: char| c == '/' || c == '\\')
            })
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("not a stored upload: {}", url))
            })?;

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                tracing::debug!(file = %name, "Removed upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!("remove upload: {}", e))),
        }
    }
}
