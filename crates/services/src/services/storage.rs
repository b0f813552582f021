//! Local file storage for photos and feed media, served under `/storage`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

pub const BUCKETS: &[&str] = &["child-photos", "feed-media", "documents"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown bucket: {0}")]
    UnknownBucket(String),
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("empty upload")]
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StoredFile {
    pub bucket: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/{bucket}/{name}", self.public_base_url)
    }

    /// Write `bytes` under a uuid-prefixed name so uploads never collide.
    pub async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        if !BUCKETS.contains(&bucket) {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        if bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        let clean = sanitize_filename(filename)?;
        let name = format!("{}-{clean}", Uuid::new_v4());

        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), bytes).await?;

        let content_type = mime_guess::from_path(&clean)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        info!(bucket, name = %name, size = bytes.len(), "Stored upload");

        Ok(StoredFile {
            public_url: self.public_url(bucket, &name),
            bucket: bucket.to_string(),
            name,
            content_type,
            size: bytes.len() as u64,
        })
    }
}

/// Keep only the final path component and a conservative character set.
fn sanitize_filename(filename: &str) -> Result<String, StorageError> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() || clean.chars().all(|c| c == '.') {
        return Err(StorageError::InvalidName(filename.to_string()));
    }
    Ok(clean)
}
