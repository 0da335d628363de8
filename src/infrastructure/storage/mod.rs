use anyhow::{bail, Result};
use std::path::Path;

use crate::config::settings::AppConfig;

pub mod local;
pub mod paths;
pub mod s3;

use local::LocalStorage;
use s3::S3Storage;

/// Physical backend behind the asset key layout in [`paths`].
///
/// The pipeline only ever talks to this type; whether bytes land on the
/// local media root or in an object store is a deployment decision.
#[derive(Clone)]
pub enum Storage {
    Local(LocalStorage),
    S3(S3Storage),
}

impl Storage {
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        match config.storage_backend.as_str() {
            "local" => Ok(Storage::Local(LocalStorage::new(&config.media_root))),
            "s3" => Ok(Storage::S3(
                S3Storage::new(
                    &config.minio_url,
                    &config.minio_bucket,
                    &config.minio_access_key,
                    &config.minio_secret_key,
                )
                .await,
            )),
            other => bail!("Unknown storage backend '{}'", other),
        }
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        match self {
            Storage::Local(fs) => fs.read(key).await,
            Storage::S3(s3) => s3.get_object(key).await,
        }
    }

    pub async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        match self {
            Storage::Local(fs) => fs.write(key, data).await,
            Storage::S3(s3) => s3.put_object(key, data, &content_type_for(key)).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Storage::Local(fs) => fs.delete(key).await,
            Storage::S3(s3) => s3.delete_object(key).await,
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self {
            Storage::Local(fs) => fs.exists(key).await,
            Storage::S3(s3) => s3.exists(key).await,
        }
    }

    /// Immediate subdirectory names under `prefix` (quarantine entries, etc.).
    pub async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        match self {
            Storage::Local(fs) => fs.list_dirs(prefix).await,
            Storage::S3(s3) => s3.list_dirs(prefix).await,
        }
    }

    pub async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        match self {
            Storage::Local(fs) => fs.delete_prefix(prefix).await,
            Storage::S3(s3) => s3.delete_prefix(prefix).await,
        }
    }
}

fn content_type_for(key: &str) -> String {
    // mime_guess does not know the HLS types.
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl".to_string(),
        Some("ts") => "video/mp2t".to_string(),
        _ => mime_guess::from_path(key).first_or_octet_stream().to_string(),
    }
}
