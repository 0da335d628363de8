use serde::Deserialize;
use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub amqp_url: String,
    pub storage_backend: String,
    pub media_root: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub work_dir: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub segment_duration: u32,
    pub job_time_limit_secs: u64,
    pub job_soft_time_limit_secs: u64,
    pub max_attempts: u32,
    pub retry_base_secs: u64,
    pub failed_retention_days: i64,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            database_url: env::get(EnvKey::DatabaseUrl)?,
            amqp_url: env::get(EnvKey::AmqpUrl)?,
            storage_backend: env::get_or(EnvKey::StorageBackend, "local"),
            media_root: env::get_or(EnvKey::MediaRoot, "./media"),
            minio_url: env::get_or(EnvKey::MinioUrl, ""),
            minio_bucket: env::get_or(EnvKey::MinioBucket, ""),
            minio_access_key: env::get_or(EnvKey::MinioAccessKey, ""),
            minio_secret_key: env::get_or(EnvKey::MinioSecretKey, ""),
            work_dir: env::get_or(EnvKey::WorkDir, "/tmp/transcoder"),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            ffprobe_bin: env::get_or(EnvKey::FfprobeBin, "ffprobe"),
            segment_duration: env::get_parsed(EnvKey::SegmentDuration, 10),
            job_time_limit_secs: env::get_parsed(EnvKey::JobTimeLimit, 1800),
            job_soft_time_limit_secs: env::get_parsed(EnvKey::JobSoftTimeLimit, 1500),
            max_attempts: env::get_parsed(EnvKey::MaxAttempts, 3),
            retry_base_secs: env::get_parsed(EnvKey::RetryBaseDelay, 60),
            failed_retention_days: env::get_parsed(EnvKey::FailedRetentionDays, 30),
            sweep_interval_secs: env::get_parsed(EnvKey::SweepInterval, 3600),
        })
    }
}
