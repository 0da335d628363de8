use std::env;
use std::str::FromStr;

pub enum EnvKey {
    DatabaseUrl,
    AmqpUrl,
    StorageBackend,
    MediaRoot,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    WorkDir,
    FfmpegBin,
    FfprobeBin,
    SegmentDuration,
    JobTimeLimit,
    JobSoftTimeLimit,
    MaxAttempts,
    RetryBaseDelay,
    FailedRetentionDays,
    SweepInterval,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::StorageBackend => "STORAGE_BACKEND",
            EnvKey::MediaRoot => "MEDIA_ROOT",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_AUDIO",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::WorkDir => "WORK_DIR",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::FfprobeBin => "FFPROBE_BIN",
            EnvKey::SegmentDuration => "HLS_SEGMENT_DURATION",
            EnvKey::JobTimeLimit => "JOB_TIME_LIMIT_SECS",
            EnvKey::JobSoftTimeLimit => "JOB_SOFT_TIME_LIMIT_SECS",
            EnvKey::MaxAttempts => "JOB_MAX_ATTEMPTS",
            EnvKey::RetryBaseDelay => "JOB_RETRY_BASE_SECS",
            EnvKey::FailedRetentionDays => "FAILED_RETENTION_DAYS",
            EnvKey::SweepInterval => "SWEEP_INTERVAL_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
