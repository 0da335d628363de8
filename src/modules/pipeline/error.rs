use thiserror::Error;

/// Everything that can terminate a transcode job.
///
/// Component failures (probe, encoder, verifier) are captured as values and
/// folded into this taxonomy by the orchestrator; nothing panics across the
/// orchestrator boundary. A degraded probe is deliberately not represented
/// here: the pipeline proceeds with default metadata instead of failing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source audio file missing: {key}")]
    SourceMissing { key: String },

    #[error("encoding failed for quality: {}", .qualities.join(", "))]
    EncodeFailed { qualities: Vec<String> },

    #[error("no renditions available for master playlist")]
    ComposeEmptyInput,

    #[error("HLS verification failed: {}", .errors.join("; "))]
    VerifyFailed { errors: Vec<String> },

    #[error("job exceeded {limit_secs}s wall clock limit")]
    Timeout { limit_secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Storage(err)
    }
}

impl PipelineError {
    /// A missing source will not appear on a retry; everything else might
    /// have been transient (tool crash, storage hiccup, timeout).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::SourceMissing { .. })
    }
}
