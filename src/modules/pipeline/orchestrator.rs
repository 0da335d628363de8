use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::{paths, Storage};
use crate::modules::catalog::model::Track;

use super::encoder::{self, EncodeOutcome};
use super::error::PipelineError;
use super::job::{JobPhase, JobSink};
use super::manifest;
use super::probe::{probe_audio, AudioMetadata};
use super::process::{CommandRunner, RunLimits};
use super::profile::QUALITY_PROFILES;
use super::quarantine;
use super::verify::{self, METADATA_FILE};

/// Probing is cheap; never let a wedged ffprobe eat the whole job budget.
const PROBE_CAP: Duration = Duration::from_secs(60);

/// Metadata document written beside the master playlist.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    #[serde(flatten)]
    pub audio: AudioMetadata,
    pub track_id: Uuid,
    pub track_title: String,
    pub artist: String,
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: OffsetDateTime,
    pub qualities: Vec<String>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub manifest_key: String,
    pub duration_secs: i32,
    pub qualities: Vec<String>,
}

/// Wall clock budget for one job, shared by every tool invocation.
struct Budget {
    start: Instant,
    soft: Duration,
    hard: Duration,
}

impl Budget {
    fn limits(&self) -> Result<RunLimits, PipelineError> {
        let elapsed = self.start.elapsed();
        if elapsed >= self.hard {
            return Err(PipelineError::Timeout { limit_secs: self.hard.as_secs() });
        }
        let hard_rem = self.hard - elapsed;
        let soft_rem = self
            .soft
            .checked_sub(elapsed)
            .unwrap_or(Duration::from_secs(1))
            .min(hard_rem);
        Ok(RunLimits::new(soft_rem, hard_rem))
    }

    fn timeout(&self) -> PipelineError {
        PipelineError::Timeout { limit_secs: self.hard.as_secs() }
    }
}

/// Drives one transcode job through probe, encode, compose and verify, and
/// persists the resulting tree to storage. The single place that decides
/// what is fatal, what is retryable and what merely degrades.
pub struct Pipeline<'a, R: CommandRunner> {
    config: &'a AppConfig,
    storage: &'a Storage,
    runner: &'a R,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    pub fn new(config: &'a AppConfig, storage: &'a Storage, runner: &'a R) -> Self {
        Self { config, storage, runner }
    }

    pub async fn run<S: JobSink>(
        &self,
        track: &Track,
        sink: &S,
    ) -> Result<PipelineOutcome, PipelineError> {
        let work_dir = Path::new(&self.config.work_dir).join(track.id.to_string());
        let budget = Budget {
            start: Instant::now(),
            soft: Duration::from_secs(self.config.job_soft_time_limit_secs),
            hard: Duration::from_secs(self.config.job_time_limit_secs),
        };

        let result = self.run_inner(track, sink, &work_dir, &budget).await;

        // The work dir is scratch space; the tree of record lives in storage.
        if let Err(e) = fs::remove_dir_all(&work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove work dir {}: {}", work_dir.display(), e);
            }
        }

        result
    }

    async fn run_inner<S: JobSink>(
        &self,
        track: &Track,
        sink: &S,
        work_dir: &Path,
        budget: &Budget,
    ) -> Result<PipelineOutcome, PipelineError> {
        info!("starting HLS processing for track '{}' ({})", track.title, track.id);
        self.note_phase(sink, track.id, JobPhase::Probing).await;

        let input_path = self.fetch_raw(track, work_dir).await?;

        // The staged input lives at the work dir root; everything below
        // `out_dir` is the publishable tree.
        let out_dir = work_dir.join("hls");
        fs::create_dir_all(&out_dir).await?;

        let metadata = probe_audio(
            self.runner,
            &self.config.ffprobe_bin,
            &input_path,
            cap_probe(budget.limits()?),
        )
        .await;
        if metadata == AudioMetadata::default() {
            warn!("proceeding with degraded metadata for track {}", track.id);
        }

        self.note_phase(sink, track.id, JobPhase::Encoding).await;
        self.encode_renditions(track.id, &input_path, &out_dir, budget).await?;

        self.note_phase(sink, track.id, JobPhase::Composing).await;
        let qualities = manifest::write_master_playlist(&out_dir, &QUALITY_PROFILES).await?;

        self.write_metadata(track, &out_dir, &metadata, &qualities).await?;

        self.note_phase(sink, track.id, JobPhase::Verifying).await;
        let report = verify::verify_hls_structure(&out_dir, &QUALITY_PROFILES).await?;
        for warning in &report.warnings {
            warn!("verification warning for {}: {}", track.id, warning);
        }
        if !report.is_valid() {
            return Err(PipelineError::VerifyFailed { errors: report.errors });
        }

        self.upload_tree(&out_dir, &paths::hls_base(track.id)).await?;

        info!("successfully processed track '{}' ({})", track.title, track.id);
        Ok(PipelineOutcome {
            manifest_key: paths::hls_manifest(track.id),
            duration_secs: metadata.duration as i32,
            qualities,
        })
    }

    /// Resolve the raw upload and stage it into the work dir.
    async fn fetch_raw(&self, track: &Track, work_dir: &Path) -> Result<PathBuf, PipelineError> {
        let raw_key = track
            .audio_file
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PipelineError::SourceMissing { key: "<no audio file>".into() })?;

        if !self.storage.exists(&raw_key).await? {
            return Err(PipelineError::SourceMissing { key: raw_key });
        }

        let ext = Path::new(&raw_key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let input_path = work_dir.join(format!("original.{}", ext));

        fs::create_dir_all(work_dir).await?;
        let data = self.storage.read(&raw_key).await?;
        fs::write(&input_path, data).await?;

        Ok(input_path)
    }

    /// Encode every configured profile. All profiles are attempted before
    /// the job fails, so the failure reason names every bad rendition.
    async fn encode_renditions(
        &self,
        track_id: Uuid,
        input: &Path,
        out_dir: &Path,
        budget: &Budget,
    ) -> Result<(), PipelineError> {
        let mut failed = Vec::new();

        for profile in &QUALITY_PROFILES {
            info!(quality = profile.name, "encoding rendition");
            let outcome = encoder::encode_quality(
                self.runner,
                &self.config.ffmpeg_bin,
                input,
                &out_dir.join(profile.name),
                profile,
                self.config.segment_duration,
                budget.limits()?,
            )
            .await?;

            match outcome {
                EncodeOutcome::Success => {}
                EncodeOutcome::Failed => failed.push(profile.name.to_string()),
                EncodeOutcome::TimedOut => return Err(budget.timeout()),
            }
        }

        if !failed.is_empty() {
            return Err(PipelineError::EncodeFailed { qualities: failed });
        }

        // Archival 320k AAC copy of the upload, served for downloads.
        let archive = out_dir.join(format!("{}.m4a", track_id));
        match encoder::encode_archive_copy(
            self.runner,
            &self.config.ffmpeg_bin,
            input,
            &archive,
            budget.limits()?,
        )
        .await?
        {
            EncodeOutcome::Success => Ok(()),
            EncodeOutcome::Failed => {
                Err(PipelineError::EncodeFailed { qualities: vec!["original".into()] })
            }
            EncodeOutcome::TimedOut => Err(budget.timeout()),
        }
    }

    async fn write_metadata(
        &self,
        track: &Track,
        out_dir: &Path,
        audio: &AudioMetadata,
        qualities: &[String],
    ) -> Result<(), PipelineError> {
        let metadata = ProcessingMetadata {
            audio: audio.clone(),
            track_id: track.id,
            track_title: track.title.clone(),
            artist: track.artist_name.clone(),
            processed_at: OffsetDateTime::now_utc(),
            qualities: qualities.to_vec(),
        };

        let body = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| PipelineError::Storage(e.into()))?;
        fs::write(out_dir.join(METADATA_FILE), body).await?;
        Ok(())
    }

    /// Persist the finished tree under `prefix`. The layout is exactly two
    /// levels deep: base files plus one directory per rendition.
    async fn upload_tree(&self, dir: &Path, prefix: &str) -> Result<(), PipelineError> {
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                let mut sub = fs::read_dir(entry.path()).await?;
                while let Some(file) = sub.next_entry().await? {
                    if file.file_type().await?.is_file() {
                        let data = fs::read(file.path()).await?;
                        let key = format!(
                            "{}/{}/{}",
                            prefix,
                            name,
                            file.file_name().to_string_lossy()
                        );
                        self.storage.write(&key, &data).await?;
                    }
                }
            } else {
                let data = fs::read(entry.path()).await?;
                self.storage.write(&format!("{}/{}", prefix, name), &data).await?;
            }
        }
        Ok(())
    }

    /// Copy the raw input and a structured failure log into quarantine.
    pub async fn quarantine_failure(&self, track: &Track, reason: &str) -> anyhow::Result<()> {
        quarantine::move_to_failed(self.storage, track, reason).await
    }

    /// Deterministic cleanup hook for the catalog: removes the HLS tree,
    /// any quarantine entry, and the raw upload.
    pub async fn purge_all_artifacts(&self, track_id: Uuid, artist_id: Uuid) -> anyhow::Result<()> {
        self.storage.delete_prefix(&paths::hls_base(track_id)).await?;
        self.storage.delete_prefix(&paths::failed_base(track_id)).await?;
        self.storage.delete_prefix(&paths::raw_base(artist_id, track_id)).await?;
        info!("purged all artifacts for track {}", track_id);
        Ok(())
    }

    async fn note_phase<S: JobSink>(&self, sink: &S, track_id: Uuid, phase: JobPhase) {
        if let Err(e) = sink.transition(track_id, phase).await {
            warn!("could not record phase {} for {}: {}", phase.as_str(), track_id, e);
        }
    }
}

fn cap_probe(limits: RunLimits) -> RunLimits {
    RunLimits::new(limits.soft.min(PROBE_CAP), limits.hard.min(PROBE_CAP))
}
