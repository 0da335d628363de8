use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::warn;
use uuid::Uuid;

use crate::infrastructure::db::pool::DbPool;

/// Phases of one transcoding attempt, in order. A job only ever moves
/// forward through these; a retry is a fresh attempt that starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Queued,
    Probing,
    Encoding,
    Composing,
    Verifying,
    Succeeded,
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Queued => "queued",
            JobPhase::Probing => "probing",
            JobPhase::Encoding => "encoding",
            JobPhase::Composing => "composing",
            JobPhase::Verifying => "verifying",
            JobPhase::Succeeded => "succeeded",
            JobPhase::Failed => "failed",
        }
    }

    pub fn from_db(s: &str) -> JobPhase {
        match s {
            "probing" => JobPhase::Probing,
            "encoding" => JobPhase::Encoding,
            "composing" => JobPhase::Composing,
            "verifying" => JobPhase::Verifying,
            "succeeded" => JobPhase::Succeeded,
            "failed" => JobPhase::Failed,
            _ => JobPhase::Queued,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            JobPhase::Queued => 0,
            JobPhase::Probing => 1,
            JobPhase::Encoding => 2,
            JobPhase::Composing => 3,
            JobPhase::Verifying => 4,
            JobPhase::Succeeded => 5,
            JobPhase::Failed => 5,
        }
    }
}

/// Queue payload for one transcoding attempt. The attempt counter lives in
/// the message itself so retry accounting does not depend on any queue
/// framework feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub track_id: Uuid,
    #[serde(default)]
    pub attempt: u32,
}

impl TranscodeJob {
    pub fn new(track_id: Uuid) -> Self {
        Self { track_id, attempt: 0 }
    }

    pub fn next_attempt(&self) -> Self {
        Self { track_id: self.track_id, attempt: self.attempt + 1 }
    }
}

/// Where the orchestrator reports phase transitions.
pub trait JobSink: Send + Sync {
    fn transition(
        &self,
        track_id: Uuid,
        phase: JobPhase,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Durable job bookkeeping in the `transcode_jobs` table. Every call is a
/// single short statement so no database resources are held across the
/// blocking tool invocations.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_job(&self, track_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transcode_jobs (track_id, phase, attempts, enqueued_at)
            VALUES ($1, 'queued', 0, NOW())
            ON CONFLICT (track_id) DO NOTHING
            "#,
        )
        .bind(track_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Begin attempt number `attempt`. Resets the phase: a new attempt
    /// restarts the state machine from the top.
    pub async fn mark_started(&self, track_id: Uuid, attempt: u32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET phase = 'queued', attempts = $2, started_at = NOW(), finished_at = NULL
            WHERE track_id = $1
            "#,
        )
        .bind(track_id)
        .bind(attempt as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_success(&self, track_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET phase = 'succeeded', last_error = NULL, finished_at = NOW()
            WHERE track_id = $1
            "#,
        )
        .bind(track_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_failure(&self, track_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transcode_jobs
            SET phase = 'failed', last_error = $2, finished_at = NOW()
            WHERE track_id = $1
            "#,
        )
        .bind(track_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl JobSink for PgJobStore {
    async fn transition(&self, track_id: Uuid, phase: JobPhase) -> Result<()> {
        let current: Option<String> =
            sqlx::query_scalar("SELECT phase FROM transcode_jobs WHERE track_id = $1")
                .bind(track_id)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(current) = current {
            if JobPhase::from_db(&current).rank() > phase.rank() {
                warn!(
                    "ignoring backward phase transition {} -> {} for {}",
                    current,
                    phase.as_str(),
                    track_id
                );
                return Ok(());
            }
        }

        sqlx::query("UPDATE transcode_jobs SET phase = $2 WHERE track_id = $1")
            .bind(track_id)
            .bind(phase.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_never_rank_backward() {
        let order = [
            JobPhase::Queued,
            JobPhase::Probing,
            JobPhase::Encoding,
            JobPhase::Composing,
            JobPhase::Verifying,
            JobPhase::Succeeded,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert_eq!(JobPhase::Succeeded.rank(), JobPhase::Failed.rank());
    }

    #[test]
    fn phase_round_trips_through_db_strings() {
        for phase in [
            JobPhase::Queued,
            JobPhase::Probing,
            JobPhase::Encoding,
            JobPhase::Composing,
            JobPhase::Verifying,
            JobPhase::Succeeded,
            JobPhase::Failed,
        ] {
            assert_eq!(JobPhase::from_db(phase.as_str()), phase);
        }
    }

    #[test]
    fn job_payload_counts_attempts_explicitly() {
        let job = TranscodeJob::new(Uuid::new_v4());
        assert_eq!(job.attempt, 0);
        assert_eq!(job.next_attempt().attempt, 1);

        // Payloads published before the attempt field existed still parse.
        let legacy: TranscodeJob =
            serde_json::from_str(&format!(r#"{{"track_id":"{}"}}"#, job.track_id)).unwrap();
        assert_eq!(legacy.attempt, 0);
    }
}
