use anyhow::Result;
use uuid::Uuid;

use crate::infrastructure::db::pool::DbPool;
use super::model::{Track, TrackStatus};

pub struct TrackRepository;

impl TrackRepository {
    pub async fn get_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Track>> {
        let track = sqlx::query_as::<_, Track>(
            r#"
            SELECT t.id, t.artist_id, t.title, a.stage_name AS artist_name,
                   t.audio_file, t.hls_manifest, t.hls_processed, t.duration,
                   t.status, t.review_notes
            FROM tracks t
            JOIN artists a ON a.id = t.artist_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(track)
    }

    pub async fn mark_processing(pool: &DbPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE tracks SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(TrackStatus::Processing.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Success contract: manifest location, duration and processed flag,
    /// and the track goes live as approved.
    pub async fn mark_approved(
        pool: &DbPool,
        id: Uuid,
        hls_manifest: &str,
        duration: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tracks
            SET hls_manifest = $2, hls_processed = TRUE, status = $4,
                duration = $3, review_notes = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hls_manifest)
        .bind(duration)
        .bind(TrackStatus::Approved.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Failure contract: rejected with a human-readable reason for review.
    pub async fn mark_rejected(pool: &DbPool, id: Uuid, review_notes: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tracks
            SET status = $3, review_notes = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(review_notes)
        .bind(TrackStatus::Rejected.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }
}
