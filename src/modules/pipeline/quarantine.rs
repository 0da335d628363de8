use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::infrastructure::storage::{paths, Storage};
use crate::modules::catalog::model::Track;

/// Structured record written next to the quarantined upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureLog {
    pub track_id: Uuid,
    pub track_title: String,
    pub artist: String,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub original_file: String,
}

/// Copy the raw upload and a failure log into `failed/{track_id}/`.
///
/// The quarantine entry is owned by the retention sweeper from here on.
pub async fn move_to_failed(storage: &Storage, track: &Track, reason: &str) -> Result<()> {
    let base = paths::failed_base(track.id);

    let original_file = track.audio_file.clone().unwrap_or_default();
    if !original_file.is_empty() {
        match storage.read(&original_file).await {
            Ok(data) => {
                let filename = original_file.rsplit('/').next().unwrap_or("original");
                storage.write(&format!("{}/{}", base, filename), &data).await?;
            }
            Err(e) => {
                // Still write the log: the reason may be exactly that the
                // source is gone.
                warn!("could not copy raw file into quarantine: {}", e);
            }
        }
    }

    let log = FailureLog {
        track_id: track.id,
        track_title: track.title.clone(),
        artist: track.artist_name.clone(),
        reason: reason.to_string(),
        timestamp: OffsetDateTime::now_utc(),
        original_file,
    };

    storage
        .write(&paths::failure_log(track.id), &serde_json::to_vec_pretty(&log)?)
        .await?;

    info!("quarantined track {} ({})", track.id, reason);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::local::LocalStorage;

    fn track_with_file(key: &str) -> Track {
        Track {
            id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            title: "Demo Song".into(),
            artist_name: "Demo Artist".into(),
            audio_file: Some(key.to_string()),
            hls_manifest: None,
            hls_processed: false,
            duration: None,
            status: None,
            review_notes: None,
        }
    }

    #[tokio::test]
    async fn copies_raw_file_and_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::Local(LocalStorage::new(dir.path()));

        let track = track_with_file("raw/a/b/original.mp3");
        storage.write("raw/a/b/original.mp3", b"audio-bytes").await.unwrap();

        move_to_failed(&storage, &track, "encoding failed for quality: low")
            .await
            .unwrap();

        let base = paths::failed_base(track.id);
        assert_eq!(
            storage.read(&format!("{}/original.mp3", base)).await.unwrap(),
            b"audio-bytes"
        );

        let log: FailureLog =
            serde_json::from_slice(&storage.read(&paths::failure_log(track.id)).await.unwrap())
                .unwrap();
        assert_eq!(log.track_id, track.id);
        assert!(log.reason.contains("low"));
        assert_eq!(log.original_file, "raw/a/b/original.mp3");
    }

    #[tokio::test]
    async fn missing_raw_file_still_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::Local(LocalStorage::new(dir.path()));

        let track = track_with_file("raw/a/b/original.mp3");
        move_to_failed(&storage, &track, "source audio file missing")
            .await
            .unwrap();

        assert!(storage.exists(&paths::failure_log(track.id)).await.unwrap());
    }
}
