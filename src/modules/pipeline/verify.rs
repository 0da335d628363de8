use std::path::Path;
use tokio::fs;

use super::encoder::SUB_PLAYLIST;
use super::manifest::MASTER_PLAYLIST;
use super::profile::QualityProfile;

pub use crate::infrastructure::storage::paths::METADATA_FILE;

/// Post-hoc check of the produced HLS tree.
///
/// Hard errors fail the job; warnings are logged by the caller and do not.
#[derive(Debug, Default)]
pub struct VerificationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub async fn verify_hls_structure(
    base_dir: &Path,
    profiles: &[QualityProfile],
) -> std::io::Result<VerificationReport> {
    let mut report = VerificationReport::default();

    let master = base_dir.join(MASTER_PLAYLIST);
    match fs::metadata(&master).await {
        Ok(meta) if meta.len() == 0 => report.errors.push("master playlist.m3u8 is empty".into()),
        Ok(_) => {}
        Err(_) => report.errors.push("master playlist.m3u8 not found".into()),
    }

    for profile in profiles {
        let quality_dir = base_dir.join(profile.name);
        if !fs::try_exists(&quality_dir).await? {
            report.warnings.push(format!("{} quality directory not found", profile.name));
            continue;
        }

        if !fs::try_exists(quality_dir.join(SUB_PLAYLIST)).await? {
            report.warnings.push(format!("{} playlist.m3u8 not found", profile.name));
        }

        let mut segments = 0usize;
        let mut entries = fs::read_dir(&quality_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".ts") {
                segments += 1;
            }
        }
        if segments == 0 {
            report.errors.push(format!("{} has no segments", profile.name));
        }
    }

    if !fs::try_exists(base_dir.join(METADATA_FILE)).await? {
        report.warnings.push("metadata.json not found".into());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::profile::QUALITY_PROFILES;

    async fn full_rendition(base: &Path, name: &str) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(SUB_PLAYLIST), "#EXTM3U\n").await.unwrap();
        fs::write(dir.join("segment_000.ts"), b"ts").await.unwrap();
    }

    #[tokio::test]
    async fn complete_tree_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MASTER_PLAYLIST), "#EXTM3U\n").await.unwrap();
        fs::write(dir.path().join(METADATA_FILE), "{}").await.unwrap();
        for profile in &QUALITY_PROFILES {
            full_rendition(dir.path(), profile.name).await;
        }

        let report = verify_hls_structure(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn missing_master_playlist_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        for profile in &QUALITY_PROFILES {
            full_rendition(dir.path(), profile.name).await;
        }

        let report = verify_hls_structure(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("master")));
    }

    #[tokio::test]
    async fn playlist_without_segments_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MASTER_PLAYLIST), "#EXTM3U\n").await.unwrap();
        fs::write(dir.path().join(METADATA_FILE), "{}").await.unwrap();
        full_rendition(dir.path(), "high").await;
        full_rendition(dir.path(), "med").await;
        // "low" has a sub-playlist but zero segments.
        let low = dir.path().join("low");
        fs::create_dir_all(&low).await.unwrap();
        fs::write(low.join(SUB_PLAYLIST), "#EXTM3U\n").await.unwrap();

        let report = verify_hls_structure(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("low has no segments")));
    }

    #[tokio::test]
    async fn missing_quality_dir_and_metadata_are_warnings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MASTER_PLAYLIST), "#EXTM3U\n").await.unwrap();
        full_rendition(dir.path(), "high").await;
        full_rendition(dir.path(), "med").await;

        let report = verify_hls_structure(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("low")));
        assert!(report.warnings.iter().any(|w| w.contains("metadata.json")));
    }
}
