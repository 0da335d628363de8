use std::path::Path;
use tokio::fs;
use tracing::info;

use super::encoder::SUB_PLAYLIST;
use super::error::PipelineError;
use super::profile::QualityProfile;

pub use crate::infrastructure::storage::paths::MASTER_PLAYLIST;

/// Write the master playlist into `base_dir`, referencing every profile
/// whose sub-playlist actually exists, highest declared bandwidth first.
///
/// A rendition that never made it to disk is silently excluded; zero
/// renditions is an error. Returns the included quality names in manifest
/// order.
pub async fn write_master_playlist(
    base_dir: &Path,
    profiles: &[QualityProfile],
) -> Result<Vec<String>, PipelineError> {
    let mut ordered: Vec<&QualityProfile> = profiles.iter().collect();
    ordered.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));

    let mut included = Vec::new();
    let mut body = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

    for profile in ordered {
        let sub_playlist = base_dir.join(profile.name).join(SUB_PLAYLIST);
        if !fs::try_exists(&sub_playlist).await? {
            continue;
        }

        body.push_str(&format!(
            "#EXT-X-STREAM-INF:BANDWIDTH={},NAME=\"{}\"\n{}/{}\n\n",
            profile.bandwidth, profile.label, profile.name, SUB_PLAYLIST
        ));
        included.push(profile.name.to_string());
    }

    if included.is_empty() {
        return Err(PipelineError::ComposeEmptyInput);
    }

    let master = base_dir.join(MASTER_PLAYLIST);
    fs::write(&master, body).await?;
    info!("created master playlist {}", master.display());

    Ok(included)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::profile::QUALITY_PROFILES;

    async fn make_rendition(base: &Path, name: &str) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(SUB_PLAYLIST), "#EXTM3U\n").await.unwrap();
    }

    #[tokio::test]
    async fn lists_renditions_by_descending_bandwidth() {
        let dir = tempfile::tempdir().unwrap();
        // Create in scrambled order; output order must come from the table.
        make_rendition(dir.path(), "low").await;
        make_rendition(dir.path(), "high").await;
        make_rendition(dir.path(), "med").await;

        let included = write_master_playlist(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert_eq!(included, vec!["high", "med", "low"]);

        let body = fs::read_to_string(dir.path().join(MASTER_PLAYLIST)).await.unwrap();
        assert!(body.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n"));
        let high = body.find("BANDWIDTH=320000").unwrap();
        let med = body.find("BANDWIDTH=192000").unwrap();
        let low = body.find("BANDWIDTH=128000").unwrap();
        assert!(high < med && med < low);
        assert!(body.contains("high/playlist.m3u8"));
        assert!(body.contains("NAME=\"High Quality\""));
    }

    #[tokio::test]
    async fn absent_rendition_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        make_rendition(dir.path(), "high").await;
        make_rendition(dir.path(), "low").await;
        // "med" directory exists but has no sub-playlist.
        fs::create_dir_all(dir.path().join("med")).await.unwrap();

        let included = write_master_playlist(dir.path(), &QUALITY_PROFILES).await.unwrap();
        assert_eq!(included, vec!["high", "low"]);

        let body = fs::read_to_string(dir.path().join(MASTER_PLAYLIST)).await.unwrap();
        assert!(!body.contains("med/playlist.m3u8"));
    }

    #[tokio::test]
    async fn zero_renditions_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_master_playlist(dir.path(), &QUALITY_PROFILES).await.unwrap_err();
        assert!(matches!(err, PipelineError::ComposeEmptyInput));
        assert!(!dir.path().join(MASTER_PLAYLIST).exists());
    }
}
