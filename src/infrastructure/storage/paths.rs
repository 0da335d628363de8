//! Canonical key layout for every asset the platform stores.
//!
//! Raw uploads, HLS output and quarantined files are keyed by id so the
//! same input always resolves to the same location. Image keys embed a
//! fresh UUID instead, which avoids collisions without a lookup.

use time::OffsetDateTime;
use uuid::Uuid;

pub const MASTER_PLAYLIST: &str = "playlist.m3u8";
pub const METADATA_FILE: &str = "metadata.json";
pub const FAILURE_LOG_FILE: &str = "failure_log.json";

#[derive(Debug, Clone, Copy)]
pub enum ImageKind {
    TrackCover,
    AlbumCover,
    ArtistProfile,
    ArtistCover,
    PodcastCover,
    PlaylistCover,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::TrackCover => "track_covers",
            ImageKind::AlbumCover => "album_covers",
            ImageKind::ArtistProfile => "artist_profiles",
            ImageKind::ArtistCover => "artist_covers",
            ImageKind::PodcastCover => "podcast_covers",
            ImageKind::PlaylistCover => "playlist_covers",
        }
    }
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// `raw/{artist_id}/{track_id}/original.{ext}`
pub fn raw_original(artist_id: Uuid, track_id: Uuid, ext: &str) -> String {
    format!("raw/{}/{}/original.{}", artist_id, track_id, normalize_ext(ext))
}

pub fn raw_base(artist_id: Uuid, track_id: Uuid) -> String {
    format!("raw/{}/{}", artist_id, track_id)
}

/// `hls/{track_id}`
pub fn hls_base(track_id: Uuid) -> String {
    format!("hls/{}", track_id)
}

pub fn hls_manifest(track_id: Uuid) -> String {
    format!("hls/{}/{}", track_id, MASTER_PLAYLIST)
}

pub fn hls_metadata(track_id: Uuid) -> String {
    format!("hls/{}/{}", track_id, METADATA_FILE)
}

/// `failed/{track_id}`
pub fn failed_base(track_id: Uuid) -> String {
    format!("failed/{}", track_id)
}

pub fn failure_log(track_id: Uuid) -> String {
    format!("failed/{}/{}", track_id, FAILURE_LOG_FILE)
}

/// `images/{type}/{year}/{month}/{uuid}.{ext}`
pub fn image(kind: ImageKind, ext: &str) -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "images/{}/{}/{:02}/{}.{}",
        kind.as_str(),
        now.year(),
        u8::from(now.month()),
        Uuid::new_v4(),
        normalize_ext(ext)
    )
}
