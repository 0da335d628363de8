use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review status of a track in the catalog. Stored as lowercase text.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum TrackStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Pending => "pending",
            TrackStatus::Processing => "processing",
            TrackStatus::Approved => "approved",
            TrackStatus::Rejected => "rejected",
        }
    }
}

impl From<String> for TrackStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processing" => TrackStatus::Processing,
            "approved" => TrackStatus::Approved,
            "rejected" => TrackStatus::Rejected,
            _ => TrackStatus::Pending,
        }
    }
}

/// The slice of the catalog's track record the pipeline reads and updates.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Track {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub title: String,
    pub artist_name: String,
    pub audio_file: Option<String>,
    pub hls_manifest: Option<String>,
    pub hls_processed: bool,
    pub duration: Option<i32>,
    pub status: Option<String>,
    pub review_notes: Option<String>,
}
