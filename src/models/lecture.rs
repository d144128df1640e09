//! Represents a lecture and the media it points at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Path prefix marking a `file_url` as held in local storage.
pub const UPLOADS_MARKER: &str = "/uploads/";

/// A lecture record as persisted in SQLite.
///
/// `file_url` is kept as a plain string so existing consumers keep seeing
/// `/uploads/<name>` or the external URL verbatim. Use [`Lecture::custody`]
/// instead of inspecting the prefix by hand.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    /// Store-assigned identifier.
    pub id: Uuid,

    /// Human-readable title, never empty.
    pub title: String,

    /// Free-form description, empty when not supplied.
    pub description: String,

    /// Either `/uploads/<staged name>` or an external URL.
    pub file_url: String,

    /// Original filename, used for download naming.
    pub file_name: String,

    /// MIME type of the media.
    pub file_type: String,

    /// Advisory duration in seconds.
    pub duration: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lecture {
    /// Decide who owns the file behind `file_url`.
    pub fn custody(&self) -> Custody<'_> {
        Custody::of(&self.file_url)
    }
}

/// Ownership of the file a `file_url` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Custody<'a> {
    /// Held under the storage root; carries the path after the marker.
    Local(&'a str),
    /// Somewhere else. Never touched on disk.
    External(&'a str),
}

impl<'a> Custody<'a> {
    pub fn of(file_url: &'a str) -> Self {
        match file_url.strip_prefix(UPLOADS_MARKER) {
            Some(relative) => Custody::Local(relative),
            None => Custody::External(file_url),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Custody::Local(_))
    }
}

/// Descriptor of a file the transfer layer already wrote under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// Unique name of the file inside the storage root.
    pub staged_name: String,
    /// Filename as sent by the client.
    pub original_name: String,
    /// MIME type reported by the client, if any.
    pub mime_type: Option<String>,
}

/// Where a lecture's media comes from, decided once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Upload(StagedUpload),
    Url(String),
}

/// The `file_url` / `file_name` / `file_type` triple derived from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFields {
    pub file_url: String,
    pub file_name: String,
    pub file_type: String,
}

/// Input for creating a lecture.
#[derive(Debug, Clone, Default)]
pub struct NewLecture {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<MediaSource>,
}

/// Input for updating a lecture. Absent or falsy values mean "no change".
#[derive(Debug, Clone, Default)]
pub struct LectureUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub source: Option<MediaSource>,
}

/// A validated lecture ready to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct LectureDraft {
    pub title: String,
    pub description: String,
    pub media: MediaFields,
    pub duration: f64,
}

/// Column-level patch handed to the store; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct LecturePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub media: Option<MediaFields>,
}
