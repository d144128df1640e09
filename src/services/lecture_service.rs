//! src/services/lecture_service.rs
//!
//! LectureService — the lecture lifecycle on top of a `LectureStore` and a
//! `FileCustody`. It derives the media triple from an upload or a URL, keeps
//! `file_type` populated, and evicts a locally owned file whenever a lecture
//! stops referencing it.
//!
//! Known races: two requests on the same lecture are not coordinated here.
//! Scalar fields end up last-writer-wins and the old file may see two
//! eviction attempts, which is harmless because eviction of a missing file
//! succeeds. The record write always lands before the old file is evicted,
//! so a crash or store failure in between can leak a file on disk but never
//! leaves the record pointing at a removed file.

use crate::{
    models::lecture::{
        Lecture, LectureDraft, LecturePatch, LectureUpdate, MediaFields, MediaSource, NewLecture,
    },
    services::{
        content_type::{last_path_segment, mime_for_filename},
        file_custody::{Eviction, FileCustody},
        lecture_store::LectureStore,
    },
};
use serde::Serialize;
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LectureError {
    #[error("{0}")]
    Validation(String),
    #[error("lecture `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] io::Error),
    #[error(transparent)]
    Internal(#[from] sqlx::Error),
}

pub type LectureResult<T> = Result<T, LectureError>;

/// A file eviction that failed after the record change already went through.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustodyWarning {
    pub file_url: String,
    pub message: String,
}

/// A successful update or delete, plus any file cleanup that did not happen.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub lecture: Lecture,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<CustodyWarning>,
}

#[derive(Clone)]
pub struct LectureService {
    store: Arc<dyn LectureStore>,
    custody: FileCustody,
}

impl LectureService {
    pub fn new(store: Arc<dyn LectureStore>, custody: FileCustody) -> Self {
        Self { store, custody }
    }

    pub fn custody(&self) -> &FileCustody {
        &self.custody
    }

    pub fn store(&self) -> &dyn LectureStore {
        self.store.as_ref()
    }

    /// Create a lecture from exactly one media source.
    ///
    /// The title is checked before the source. Nothing is moved on disk: an
    /// upload is expected to be staged under the storage root already.
    pub async fn create(&self, input: NewLecture) -> LectureResult<Lecture> {
        let title = input
            .title
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LectureError::Validation("title is required".into()))?;
        let source = input
            .source
            .and_then(non_empty_source)
            .ok_or_else(|| LectureError::Validation("a file or URL is required".into()))?;

        let draft = LectureDraft {
            title,
            description: input.description.unwrap_or_default(),
            media: media_fields(source),
            duration: 0.0,
        };
        let lecture = self.store.create(draft).await?;

        info!(
            id = %lecture.id,
            file_url = %lecture.file_url,
            file_type = %lecture.file_type,
            "lecture created"
        );
        Ok(lecture)
    }

    pub async fn list(&self) -> LectureResult<Vec<Lecture>> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get(&self, id: Uuid) -> LectureResult<Lecture> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| LectureError::NotFound(id.to_string()))
    }

    /// Partially update a lecture.
    ///
    /// Empty strings and a zero duration count as "no change". A new media
    /// source replaces the whole media triple; once the record points at it,
    /// the previous file is evicted if it is locally owned and no longer
    /// referenced.
    pub async fn update(&self, id: Uuid, update: LectureUpdate) -> LectureResult<Outcome> {
        if update.duration.is_some_and(|d| !d.is_finite() || d < 0.0) {
            return Err(LectureError::Validation(
                "duration must be a finite, non-negative number".into(),
            ));
        }
        let current = self.get(id).await?;

        let media = update.source.and_then(non_empty_source).map(media_fields);
        let replaced_url = media
            .as_ref()
            .filter(|media| media.file_url != current.file_url)
            .map(|_| current.file_url.clone());
        let patch = LecturePatch {
            title: update.title.filter(|t| !t.is_empty()),
            description: update.description.filter(|d| !d.is_empty()),
            duration: update.duration.filter(|d| *d != 0.0),
            media,
        };

        let lecture = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| LectureError::NotFound(id.to_string()))?;

        let warning = match replaced_url {
            Some(old_url) => self.evict(&old_url).await,
            None => None,
        };

        info!(id = %lecture.id, file_url = %lecture.file_url, "lecture updated");
        Ok(Outcome { lecture, warning })
    }

    /// Remove the record, then evict its file if locally owned.
    ///
    /// A failed eviction does not undo the removal; it comes back as a warning.
    pub async fn delete(&self, id: Uuid) -> LectureResult<Outcome> {
        let lecture = self
            .store
            .delete_by_id(id)
            .await?
            .ok_or_else(|| LectureError::NotFound(id.to_string()))?;
        let warning = self.evict(&lecture.file_url).await;

        info!(
            id = %lecture.id,
            local = lecture.custody().is_local(),
            "lecture deleted"
        );
        Ok(Outcome { lecture, warning })
    }

    async fn evict(&self, file_url: &str) -> Option<CustodyWarning> {
        match self.custody.evict(file_url).await {
            Ok(Eviction::Evicted(path)) => {
                info!(path = %path.display(), "evicted lecture file");
                None
            }
            Ok(Eviction::AlreadyAbsent(_)) | Ok(Eviction::NotOwned) => None,
            Err(err) => {
                warn!(file_url, error = %err, "failed to evict lecture file");
                Some(CustodyWarning {
                    file_url: file_url.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }
}

fn non_empty_source(source: MediaSource) -> Option<MediaSource> {
    match source {
        MediaSource::Url(url) if url.is_empty() => None,
        other => Some(other),
    }
}

/// Derive `file_url`, `file_name` and `file_type` from a media source.
pub fn media_fields(source: MediaSource) -> MediaFields {
    match source {
        MediaSource::Upload(staged) => {
            let file_type = match staged.mime_type {
                Some(mime) if !mime.is_empty() => mime,
                _ => mime_for_filename(&staged.original_name).to_string(),
            };
            MediaFields {
                file_url: FileCustody::local_url(&staged.staged_name),
                file_name: staged.original_name,
                file_type,
            }
        }
        MediaSource::Url(url) => {
            let file_name = last_path_segment(&url).to_string();
            let file_type = mime_for_filename(&file_name).to_string();
            MediaFields {
                file_url: url,
                file_name,
                file_type,
            }
        }
    }
}
