//! HTTP handlers for lecture operations.
//! Uploads are streamed into the storage root while the multipart body is
//! read; everything else is delegated to `LectureService`.

use crate::{
    errors::AppError,
    models::lecture::{Lecture, LectureUpdate, MediaSource, NewLecture, StagedUpload},
    services::{
        content_type::mime_for_filename,
        file_custody::FileCustody,
        lecture_service::{LectureError, LectureService, Outcome},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::io;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

/// Fields accepted by the create and update forms.
#[derive(Debug, Default)]
struct LectureForm {
    title: Option<String>,
    description: Option<String>,
    duration: Option<f64>,
    file_url: Option<String>,
    upload: Option<StagedUpload>,
}

impl LectureForm {
    /// An upload wins over a URL when a client sends both.
    fn source(&mut self) -> Option<MediaSource> {
        match self.upload.take() {
            Some(staged) => Some(MediaSource::Upload(staged)),
            None => self.file_url.take().map(MediaSource::Url),
        }
    }
}

/// Read a lecture form, staging the `file` part under the storage root.
///
/// If reading fails after a file was staged, the staged file is discarded.
async fn read_form(custody: &FileCustody, mut multipart: Multipart) -> Result<LectureForm, AppError> {
    let mut form = LectureForm::default();
    if let Err(err) = fill_form(custody, &mut multipart, &mut form).await {
        if let Some(staged) = form.upload.take() {
            custody.discard(&staged).await;
        }
        return Err(err);
    }
    Ok(form)
}

async fn fill_form(
    custody: &FileCustody,
    multipart: &mut Multipart,
    form: &mut LectureForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = match field.file_name() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    // browsers send an empty part when no file was picked
                    _ => continue,
                };
                let mime_type = field.content_type().map(str::to_string);
                let stream = field.map(|chunk| chunk.map_err(io::Error::other));
                let staged = custody
                    .stage(&original_name, mime_type, stream)
                    .await
                    .map_err(LectureError::from)?;
                if let Some(previous) = form.upload.replace(staged) {
                    custody.discard(&previous).await;
                }
            }
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "fileUrl" => form.file_url = Some(field.text().await?),
            "duration" => {
                let raw = field.text().await?;
                let raw = raw.trim();
                form.duration = if raw.is_empty() {
                    None
                } else {
                    let duration = raw
                        .parse::<f64>()
                        .ok()
                        .filter(|d| d.is_finite())
                        .ok_or_else(|| AppError::bad_request("duration must be a number"))?;
                    Some(duration)
                };
            }
            other => tracing::debug!("ignoring unknown form field `{}`", other),
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(format!("lecture `{}` not found", raw)))
}

/// Discard a staged upload if the operation that was meant to adopt it failed.
async fn discard_on_error<T>(
    custody: &FileCustody,
    staged: Option<StagedUpload>,
    result: Result<T, LectureError>,
) -> Result<T, AppError> {
    if result.is_err() {
        if let Some(staged) = staged {
            custody.discard(&staged).await;
        }
    }
    result.map_err(AppError::from)
}

fn staged_of(source: &Option<MediaSource>) -> Option<StagedUpload> {
    match source {
        Some(MediaSource::Upload(staged)) => Some(staged.clone()),
        _ => None,
    }
}

/// GET `/api/lectures` — every lecture, newest first.
pub async fn list_lectures(
    State(service): State<LectureService>,
) -> Result<Json<Vec<Lecture>>, AppError> {
    Ok(Json(service.list().await?))
}

/// POST `/api/lectures` — multipart form with `title`, `description`, and
/// either a `file` part or a `fileUrl` field.
pub async fn create_lecture(
    State(service): State<LectureService>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = read_form(service.custody(), multipart).await?;
    let source = form.source();
    let staged = staged_of(&source);
    let input = NewLecture {
        title: form.title,
        description: form.description,
        source,
    };

    let result = service.create(input).await;
    let lecture = discard_on_error(service.custody(), staged, result).await?;
    Ok((StatusCode::CREATED, Json(lecture)))
}

/// GET `/api/lectures/{id}`
pub async fn get_lecture(
    State(service): State<LectureService>,
    Path(id): Path<String>,
) -> Result<Json<Lecture>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get(id).await?))
}

/// PUT `/api/lectures/{id}` — partial update; a new `file` or `fileUrl`
/// replaces the current media.
pub async fn update_lecture(
    State(service): State<LectureService>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Outcome>, AppError> {
    let mut form = read_form(service.custody(), multipart).await?;
    let source = form.source();
    let staged = staged_of(&source);
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(err) => {
            if let Some(staged) = staged {
                service.custody().discard(&staged).await;
            }
            return Err(err);
        }
    };
    let update = LectureUpdate {
        title: form.title,
        description: form.description,
        duration: form.duration,
        source,
    };

    let result = service.update(id, update).await;
    Ok(Json(discard_on_error(service.custody(), staged, result).await?))
}

/// DELETE `/api/lectures/{id}` — removes the record; a failed file cleanup
/// is reported under `warning`.
pub async fn delete_lecture(
    State(service): State<LectureService>,
    Path(id): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(service.delete(id).await?))
}

/// GET `/uploads/{name}` — stream a locally owned file.
///
/// The `Content-Type` is the `fileType` of the lecture referencing the file,
/// falling back to the extension when no lecture does.
pub async fn download_upload(
    State(service): State<LectureService>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let file = service.custody().open(&name).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found(format!("upload `{}` not found", name))
        } else {
            AppError::from(LectureError::Storage(err))
        }
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();
    let content_type = service
        .store()
        .find_by_file_url(&FileCustody::local_url(&name))
        .await
        .map_err(LectureError::from)?
        .and_then(|lecture| HeaderValue::from_str(&lecture.file_type).ok())
        .unwrap_or_else(|| HeaderValue::from_static(mime_for_filename(&name)));

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}
