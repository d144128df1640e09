//! Defines routes for lecture operations and local file downloads.
//!
//! ## Structure
//! - **Lecture endpoints**
//!   - `GET    /api/lectures`      — list lectures, newest first
//!   - `POST   /api/lectures`      — create from an upload or a URL (multipart)
//!   - `GET    /api/lectures/{id}` — fetch one lecture
//!   - `PUT    /api/lectures/{id}` — partial update, optional media replacement (multipart)
//!   - `DELETE /api/lectures/{id}` — delete lecture and its local file
//!
//! - **Files**
//!   - `GET    /uploads/{name}`    — stream a locally stored file

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        lecture_handlers::{
            create_lecture, delete_lecture, download_upload, get_lecture, list_lectures,
            update_lecture,
        },
    },
    services::lecture_service::LectureService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};

/// Build and return the router for all lecture routes.
///
/// The router carries shared state (`LectureService`) to all handlers.
/// `max_body_bytes` bounds multipart uploads.
pub fn routes(max_body_bytes: usize) -> Router<LectureService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/lectures", get(list_lectures).post(create_lecture))
        .route(
            "/api/lectures/{id}",
            get(get_lecture).put(update_lecture).delete(delete_lecture),
        )
        .route("/uploads/{name}", get(download_upload))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}
