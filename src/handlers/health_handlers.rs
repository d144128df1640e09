//! Health & readiness handlers.
//!
//! - GET /healthz  -> liveness, no I/O
//! - GET /readyz   -> readiness of the lecture store and the uploads root

use crate::services::lecture_service::LectureService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    store: CheckStatus,
    uploads: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<E: std::fmt::Display> From<Result<(), E>> for CheckStatus {
    fn from(result: Result<(), E>) -> Self {
        Self {
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    }
}

/// `GET /healthz`
pub async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// `GET /readyz`
///
/// 200 when the store answers a ping and the uploads root accepts a
/// write/read/remove cycle, 503 otherwise.
pub async fn readyz(State(service): State<LectureService>) -> impl IntoResponse {
    let store = CheckStatus::from(service.store().ping().await);
    let uploads = CheckStatus::from(service.custody().probe().await);

    if !uploads.ok {
        tracing::warn!(error = ?uploads.error, "uploads root failed readiness probe");
    }

    let ready = store.ok && uploads.ok;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" },
        store,
        uploads,
    };
    (status, Json(body))
}
