//! Service layer: lecture lifecycle, file custody, persistence, MIME lookup.

pub mod content_type;
pub mod file_custody;
pub mod lecture_service;
pub mod lecture_store;
