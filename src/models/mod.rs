//! Core data models for the lecture resource service.
//!
//! `Lecture` maps to the `lectures` table via `sqlx::FromRow` and serializes
//! as camelCase JSON via `serde`. The remaining types describe inputs to the
//! service layer.

pub mod lecture;
