//! src/services/lecture_store.rs
//!
//! Persistence for lecture records. The service layer talks to the
//! `LectureStore` trait; `SqliteLectureStore` is the production backend.
//! Every mutation is a single statement, so SQLite's row-level atomicity is
//! the only coordination between concurrent requests on the same lecture.

use crate::models::lecture::{Lecture, LectureDraft, LecturePatch};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Schema applied by `--migrate` and by tests.
pub const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

const LECTURE_COLUMNS: &str = "id, title, description, file_url, file_name, file_type, \
                               duration, created_at, updated_at";

/// Document-store style access to lecture records.
#[async_trait]
pub trait LectureStore: Send + Sync {
    /// Insert a new record and return it with its assigned id.
    async fn create(&self, draft: LectureDraft) -> Result<Lecture, sqlx::Error>;

    /// All records, newest first.
    async fn find_all(&self) -> Result<Vec<Lecture>, sqlx::Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lecture>, sqlx::Error>;

    /// Newest record referencing `file_url`, if any.
    async fn find_by_file_url(&self, file_url: &str) -> Result<Option<Lecture>, sqlx::Error>;

    /// Apply a patch; `None` when the record does not exist.
    async fn update(&self, id: Uuid, patch: LecturePatch) -> Result<Option<Lecture>, sqlx::Error>;

    /// Remove a record and return what was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Lecture>, sqlx::Error>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteLectureStore {
    /// Shared SQLite connection pool.
    db: Arc<SqlitePool>,
}

impl SqliteLectureStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LectureStore for SqliteLectureStore {
    async fn create(&self, draft: LectureDraft) -> Result<Lecture, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Lecture>(&format!(
            "INSERT INTO lectures (
                id, title, description, file_url, file_name, file_type,
                duration, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {LECTURE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.media.file_url)
        .bind(&draft.media.file_name)
        .bind(&draft.media.file_type)
        .bind(draft.duration)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
    }

    async fn find_all(&self) -> Result<Vec<Lecture>, sqlx::Error> {
        sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&*self.db)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Lecture>, sqlx::Error> {
        sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    async fn find_by_file_url(&self, file_url: &str) -> Result<Option<Lecture>, sqlx::Error> {
        sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures WHERE file_url = ?
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(file_url)
        .fetch_optional(&*self.db)
        .await
    }

    async fn update(&self, id: Uuid, patch: LecturePatch) -> Result<Option<Lecture>, sqlx::Error> {
        let (file_url, file_name, file_type) = match patch.media {
            Some(media) => (
                Some(media.file_url),
                Some(media.file_name),
                Some(media.file_type),
            ),
            None => (None, None, None),
        };

        sqlx::query_as::<_, Lecture>(&format!(
            "UPDATE lectures SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                duration = COALESCE(?, duration),
                file_url = COALESCE(?, file_url),
                file_name = COALESCE(?, file_name),
                file_type = COALESCE(?, file_type),
                updated_at = ?
             WHERE id = ?
             RETURNING {LECTURE_COLUMNS}"
        ))
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.duration)
        .bind(file_url)
        .bind(file_name)
        .bind(file_type)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Lecture>, sqlx::Error> {
        sqlx::query_as::<_, Lecture>(&format!(
            "DELETE FROM lectures WHERE id = ? RETURNING {LECTURE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
            .map(|_| ())
    }
}

/// Run the embedded schema statement by statement.
pub async fn apply_schema(db: &SqlitePool) -> Result<usize, sqlx::Error> {
    let statements = SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(statements.len())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> Arc<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    apply_schema(&pool).await.unwrap();
    Arc::new(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lecture::MediaFields;

    fn draft(title: &str) -> LectureDraft {
        LectureDraft {
            title: title.to_string(),
            description: String::new(),
            media: MediaFields {
                file_url: format!("https://cdn.test/{title}.mp4"),
                file_name: format!("{title}.mp4"),
                file_type: "video/mp4".into(),
            },
            duration: 0.0,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let store = SqliteLectureStore::new(memory_pool().await);

        let created = store.create(draft("intro")).await.unwrap();
        let found = store.find_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(found, created);
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn find_all_is_newest_first() {
        let store = SqliteLectureStore::new(memory_pool().await);
        for title in ["first", "second", "third"] {
            store.create(draft(title)).await.unwrap();
        }

        let titles: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();

        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn update_keeps_columns_left_as_none() {
        let store = SqliteLectureStore::new(memory_pool().await);
        let created = store.create(draft("intro")).await.unwrap();

        let updated = store
            .update(
                created.id,
                LecturePatch {
                    duration: Some(42.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.duration, 42.5);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.file_url, created.file_url);
        assert_eq!(updated.file_type, created.file_type);
    }

    #[tokio::test]
    async fn missing_rows_yield_none() {
        let store = SqliteLectureStore::new(memory_pool().await);
        let id = Uuid::new_v4();

        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert!(store.update(id, LecturePatch::default()).await.unwrap().is_none());
        assert!(store.delete_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_file_url_matches_exactly() {
        let store = SqliteLectureStore::new(memory_pool().await);
        let created = store.create(draft("intro")).await.unwrap();

        let found = store
            .find_by_file_url("https://cdn.test/intro.mp4")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, created.id);
        assert!(
            store
                .find_by_file_url("https://cdn.test/other.mp4")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let store = SqliteLectureStore::new(memory_pool().await);
        let created = store.create(draft("intro")).await.unwrap();

        let removed = store.delete_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(removed.id, created.id);
        assert!(store.find_all().await.unwrap().is_empty());
    }
}
