//! src/services/file_custody.rs
//!
//! FileCustody — owns the local storage root. It stages incoming uploads,
//! serves them back, and evicts files that a lecture no longer references.
//! Only paths behind the `/uploads/` marker are ever touched on disk.

use crate::models::lecture::{Custody, StagedUpload, UPLOADS_MARKER};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_STAGED_NAME_LEN: usize = 255;
const MAX_EXTENSION_LEN: usize = 16;

/// Result of an eviction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eviction {
    /// The file existed and was removed.
    Evicted(PathBuf),
    /// Nothing was on disk; counts as success.
    AlreadyAbsent(PathBuf),
    /// The URL is external, no filesystem call was made.
    NotOwned,
}

#[derive(Debug, Error)]
pub enum CustodyError {
    #[error("refusing to touch `{0}`: not a plain name under the storage root")]
    UnsafePath(String),
    #[error("failed to remove {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct FileCustody {
    /// Directory holding every locally owned file.
    root: PathBuf,
}

impl FileCustody {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage root if it is missing.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Build the `file_url` under which a staged file is referenced.
    pub fn local_url(staged_name: &str) -> String {
        format!("{}{}", UPLOADS_MARKER, staged_name)
    }

    /// Resolve a path relative to the root, rejecting traversal attempts.
    fn resolve(&self, relative: &str) -> Result<PathBuf, CustodyError> {
        let unsafe_path = relative.is_empty()
            || relative.len() > MAX_STAGED_NAME_LEN
            || relative.starts_with('/')
            || relative.contains("..")
            || relative
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if unsafe_path {
            return Err(CustodyError::UnsafePath(relative.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Delete the file behind `file_url` if this service owns it.
    ///
    /// A missing file is reported as [`Eviction::AlreadyAbsent`], so repeated
    /// or racing evictions of the same file never fail.
    pub async fn evict(&self, file_url: &str) -> Result<Eviction, CustodyError> {
        let relative = match Custody::of(file_url) {
            Custody::Local(relative) => relative,
            Custody::External(_) => return Ok(Eviction::NotOwned),
        };
        let path = self.resolve(relative)?;

        match fs::remove_file(&path).await {
            Ok(_) => {
                debug!("removed physical file {}", path.display());
                Ok(Eviction::Evicted(path))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", path.display());
                Ok(Eviction::AlreadyAbsent(path))
            }
            Err(source) => Err(CustodyError::Io { path, source }),
        }
    }

    /// Stream an upload body into the storage root under a fresh unique name.
    ///
    /// Bytes go to a temporary file first, are fsynced, then renamed into place.
    /// The temporary file is removed on any error.
    pub async fn stage<S>(
        &self,
        original_name: &str,
        mime_type: Option<String>,
        stream: S,
    ) -> io::Result<StagedUpload>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        self.ensure_root().await?;
        let staged_name = format!("{}{}", Uuid::new_v4(), staged_extension(original_name));
        let final_path = self.root.join(&staged_name);
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(err);
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        debug!(
            "staged {} ({} bytes) as {}",
            original_name,
            size_bytes,
            final_path.display()
        );

        Ok(StagedUpload {
            staged_name,
            original_name: original_name.to_string(),
            mime_type,
        })
    }

    /// Remove a staged file whose request never produced a lecture.
    pub async fn discard(&self, staged: &StagedUpload) {
        if let Err(err) = self.evict(&Self::local_url(&staged.staged_name)).await {
            debug!("failed to discard staged upload {}: {}", staged.staged_name, err);
        }
    }

    /// Write, read back and remove a dotfile under the root.
    ///
    /// Used by readiness checks to prove uploads can be stored and evicted.
    pub async fn probe(&self) -> io::Result<()> {
        const MARKER: &[u8] = b"lecture-store";
        let path = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&path, MARKER).await?;
        let read_back = fs::read(&path).await;
        let removed = fs::remove_file(&path).await;
        if read_back? != MARKER {
            return Err(io::Error::other("probe file content mismatch"));
        }
        removed
    }

    /// Open a locally owned file for reading.
    ///
    /// Returns a `NotFound` I/O error for unsafe names as well as missing files.
    pub async fn open(&self, staged_name: &str) -> io::Result<File> {
        let path = self
            .resolve(staged_name)
            .map_err(|err| io::Error::new(ErrorKind::NotFound, err.to_string()))?;
        File::open(&path).await
    }
}

/// Keep a short alphanumeric extension from the client's filename, if any.
fn staged_extension(original_name: &str) -> String {
    match original_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn custody() -> (TempDir, FileCustody) {
        let dir = TempDir::new().unwrap();
        let custody = FileCustody::new(dir.path());
        (dir, custody)
    }

    #[tokio::test]
    async fn evicts_local_file() {
        let (dir, custody) = custody();
        let path = dir.path().join("abc123.pdf");
        std::fs::write(&path, b"pdf").unwrap();

        let outcome = custody.evict("/uploads/abc123.pdf").await.unwrap();

        assert_eq!(outcome, Eviction::Evicted(path.clone()));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_file_is_already_absent() {
        let (dir, custody) = custody();

        let outcome = custody.evict("/uploads/gone.pdf").await.unwrap();

        assert_eq!(outcome, Eviction::AlreadyAbsent(dir.path().join("gone.pdf")));
    }

    #[tokio::test]
    async fn external_url_never_touches_disk() {
        let (dir, custody) = custody();
        let path = dir.path().join("new.png");
        std::fs::write(&path, b"png").unwrap();

        let outcome = custody.evict("https://ext.test/new.png").await.unwrap();

        assert_eq!(outcome, Eviction::NotOwned);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let dir = TempDir::new().unwrap();
        let custody = FileCustody::new(dir.path().join("uploads"));
        custody.ensure_root().await.unwrap();
        let outside = dir.path().join("victim.txt");
        std::fs::write(&outside, b"keep me").unwrap();

        let err = custody.evict("/uploads/../victim.txt").await.unwrap_err();

        assert!(matches!(err, CustodyError::UnsafePath(_)));
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn directory_in_place_of_file_is_an_io_error() {
        let (dir, custody) = custody();
        std::fs::create_dir(dir.path().join("clip.mp4")).unwrap();

        let err = custody.evict("/uploads/clip.mp4").await.unwrap_err();

        assert!(matches!(err, CustodyError::Io { .. }));
    }

    #[tokio::test]
    async fn stage_writes_under_unique_name() {
        let (dir, custody) = custody();
        let chunks = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];

        let staged = custody
            .stage("Slides.PDF", Some("application/pdf".into()), futures::stream::iter(chunks))
            .await
            .unwrap();

        assert!(staged.staged_name.ends_with(".pdf"));
        assert_eq!(staged.original_name, "Slides.PDF");
        assert_eq!(staged.mime_type.as_deref(), Some("application/pdf"));
        let written = std::fs::read(dir.path().join(&staged.staged_name)).unwrap();
        assert_eq!(written, b"hello world");
    }

    #[tokio::test]
    async fn failed_stream_leaves_nothing_behind() {
        let (dir, custody) = custody();
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("client went away")),
        ];

        let result = custody
            .stage("clip.mp4", None, futures::stream::iter(chunks))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn probe_leaves_root_empty() {
        let (dir, custody) = custody();

        custody.probe().await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn probe_fails_without_root() {
        let dir = TempDir::new().unwrap();
        let custody = FileCustody::new(dir.path().join("missing"));

        assert!(custody.probe().await.is_err());
    }

    #[test]
    fn staged_extension_keeps_plain_suffixes_only() {
        assert_eq!(staged_extension("a.MP4"), ".mp4");
        assert_eq!(staged_extension("noext"), "");
        assert_eq!(staged_extension(".bashrc"), "");
        assert_eq!(staged_extension("weird.p/df"), "");
    }
}
