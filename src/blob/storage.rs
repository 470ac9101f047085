use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::path::{resolve_relative, validate_filename, validate_name};

/// Directory used in place of a service name for app-level uploads.
/// Service names cannot start with an underscore, so it never collides.
pub const APP_LEVEL_DIR: &str = "__app";

const TEMP_DIR: &str = ".tmp";
const ORPHAN_DIR: &str = ".orphans";

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found")]
    NotFound,
    #[error("blob already exists: {0}")]
    Occupied(String),
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Append-only file tree holding uploaded documents:
/// `<root>/<application>/<service or __app>/<version>-<filename>`.
pub struct ContentStore {
    base_path: PathBuf,
}

impl ContentStore {
    pub fn new(root: &Path) -> Self {
        Self {
            base_path: root.to_path_buf(),
        }
    }

    /// Path of a blob relative to the root. Always `/`-separated so stored
    /// paths do not depend on the host platform.
    #[must_use]
    pub fn relative_path(
        application: &str,
        service: Option<&str>,
        version: i64,
        filename: &str,
    ) -> String {
        let service_dir = service.unwrap_or(APP_LEVEL_DIR);
        format!("{application}/{service_dir}/{version}-{filename}")
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TEMP_DIR)
            .join(Uuid::new_v4().to_string())
    }

    /// Writes a blob and returns its root-relative path.
    ///
    /// The file is published with a hard link, which never replaces an
    /// existing file. A taken path is [`BlobError::Occupied`].
    pub async fn store(
        &self,
        application: &str,
        service: Option<&str>,
        version: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<String, BlobError> {
        validate_name(application, "Application").map_err(BlobError::InvalidPath)?;
        if let Some(service) = service {
            validate_name(service, "Service").map_err(BlobError::InvalidPath)?;
        }
        validate_filename(filename).map_err(BlobError::InvalidPath)?;
        if version < 1 {
            return Err(BlobError::InvalidPath(format!(
                "version must be positive, got {version}"
            )));
        }

        let relative = Self::relative_path(application, service, version, filename);
        let final_path = resolve_relative(&self.base_path, &relative)
            .ok_or_else(|| BlobError::InvalidPath(relative.clone()))?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;
        drop(temp_file);

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let published = fs::hard_link(&temp_path, &final_path).await;
        let _ = fs::remove_file(&temp_path).await;

        match published {
            Ok(()) => Ok(relative),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(BlobError::Occupied(relative)),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    /// Deletes a blob this process just published and failed to record.
    pub async fn remove(&self, relative: &str) -> Result<(), BlobError> {
        let path = resolve_relative(&self.base_path, relative)
            .ok_or_else(|| BlobError::InvalidPath(relative.to_string()))?;
        fs::remove_file(&path).await.map_err(BlobError::from_io)
    }

    /// Moves a blob aside into `.orphans/` if it was last written more than
    /// `min_age` ago. Returns whether the path is now free.
    ///
    /// A younger file may belong to another writer that has not recorded
    /// its row yet, so it stays where it is.
    pub async fn quarantine(&self, relative: &str, min_age: Duration) -> Result<bool, BlobError> {
        let path = resolve_relative(&self.base_path, relative)
            .ok_or_else(|| BlobError::InvalidPath(relative.to_string()))?;

        let modified = match fs::metadata(&path).await {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(BlobError::Io(e)),
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age < min_age {
            return Ok(false);
        }

        let orphan_dir = self.base_path.join(ORPHAN_DIR);
        fs::create_dir_all(&orphan_dir).await?;
        let target = orphan_dir.join(format!(
            "{}-{}",
            Uuid::new_v4(),
            relative.replace('/', "_")
        ));
        fs::rename(&path, &target).await?;

        tracing::warn!("Moved orphaned blob {} to {}", relative, target.display());
        Ok(true)
    }

    pub async fn load(&self, relative: &str) -> Result<Vec<u8>, BlobError> {
        let path = resolve_relative(&self.base_path, relative)
            .ok_or_else(|| BlobError::InvalidPath(relative.to_string()))?;
        fs::read(&path).await.map_err(BlobError::from_io)
    }

    pub async fn exists(&self, relative: &str) -> Result<bool, BlobError> {
        let path = resolve_relative(&self.base_path, relative)
            .ok_or_else(|| BlobError::InvalidPath(relative.to_string()))?;
        Ok(fs::try_exists(&path).await?)
    }
}
