//! Directory-backed store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::store::{is_supported_image, validate_record, EncodingStore};
use crate::StoreError;

/// Stores known-face images as flat files in one directory.
///
/// The directory is created on first use. Writes go to a hidden temporary
/// file and are renamed into place, so readers never see partial images.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Unavailable(format!("create {}: {e}", self.dir.display()))
        })
    }
}

#[async_trait::async_trait]
impl EncodingStore for LocalStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "faces directory missing, creating it");
                self.ensure_dir().await?;
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "read {}: {e}",
                    self.dir.display()
                )));
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(StoreError::Unavailable(e.to_string())),
            };
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_supported_image(name) && !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_record(name)?;
        match fs::read(self.dir.join(name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name.into())),
            Err(e) => Err(StoreError::Unavailable(format!("read {name}: {e}"))),
        }
    }

    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        validate_record(name)?;
        self.ensure_dir().await?;

        let target = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        if let Err(e) = fs::write(&tmp, data).await {
            return Err(StoreError::Unavailable(format!("write {name}: {e}")));
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Unavailable(format!("rename {name}: {e}")));
        }
        debug!(record = name, bytes = data.len(), "stored face image locally");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}
