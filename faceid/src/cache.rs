//! Persisted snapshot of computed encodings.
//!
//! The cache lets startup skip the encoder entirely. It is trusted when it
//! decodes, its sequences are index-aligned, its encodings have the active
//! dimensionality and its `model_type` equals the active encoder's. File
//! contents of the faces store are not hashed; callers rewrite the cache
//! whenever they change the known faces.
//!
//! # Format
//!
//! A single MessagePack map with named fields:
//!
//! ```text
//! { encodings: [[f32]], names: [string], model_type: string, version: string }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Encoding, FaceIdError, IdentityRegistry};

/// Format version written into new caches.
pub const CACHE_FORMAT_VERSION: &str = "1";

/// Serializable snapshot of the identity registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingCache {
    pub encodings: Vec<Encoding>,
    pub names: Vec<String>,
    /// Missing in a file means "unknown model", which never validates.
    #[serde(default)]
    pub model_type: String,
    pub version: String,
}

impl EncodingCache {
    /// Creates a cache snapshot. `encodings` and `names` must be aligned.
    pub fn new(
        encodings: Vec<Encoding>,
        names: Vec<String>,
        model_type: &str,
        version: &str,
    ) -> Result<Self, FaceIdError> {
        if encodings.len() != names.len() {
            return Err(FaceIdError::Configuration(format!(
                "cache snapshot has {} encodings for {} names",
                encodings.len(),
                names.len()
            )));
        }
        Ok(Self {
            encodings,
            names,
            model_type: model_type.to_string(),
            version: version.to_string(),
        })
    }

    /// Snapshots a registry with the current format version.
    pub fn from_registry(registry: &IdentityRegistry, model_type: &str) -> Self {
        Self {
            encodings: registry.encodings().to_vec(),
            names: registry.names().to_vec(),
            model_type: model_type.to_string(),
            version: CACHE_FORMAT_VERSION.to_string(),
        }
    }

    /// Rebuilds a registry of dimensionality `dim` from this snapshot.
    pub fn into_registry(self, dim: usize) -> Result<IdentityRegistry, FaceIdError> {
        IdentityRegistry::from_parts(dim, self.encodings, self.names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the dimensionality of the stored encodings, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.encodings.first().map(Encoding::dim)
    }

    /// Reads the cache at `path` without checking it against an encoder.
    ///
    /// Fails with [`FaceIdError::NotFound`] if there is no file and
    /// [`FaceIdError::CorruptCache`] if it cannot be decoded, its sequences
    /// are not index-aligned or its encodings differ in length.
    pub fn read(path: &Path) -> Result<Self, FaceIdError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FaceIdError::NotFound(path.display().to_string()));
            }
            Err(e) => {
                return Err(FaceIdError::CorruptCache(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };

        let cache: EncodingCache = rmp_serde::from_slice(&data)
            .map_err(|e| FaceIdError::CorruptCache(e.to_string()))?;

        if cache.encodings.len() != cache.names.len() {
            return Err(FaceIdError::CorruptCache(format!(
                "{} encodings for {} names",
                cache.encodings.len(),
                cache.names.len()
            )));
        }
        if let Some(dim) = cache.dimension() {
            if let Some(bad) = cache.encodings.iter().find(|e| e.dim() != dim) {
                return Err(FaceIdError::CorruptCache(format!(
                    "mixed encoding dimensions {dim} and {}",
                    bad.dim()
                )));
            }
        }
        Ok(cache)
    }

    /// Loads and validates the cache at `path` for the active encoder.
    ///
    /// Fails like [`EncodingCache::read`], and additionally with
    /// [`FaceIdError::VersionMismatch`] if it was written for a different
    /// `model_type`, or [`FaceIdError::CorruptCache`] if its encodings do
    /// not have dimensionality `dim`.
    pub fn load(path: &Path, model_type: &str, dim: usize) -> Result<Self, FaceIdError> {
        let cache = Self::read(path)?;
        if cache.model_type != model_type {
            return Err(FaceIdError::VersionMismatch {
                cached: cache.model_type,
                active: model_type.to_string(),
            });
        }
        if let Some(got) = cache.dimension().filter(|&d| d != dim) {
            return Err(FaceIdError::CorruptCache(format!(
                "encoding of dimension {got} in a {dim}-d cache"
            )));
        }
        Ok(cache)
    }

    /// Writes the cache to `path`, replacing any previous cache.
    ///
    /// The snapshot is written to a temporary sibling and renamed into
    /// place, so concurrent readers see either the old or the new file.
    /// Missing parent directories are created.
    pub fn save(&self, path: &Path) -> Result<(), FaceIdError> {
        let data = rmp_serde::to_vec_named(self)
            .map_err(|e| FaceIdError::CacheWrite(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                FaceIdError::CacheWrite(format!("create {}: {e}", parent.display()))
            })?;
        }

        let tmp = temp_sibling(path);
        if let Err(e) = fs::write(&tmp, &data) {
            let _ = fs::remove_file(&tmp);
            return Err(FaceIdError::CacheWrite(format!("write {}: {e}", tmp.display())));
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(FaceIdError::CacheWrite(format!("rename {}: {e}", path.display())));
        }
        Ok(())
    }

    /// Deletes the cache at `path`. A missing file is not an error.
    pub fn discard(path: &Path) -> Result<(), FaceIdError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FaceIdError::CacheWrite(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache".into());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
