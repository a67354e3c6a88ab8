use std::fmt;
use std::path::Path;

use crate::StoreError;

/// Image extensions accepted as known-face records (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Durable home of known-face source images.
///
/// Records are keyed by file name (`"alice.jpg"`); the identity a record
/// belongs to is its file stem (see [`identity_of`]).
///
/// Implementations must be safe for concurrent use. No implementation
/// falls back to another backend on failure.
#[async_trait::async_trait]
pub trait EncodingStore: Send + Sync {
    /// Returns the names of all supported image records, sorted by name.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Returns the bytes of one record.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Stores one record, overwriting any record with the same name.
    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Short backend label for logs (e.g. "local", "remote").
    fn backend(&self) -> &'static str;
}

impl fmt::Debug for dyn EncodingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodingStore {{ backend: {} }}", self.backend())
    }
}

/// Reports whether `name` carries one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Returns the identity name a record belongs to: its file stem.
pub fn identity_of(record: &str) -> &str {
    Path::new(record)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(record)
}

/// Extension of the single record written for an identity.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// Builds the record name an identity's image is stored under.
///
/// Every identity has exactly one canonical record, `{identity}.jpg`,
/// whatever the image format, so re-adding always overwrites it.
pub fn record_name(identity: &str) -> Result<String, StoreError> {
    validate_identity(identity)?;
    Ok(format!("{identity}.{CANONICAL_EXTENSION}"))
}

/// Reports whether `record` is the canonical record of its identity.
///
/// Records under other supported extensions (e.g. `alice.png` dropped into
/// the store by hand) are still loaded, but the canonical one takes
/// precedence over them.
pub fn is_canonical_record(record: &str) -> bool {
    Path::new(record)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == CANONICAL_EXTENSION)
}

/// Rejects identity names that cannot be used as a flat record key.
pub fn validate_identity(identity: &str) -> Result<(), StoreError> {
    if identity.trim().is_empty()
        || identity.starts_with('.')
        || identity.contains(['/', '\\'])
        || identity.chars().any(char::is_control)
    {
        return Err(StoreError::InvalidName(identity.to_string()));
    }
    Ok(())
}

/// Validates a full record name before it reaches a backend.
pub(crate) fn validate_record(name: &str) -> Result<(), StoreError> {
    validate_identity(identity_of(name))?;
    if !is_supported_image(name) || name.contains(['/', '\\']) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Returns the MIME type of a record: PNG when the bytes or the extension
/// say so, JPEG otherwise.
pub(crate) fn content_type(name: &str, data: &[u8]) -> &'static str {
    if data.starts_with(PNG_SIGNATURE) || name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
