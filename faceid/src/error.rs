use std::time::Duration;

use faceid_store::StoreError;
use thiserror::Error;

/// Errors returned by faceid operations.
#[derive(Debug, Error)]
pub enum FaceIdError {
    /// The cache file is unreadable or structurally invalid.
    #[error("cache is corrupt: {0}")]
    CorruptCache(String),

    /// The cache was produced by a different encoder variant.
    #[error("cache model mismatch: cache has {cached:?}, encoder is {active:?}")]
    VersionMismatch { cached: String, active: String },

    #[error("cache write failed: {0}")]
    CacheWrite(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("no face detected in image")]
    NoFaceDetected,

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two encodings of different length met. Always a configuration fault:
    /// every encoding must come from the same encoder.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("invalid identity name: {0:?}")]
    InvalidName(String),

    #[error("image too large: {got} bytes exceeds limit of {max}")]
    ImageTooLarge { max: usize, got: usize },
}

impl FaceIdError {
    /// Reports whether the error is a configuration fault that retrying
    /// cannot fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::DimensionMismatch { .. }
        )
    }
}

impl From<StoreError> for FaceIdError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(name) => Self::NotFound(name),
            StoreError::Unavailable(msg) => Self::BackendUnavailable(msg),
            StoreError::InvalidName(name) => Self::InvalidName(name),
            StoreError::Config(msg) => Self::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        assert!(matches!(
            FaceIdError::from(StoreError::NotFound("a.jpg".into())),
            FaceIdError::NotFound(n) if n == "a.jpg"
        ));
        assert!(matches!(
            FaceIdError::from(StoreError::Unavailable("refused".into())),
            FaceIdError::BackendUnavailable(_)
        ));
        assert!(FaceIdError::from(StoreError::Config("bad url".into())).is_configuration());
    }

    #[test]
    fn dimension_mismatch_is_configuration() {
        let e = FaceIdError::DimensionMismatch { expected: 128, got: 3 };
        assert!(e.is_configuration());
        assert_eq!(e.to_string(), "dimension mismatch: expected 128, got 3");
        assert!(!FaceIdError::NoFaceDetected.is_configuration());
    }
}
