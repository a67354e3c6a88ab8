use std::path::{Path, PathBuf};
use std::time::Duration;

use faceid_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::http_encoder::DEFAULT_MODEL_TYPE;
use crate::matcher::DEFAULT_TOLERANCE;
use crate::FaceIdError;

/// Default bound on one encoder or backend call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default upper limit for a submitted image (5 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Controls registry behavior.
///
/// Every field has a default, so an empty YAML document is a valid config:
///
/// ```yaml
/// tolerance: 0.5
/// model_type: hog
/// cache_path: data/face_encodings.cache
/// timeout_secs: 5
/// max_image_bytes: 5242880
/// store:
///   backend: local
///   dir: models/known_faces
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum Euclidean distance for a match. Smaller is stricter.
    pub tolerance: f32,

    /// Encoder variant the registry is built for ("hog", "cnn", ...).
    pub model_type: String,

    /// Encoding cache location. `None` disables the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    /// Bound on each encoder and backend call.
    pub timeout_secs: u64,

    /// Largest accepted image, in bytes.
    pub max_image_bytes: usize,

    /// Backend owning the known-face images.
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            model_type: DEFAULT_MODEL_TYPE.to_string(),
            cache_path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Parses a YAML document. Unknown store backends are rejected here.
    pub fn from_yaml(text: &str) -> Result<Self, FaceIdError> {
        let cfg: Config =
            serde_yaml::from_str(text).map_err(|e| FaceIdError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, FaceIdError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FaceIdError::Configuration(format!("read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), FaceIdError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(FaceIdError::Configuration(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.model_type.is_empty() {
            return Err(FaceIdError::Configuration("model_type is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(FaceIdError::Configuration("timeout_secs must be positive".into()));
        }
        if self.max_image_bytes == 0 {
            return Err(FaceIdError::Configuration(
                "max_image_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = Config::from_yaml("{}").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.tolerance, 0.5);
        assert_eq!(cfg.model_type, "hog");
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert!(cfg.cache_path.is_none());
    }

    #[test]
    fn full_document() {
        let cfg = Config::from_yaml(
            r#"
tolerance: 0.45
model_type: cnn
cache_path: /var/cache/faceid/encodings.cache
timeout_secs: 10
store:
  backend: remote
  base_url: https://project.example.co
  access_key: secret
"#,
        )
        .unwrap();
        assert_eq!(cfg.tolerance, 0.45);
        assert_eq!(cfg.model_type, "cnn");
        assert_eq!(
            cfg.cache_path.as_deref(),
            Some(Path::new("/var/cache/faceid/encodings.cache"))
        );
        assert!(matches!(cfg.store, StoreConfig::Remote { .. }));
    }

    #[test]
    fn unknown_backend_is_configuration_error() {
        let err = Config::from_yaml("store:\n  backend: s3\n  bucket: faces\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn out_of_range_values_rejected() {
        for doc in [
            "tolerance: -1.0",
            "timeout_secs: 0",
            "max_image_bytes: 0",
            "model_type: ''",
        ] {
            assert!(Config::from_yaml(doc).is_err(), "{doc} should be rejected");
        }
    }
}
