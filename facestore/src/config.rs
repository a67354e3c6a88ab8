use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::local::LocalStore;
use crate::remote::RemoteStore;
use crate::store::EncodingStore;
use crate::StoreError;

/// Default bucket holding known-face images.
pub const DEFAULT_BUCKET: &str = "known_faces";

/// Default local directory holding known-face images.
pub const DEFAULT_FACES_DIR: &str = "models/known_faces";

/// Selects the backend that owns known-face images.
///
/// Deserialized from a `backend`-tagged map:
///
/// ```yaml
/// backend: remote
/// base_url: https://project.example.co
/// access_key: secret
/// bucket: known_faces
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Flat directory on the local filesystem.
    Local { dir: PathBuf },

    /// Remote object bucket.
    Remote {
        base_url: String,
        access_key: String,
        #[serde(default = "default_bucket")]
        bucket: String,
    },
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            dir: PathBuf::from(DEFAULT_FACES_DIR),
        }
    }
}

impl StoreConfig {
    /// Opens the configured backend.
    pub fn open(&self) -> Result<Box<dyn EncodingStore>, StoreError> {
        match self {
            Self::Local { dir } => Ok(Box::new(LocalStore::new(dir))),
            Self::Remote {
                base_url,
                access_key,
                bucket,
            } => {
                if access_key.is_empty() {
                    return Err(StoreError::Config("remote store needs an access key".into()));
                }
                Ok(Box::new(RemoteStore::new(base_url, access_key, bucket)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_local() {
        let cfg: StoreConfig = serde_yaml::from_str("backend: local\ndir: /srv/faces\n").unwrap();
        assert_eq!(
            cfg,
            StoreConfig::Local {
                dir: PathBuf::from("/srv/faces")
            }
        );
        assert_eq!(cfg.open().unwrap().backend(), "local");
    }

    #[test]
    fn parse_remote_with_default_bucket() {
        let cfg: StoreConfig = serde_yaml::from_str(
            "backend: remote\nbase_url: https://example.test\naccess_key: k\n",
        )
        .unwrap();
        match &cfg {
            StoreConfig::Remote { bucket, .. } => assert_eq!(bucket, DEFAULT_BUCKET),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cfg.open().unwrap().backend(), "remote");
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let res: Result<StoreConfig, _> = serde_yaml::from_str("backend: s3\nbucket: x\n");
        assert!(res.is_err());
    }

    #[test]
    fn remote_without_key_rejected() {
        let cfg = StoreConfig::Remote {
            base_url: "https://example.test".into(),
            access_key: String::new(),
            bucket: DEFAULT_BUCKET.into(),
        };
        assert!(matches!(cfg.open(), Err(StoreError::Config(_))));
    }
}
