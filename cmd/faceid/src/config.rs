//! CLI configuration.
//!
//! Stored in ~/.faceid/config.yaml. The engine settings sit at the top
//! level; the encoding service has its own section:
//!
//! ```yaml
//! tolerance: 0.5
//! model_type: hog
//! cache_path: /home/me/.faceid/face_encodings.cache
//! store:
//!   backend: local
//!   dir: models/known_faces
//! encoder:
//!   base_url: http://127.0.0.1:8500
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use faceid::{Config, HttpEncoderConfig, StoreConfig};
use faceid_store::DEFAULT_BUCKET;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".faceid";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub engine: Config,

    #[serde(default)]
    pub encoder: HttpEncoderConfig,
}

impl CliConfig {
    /// Gets the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Loads the config file, falling back to defaults when the default
    /// file does not exist. A missing explicit `--config` file is an error.
    pub fn load(custom_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match custom_path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `FACEID_*` overrides read through `var`.
    ///
    /// `FACEID_STORE_URL` selects the remote backend and takes precedence
    /// over `FACEID_FACES_DIR`.
    pub fn apply_env<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("FACEID_FACES_DIR") {
            self.engine.store = StoreConfig::Local { dir: dir.into() };
        }
        if let Some(base_url) = var("FACEID_STORE_URL") {
            let (access_key, bucket) = match &self.engine.store {
                StoreConfig::Remote { access_key, bucket, .. } => {
                    (access_key.clone(), bucket.clone())
                }
                StoreConfig::Local { .. } => (String::new(), DEFAULT_BUCKET.to_string()),
            };
            self.engine.store = StoreConfig::Remote {
                base_url,
                access_key,
                bucket,
            };
        }
        if let StoreConfig::Remote { access_key, bucket, .. } = &mut self.engine.store {
            if let Some(key) = var("FACEID_STORE_KEY") {
                *access_key = key;
            }
            if let Some(b) = var("FACEID_STORE_BUCKET") {
                *bucket = b;
            }
        }
        if let Some(path) = var("FACEID_CACHE_PATH") {
            self.engine.cache_path = (!path.is_empty()).then(|| path.into());
        }
        if let Some(t) = var("FACEID_TOLERANCE") {
            self.engine.tolerance = t
                .parse()
                .with_context(|| format!("FACEID_TOLERANCE: invalid number {t:?}"))?;
        }
        if let Some(url) = var("FACEID_ENCODER_URL") {
            self.encoder.base_url = url;
        }
        Ok(())
    }

    /// Returns the encoder settings, defaulting the model to the engine's.
    pub fn encoder_config(&self) -> HttpEncoderConfig {
        let mut enc = self.encoder.clone();
        if enc.model_type.is_empty() {
            enc.model_type = self.engine.model_type.clone();
        }
        enc
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn parses_engine_and_encoder_sections() {
        let cfg = CliConfig::from_yaml(
            r#"
tolerance: 0.4
model_type: cnn
store:
  backend: local
  dir: /srv/faces
encoder:
  base_url: http://encoder:8500
"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.tolerance, 0.4);
        assert_eq!(cfg.engine.store, StoreConfig::Local { dir: "/srv/faces".into() });
        assert_eq!(cfg.encoder.base_url, "http://encoder:8500");
        assert_eq!(cfg.encoder_config().model_type, "cnn");
    }

    #[test]
    fn empty_file_is_default() {
        let cfg = CliConfig::from_yaml("{}").unwrap();
        assert_eq!(cfg.engine, Config::default());
        assert!(cfg.encoder.base_url.is_empty());
    }

    #[test]
    fn store_url_switches_to_remote() {
        let mut cfg = CliConfig::default();
        cfg.apply_env(env(&[
            ("FACEID_FACES_DIR", "/tmp/faces"),
            ("FACEID_STORE_URL", "https://project.example.co"),
            ("FACEID_STORE_KEY", "secret"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.engine.store,
            StoreConfig::Remote {
                base_url: "https://project.example.co".into(),
                access_key: "secret".into(),
                bucket: DEFAULT_BUCKET.into(),
            }
        );
    }

    #[test]
    fn scalar_overrides() {
        let mut cfg = CliConfig::default();
        cfg.apply_env(env(&[
            ("FACEID_TOLERANCE", "0.6"),
            ("FACEID_CACHE_PATH", "/tmp/enc.cache"),
            ("FACEID_ENCODER_URL", "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.engine.tolerance, 0.6);
        assert_eq!(cfg.engine.cache_path, Some(PathBuf::from("/tmp/enc.cache")));
        assert_eq!(cfg.encoder.base_url, "http://localhost:9000");

        cfg.apply_env(env(&[("FACEID_CACHE_PATH", "")])).unwrap();
        assert!(cfg.engine.cache_path.is_none());
    }

    #[test]
    fn bad_tolerance_is_reported() {
        let mut cfg = CliConfig::default();
        let err = cfg.apply_env(env(&[("FACEID_TOLERANCE", "loose")])).unwrap_err();
        assert!(err.to_string().contains("FACEID_TOLERANCE"));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
