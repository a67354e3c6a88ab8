use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use faceid_store::{
    identity_of, is_canonical_record, record_name, validate_identity, EncodingStore,
};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use crate::cache::EncodingCache;
use crate::encoder::Encoder;
use crate::{Config, Encoding, FaceIdError, IdentityRegistry, MatchResult, Matcher};

/// Result of a successful [`RegistryManager::add_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// Record name the image was stored under (e.g. "zhang.jpg").
    pub record: String,
    /// True if the identity already existed and its encoding was replaced.
    pub replaced: bool,
    /// Number of identities after the addition.
    pub total: usize,
}

/// Owns the identity registry and everything that mutates it.
///
/// The registry is loaded lazily, exactly once, by the first caller of any
/// operation (or by [`RegistryManager::init`]): from the encoding cache when
/// it is valid for the active encoder, otherwise from the store through the
/// encoder, after which a fresh cache is written. Concurrent first callers
/// wait for that single load.
///
/// Matching takes a shared read lock. Additions run the encoder and the
/// store upload without holding the registry lock, then splice the result
/// in under a short write lock, so readers never observe `names` and
/// `encodings` at different lengths. Every encoder and backend call is
/// bounded by the configured timeout.
///
/// Thread-safe: share it behind an [`Arc`].
pub struct RegistryManager {
    encoder: Arc<dyn Encoder>,
    store: Arc<dyn EncodingStore>,
    matcher: Matcher,
    cache_path: Option<PathBuf>,
    timeout: Duration,
    max_image_bytes: usize,
    registry: OnceCell<RwLock<IdentityRegistry>>,
    // Serializes store writes, registry swaps and cache rewrites.
    mutation: Mutex<()>,
}

impl fmt::Debug for RegistryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryManager")
            .field("encoder", &self.encoder)
            .field("store", &self.store.backend())
            .field("tolerance", &self.matcher.tolerance())
            .field("cache_path", &self.cache_path)
            .field("initialized", &self.registry.initialized())
            .finish()
    }
}

impl RegistryManager {
    /// Creates a manager. Nothing is loaded until first use.
    ///
    /// Fails with [`FaceIdError::Configuration`] if the config is invalid
    /// or names a different encoder variant than `encoder`.
    pub fn new(
        cfg: &Config,
        encoder: Arc<dyn Encoder>,
        store: Arc<dyn EncodingStore>,
    ) -> Result<Self, FaceIdError> {
        cfg.validate()?;
        if encoder.model_type() != cfg.model_type {
            return Err(FaceIdError::Configuration(format!(
                "encoder is {:?} but config expects {:?}",
                encoder.model_type(),
                cfg.model_type
            )));
        }
        if encoder.dimension() == 0 {
            return Err(FaceIdError::Configuration(
                "encoder dimension must be positive".into(),
            ));
        }
        Ok(Self {
            encoder,
            store,
            matcher: Matcher::new(cfg.tolerance)?,
            cache_path: cfg.cache_path.clone(),
            timeout: cfg.timeout(),
            max_image_bytes: cfg.max_image_bytes,
            registry: OnceCell::new(),
            mutation: Mutex::new(()),
        })
    }

    /// Creates a manager over the store named by `cfg.store`.
    pub fn from_config(cfg: &Config, encoder: Arc<dyn Encoder>) -> Result<Self, FaceIdError> {
        let store: Arc<dyn EncodingStore> = Arc::from(cfg.store.open()?);
        Self::new(cfg, encoder, store)
    }

    /// Loads the registry now instead of on first use.
    /// Returns the number of known identities.
    pub async fn init(&self) -> Result<usize, FaceIdError> {
        Ok(self.registry().await?.read().len())
    }

    /// Reports whether the registry has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.registry.initialized()
    }

    pub fn tolerance(&self) -> f32 {
        self.matcher.tolerance()
    }

    /// Returns the closest known identity to `query`, or Unknown.
    pub async fn match_encoding(&self, query: &Encoding) -> Result<MatchResult, FaceIdError> {
        let registry = self.registry().await?;
        let reg = registry.read();
        self.matcher.best_match(&reg, query)
    }

    /// Encodes every face in `image` and matches each one.
    ///
    /// Results follow the encoder's face order; an image without faces
    /// yields an empty vector.
    pub async fn identify(&self, image: &[u8]) -> Result<Vec<MatchResult>, FaceIdError> {
        self.check_size(image)?;
        let registry = self.registry().await?;
        let encodings = self.encode(image).await?;

        let reg = registry.read();
        encodings
            .iter()
            .map(|e| self.matcher.best_match(&reg, e))
            .collect()
    }

    /// Registers `name` from a photo.
    ///
    /// The first detected face is used. The image is stored durably before
    /// the registry changes; if the store rejects it, nothing changes.
    /// Re-adding an existing name replaces its encoding.
    pub async fn add_identity(&self, name: &str, image: &[u8]) -> Result<AddOutcome, FaceIdError> {
        validate_identity(name)?;
        self.check_size(image)?;
        let registry = self.registry().await?;

        let Some(encoding) = self.encode(image).await?.into_iter().next() else {
            debug!(name, "no face in submitted image");
            return Err(FaceIdError::NoFaceDetected);
        };
        let record = record_name(name)?;

        let _guard = self.mutation.lock().await;
        self.bounded("store upload", self.store.put(&record, image))
            .await
            .inspect_err(|e| warn!(name, record = %record, error = %e, "face image not stored"))?;

        let (replaced, total) = {
            let mut reg = registry.write();
            let replaced = reg.insert(name.to_string(), encoding)?;
            (replaced, reg.len())
        };
        info!(name, record = %record, replaced, total, "identity added");

        self.persist(registry).await;
        Ok(AddOutcome {
            record,
            replaced,
            total,
        })
    }

    /// Returns a snapshot of all known identity names, in registry order.
    pub async fn list_identities(&self) -> Result<Vec<String>, FaceIdError> {
        Ok(self.registry().await?.read().names().to_vec())
    }

    /// Returns the number of known identities.
    pub async fn len(&self) -> Result<usize, FaceIdError> {
        self.init().await
    }

    pub async fn is_empty(&self) -> Result<bool, FaceIdError> {
        Ok(self.len().await? == 0)
    }

    /// Rebuilds the registry from the store, bypassing the cache, and
    /// rewrites the cache. Returns the number of identities loaded.
    ///
    /// Unlike the initial load, an unreachable store is an error here and
    /// the current registry stays in place.
    pub async fn reload(&self) -> Result<usize, FaceIdError> {
        let registry = self.registry().await?;

        let _guard = self.mutation.lock().await;
        let fresh = self.build_from_store().await?;
        let total = fresh.len();
        *registry.write() = fresh;
        info!(total, backend = self.store.backend(), "registry reloaded");

        self.persist(registry).await;
        Ok(total)
    }

    async fn registry(&self) -> Result<&RwLock<IdentityRegistry>, FaceIdError> {
        self.registry.get_or_try_init(|| self.load()).await
    }

    /// Initial load: cache first, then store. Never fails on cache or
    /// backend trouble; only configuration faults abort it.
    async fn load(&self) -> Result<RwLock<IdentityRegistry>, FaceIdError> {
        if let Some(reg) = self.load_cache().await {
            info!(count = reg.len(), "loaded known faces from cache");
            return Ok(RwLock::new(reg));
        }

        let reg = match self.build_from_store().await {
            Ok(reg) => reg,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!(backend = self.store.backend(), error = %e, "known faces unavailable, starting empty");
                return Ok(RwLock::new(IdentityRegistry::new(self.encoder.dimension())));
            }
        };
        info!(count = reg.len(), backend = self.store.backend(), "loaded known faces from store");

        let registry = RwLock::new(reg);
        let _guard = self.mutation.lock().await;
        self.persist(&registry).await;
        Ok(registry)
    }

    async fn load_cache(&self) -> Option<IdentityRegistry> {
        let path = self.cache_path.clone()?;
        let model_type = self.encoder.model_type().to_string();
        let dim = self.encoder.dimension();

        let loaded =
            tokio::task::spawn_blocking(move || EncodingCache::load(&path, &model_type, dim))
                .await;
        let cache = match loaded {
            Ok(Ok(cache)) => cache,
            Ok(Err(FaceIdError::NotFound(path))) => {
                debug!(path, "no encoding cache yet");
                return None;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "encoding cache rejected, rebuilding");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "encoding cache load aborted");
                return None;
            }
        };
        debug!(version = %cache.version, count = cache.len(), "encoding cache accepted");
        match cache.into_registry(dim) {
            Ok(reg) => Some(reg),
            Err(e) => {
                warn!(error = %e, "encoding cache unusable, rebuilding");
                None
            }
        }
    }

    /// Encodes every supported record in the store. Records that cannot be
    /// fetched or encoded are skipped; records without a face are omitted;
    /// multi-face records keep their first face.
    async fn build_from_store(&self) -> Result<IdentityRegistry, FaceIdError> {
        let mut records = self.bounded("store list", self.store.list()).await?;
        // Canonical records load last, so they win over other extensions.
        records.sort_by(|a, b| {
            identity_of(a)
                .cmp(identity_of(b))
                .then(is_canonical_record(a).cmp(&is_canonical_record(b)))
        });
        let mut reg = IdentityRegistry::new(self.encoder.dimension());

        for record in records {
            let data = match self.bounded("store fetch", self.store.fetch(&record)).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(record = %record, error = %e, "skipping face image");
                    continue;
                }
            };
            let encodings = match self.encode(&data).await {
                Ok(encodings) => encodings,
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    warn!(record = %record, error = %e, "skipping face image");
                    continue;
                }
            };
            let Some(first) = encodings.into_iter().next() else {
                debug!(record = %record, "no face found, skipping");
                continue;
            };
            if reg.insert(identity_of(&record).to_string(), first)? {
                debug!(record = %record, "duplicate identity, later record wins");
            }
        }
        Ok(reg)
    }

    /// Runs the encoder under the timeout and checks dimensionality.
    async fn encode(&self, image: &[u8]) -> Result<Vec<Encoding>, FaceIdError> {
        let encodings = self
            .bounded("encoder", self.encoder.detect_and_encode(image))
            .await?;
        let dim = self.encoder.dimension();
        if let Some(bad) = encodings.iter().find(|e| e.dim() != dim) {
            return Err(FaceIdError::DimensionMismatch {
                expected: dim,
                got: bad.dim(),
            });
        }
        Ok(encodings)
    }

    async fn bounded<T, E, F>(&self, op: &'static str, fut: F) -> Result<T, FaceIdError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<FaceIdError>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(Into::into),
            Err(_) => Err(FaceIdError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }

    fn check_size(&self, image: &[u8]) -> Result<(), FaceIdError> {
        if image.len() > self.max_image_bytes {
            return Err(FaceIdError::ImageTooLarge {
                max: self.max_image_bytes,
                got: image.len(),
            });
        }
        Ok(())
    }

    /// Rewrites the cache from the current registry. Callers hold the
    /// mutation lock.
    ///
    /// A failed rewrite deletes the old cache instead, so the next start
    /// rebuilds from the store rather than trusting an outdated snapshot.
    async fn persist(&self, registry: &RwLock<IdentityRegistry>) {
        let Some(path) = self.cache_path.clone() else {
            return;
        };
        let snapshot = EncodingCache::from_registry(&registry.read(), self.encoder.model_type());
        let count = snapshot.len();

        let written = tokio::task::spawn_blocking(move || {
            snapshot
                .save(&path)
                .map_err(|e| (e, EncodingCache::discard(&path)))
        })
        .await;
        match written {
            Ok(Ok(())) => debug!(count, "encoding cache written"),
            Ok(Err((e, Ok(())))) => {
                warn!(error = %e, "encoding cache not written, stale cache removed");
            }
            Ok(Err((e, Err(rm)))) => {
                error!(error = %e, remove_error = %rm, "encoding cache not written and stale cache kept");
            }
            Err(e) => warn!(error = %e, "encoding cache write aborted"),
        }
    }
}
