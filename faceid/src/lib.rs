//! Face identity matching against a registry of known faces.
//!
//! Known identities are face images in a store (see [`faceid_store`]).
//! Each image is turned into a fixed-length [`Encoding`] by an [`Encoder`];
//! a query encoding is matched to the closest known one by Euclidean
//! distance, and accepted only within the configured tolerance.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use faceid::{Config, HttpEncoder, HttpEncoderConfig, RegistryManager};
//!
//! # async fn run(photo: Vec<u8>) -> Result<(), faceid::FaceIdError> {
//! let encoder = Arc::new(HttpEncoder::new(HttpEncoderConfig {
//!     base_url: "http://127.0.0.1:8500".into(),
//!     ..Default::default()
//! })?);
//! let manager = RegistryManager::from_config(&Config::default(), encoder)?;
//!
//! manager.add_identity("alice", &photo).await?;
//! for result in manager.identify(&photo).await? {
//!     println!("{result}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//!
//! The registry is loaded once, lazily, from an [`EncodingCache`] when the
//! cache was written for the same encoder variant, or else by encoding
//! every stored image. The manager rewrites the cache after every change.
//!
//! Matching takes the single nearest identity and then applies the
//! tolerance: a nearer candidate beyond tolerance makes the result
//! [`MatchResult::Unknown`] even if a farther one is within it.

mod cache;
mod config;
mod encoder;
mod encoding;
mod error;
mod http_encoder;
mod manager;
mod matcher;
mod registry;

pub use cache::{EncodingCache, CACHE_FORMAT_VERSION};
pub use config::{Config, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_TIMEOUT_SECS};
pub use encoder::Encoder;
pub use encoding::{euclidean_distance, Encoding};
pub use error::FaceIdError;
pub use http_encoder::{HttpEncoder, HttpEncoderConfig, DEFAULT_DIMENSION, DEFAULT_MODEL_TYPE};
pub use manager::{AddOutcome, RegistryManager};
pub use matcher::{compare_faces, face_distances, MatchResult, Matcher, DEFAULT_TOLERANCE};
pub use registry::IdentityRegistry;

pub use faceid_store::{EncodingStore, StoreConfig, StoreError};
