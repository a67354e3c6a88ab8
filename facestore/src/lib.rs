//! Durable storage for known-face source images.
//!
//! A store owns the images that identities are (re)computed from. The
//! matching engine only sees the [`EncodingStore`] capability; which backend
//! sits behind it is decided once, from [`StoreConfig`]:
//!
//! - [`LocalStore`]: a flat directory, one file per identity
//! - [`RemoteStore`]: a remote object bucket (upsert on write)
//! - [`MemoryStore`]: in-process map for tests
//!
//! Record names are file names (`"alice.jpg"`); the identity is the file stem.
//! New images are always written to the identity's canonical `.jpg` record.
//! Only `jpg`, `jpeg` and `png` records are listed.
//!
//! # Usage
//!
//! ```no_run
//! use faceid_store::StoreConfig;
//!
//! # async fn run() -> Result<(), faceid_store::StoreError> {
//! let store = StoreConfig::default().open()?;
//! for name in store.list().await? {
//!     let bytes = store.fetch(&name).await?;
//!     println!("{name}: {} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod local;
mod memory;
mod remote;
mod store;

pub use config::{StoreConfig, DEFAULT_BUCKET, DEFAULT_FACES_DIR};
pub use error::StoreError;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use store::{
    identity_of, is_canonical_record, is_supported_image, record_name, validate_identity,
    EncodingStore, CANONICAL_EXTENSION, SUPPORTED_EXTENSIONS,
};
