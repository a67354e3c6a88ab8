use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::store::{is_supported_image, validate_record, EncodingStore};
use crate::StoreError;

/// In-memory [`EncodingStore`] implementation.
/// Data is lost on restart. Suitable for testing or ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `(record name, bytes)` pairs.
    pub fn with_records<I, N>(records: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let records = records.into_iter().map(|(n, d)| (n.into(), d)).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    /// Returns the number of stored records, including unsupported names.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EncodingStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.lock();
        Ok(records
            .keys()
            .filter(|name| is_supported_image(name))
            .cloned()
            .collect())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_record(name)?;
        self.records
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
        validate_record(name)?;
        self.records.lock().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
