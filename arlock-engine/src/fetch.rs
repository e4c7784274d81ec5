//! Remote object fetch
//!
//! One content variant stores images in remote object storage keyed by the
//! decoded payload. Fetches are independently asynchronous; each one carries a
//! monotonically increasing sequence number, and a completion is applied only
//! if its sequence is still the latest issued. Without that check an older
//! fetch finishing late would overwrite a newer payload's content.
//!
//! Objects larger than the configured cap are rejected as fetch errors.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Remote object storage, fetch-by-key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// HTTP-backed object store (`{base_url}/{key}`)
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        debug!(%url, "Fetching remote object");
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Fetch an object and enforce the size cap
pub async fn fetch_object(store: &dyn ObjectStore, key: &str, max_bytes: usize) -> Result<Vec<u8>> {
    let bytes = store.get(key).await?;
    if bytes.len() > max_bytes {
        warn!(
            key,
            size = bytes.len(),
            cap = max_bytes,
            "Fetched object exceeds size cap"
        );
        return Err(Error::Fetch(format!(
            "object {} is {} bytes, cap is {}",
            key,
            bytes.len(),
            max_bytes
        )));
    }
    Ok(bytes)
}

/// Issues fetch sequence numbers and decides staleness
///
/// `issue` marks a new fetch as the latest; `is_current` tells a completion
/// handler whether its result may still be applied.
#[derive(Debug, Default)]
pub struct FetchSequencer {
    next: u64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number for a newly dispatched fetch
    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Whether a completed fetch's result is still the latest issued
    pub fn is_current(&self, sequence: u64) -> bool {
        sequence == self.next
    }
}
