//! Transport seam between the synchronization engine and the content server.
//!
//! The engine only needs three capabilities from the remote side: probe a
//! path, fetch a small resource whole, and stream a large one. The wire
//! protocol behind those lives entirely in the implementation; `HttpRemoteStore`
//! is the production one, tests plug in scriptable in-memory stores.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::errors::{LauncherError, Result};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether a resource exists at `path` under the remote root.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Fetch a small resource in one piece.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    /// Open a byte stream over a (possibly large) resource.
    async fn open(&self, path: &str) -> Result<ByteStream>;
}

pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(20))
            .tcp_nodelay(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn exists(&self, path: &str) -> Result<bool> {
        let url = self.url_for(path);
        let response = self.client.head(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(LauncherError::Http(format!(
                "HTTP {} probing {}",
                response.status().as_u16(),
                url
            )));
        }
        Ok(true)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LauncherError::RemoteMissing(url));
        }
        if !response.status().is_success() {
            return Err(LauncherError::Http(format!(
                "HTTP {} fetching {}",
                response.status().as_u16(),
                url
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn open(&self, path: &str) -> Result<ByteStream> {
        let url = self.url_for(path);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LauncherError::RemoteMissing(url));
        }
        if !response.status().is_success() {
            return Err(LauncherError::Http(format!(
                "HTTP {} streaming {}",
                response.status().as_u16(),
                url
            )));
        }
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(LauncherError::Network));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store doubles used by unit tests across the crate.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves resources from a map, optionally failing the first N opens of
    /// a path with a transient error to exercise the retry path.
    #[derive(Default)]
    pub struct MemoryRemoteStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
        flaky_opens: Mutex<HashMap<String, u32>>,
        pub chunk_size: usize,
    }

    impl MemoryRemoteStore {
        pub fn new() -> Self {
            Self {
                chunk_size: 4,
                ..Self::default()
            }
        }

        pub fn put(&self, path: &str, data: &[u8]) {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
        }

        pub fn remove(&self, path: &str) {
            self.files.lock().unwrap().remove(path);
        }

        /// Fail the next `count` opens of `path` with a transient error.
        pub fn fail_opens(&self, path: &str, count: u32) {
            self.flaky_opens
                .lock()
                .unwrap()
                .insert(path.to_string(), count);
        }

        fn take_failure(&self, path: &str) -> bool {
            let mut flaky = self.flaky_opens.lock().unwrap();
            match flaky.get_mut(path) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl RemoteStore for MemoryRemoteStore {
        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.files.lock().unwrap().contains_key(path))
        }

        async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
            if self.take_failure(path) {
                return Err(LauncherError::Http(format!("simulated outage: {path}")));
            }
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| LauncherError::RemoteMissing(path.to_string()))
        }

        async fn open(&self, path: &str) -> Result<ByteStream> {
            if self.take_failure(path) {
                return Err(LauncherError::Http(format!("simulated outage: {path}")));
            }
            let data = self
                .files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| LauncherError::RemoteMissing(path.to_string()))?;
            let chunk_size = self.chunk_size.max(1);
            let chunks: Vec<Result<Bytes>> = data
                .chunks(chunk_size)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect();
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }
    }
}
