//! Fetching and parsing the authoritative file manifest.
//!
//! Wire format, one record per line, three tab-separated fields:
//!
//! ```text
//! relative/path<TAB>size_in_bytes<TAB>sha256_hex
//! ```
//!
//! Blank lines are ignored. Any malformed line, or a duplicate path, fails
//! the whole manifest; partial manifests are never accepted. The manifest
//! body is validated against its companion checksum resource before parsing
//! so a truncated transfer can never be mistaken for a short manifest.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{LauncherError, Result};
use crate::models::{Manifest, ManifestEntry};
use crate::remote::RemoteStore;
use crate::utils::file::{sanitize_checksum, sha256_hex};
use crate::utils::paths::{MANIFEST_CHECKSUM_PATH, MANIFEST_PATH};

pub struct ManifestService {
    store: Arc<dyn RemoteStore>,
}

impl ManifestService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Fetch the remote manifest, validating its transport integrity first.
    /// Never cached; the remote content may change between attempts.
    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        let checksum_raw = self
            .store
            .fetch(MANIFEST_CHECKSUM_PATH)
            .await
            .map_err(|err| match err {
                LauncherError::RemoteMissing(path) => {
                    LauncherError::ManifestCorrupt(format!("manifest checksum missing: {path}"))
                }
                other => other,
            })?;
        let expected = parse_checksum_resource(&checksum_raw)?;

        let body = self.store.fetch(MANIFEST_PATH).await.map_err(|err| match err {
            LauncherError::RemoteMissing(path) => {
                LauncherError::ManifestCorrupt(format!("manifest missing: {path}"))
            }
            other => other,
        })?;

        let actual = sha256_hex(&body);
        if actual != expected {
            return Err(LauncherError::ManifestCorrupt(format!(
                "manifest body digest {actual} does not match advertised {expected}"
            )));
        }

        let text = String::from_utf8(body)
            .map_err(|_| LauncherError::ManifestParse("manifest is not valid UTF-8".to_string()))?;
        let manifest = parse_manifest(&text)?;
        tracing::info!(
            "manifest fetched: {} entries, {} bytes total",
            manifest.len(),
            manifest.total_bytes()
        );
        Ok(manifest)
    }
}

fn parse_checksum_resource(raw: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(raw);
    let token = text.split_whitespace().next().unwrap_or_default();
    sanitize_checksum(token).ok_or_else(|| {
        LauncherError::ManifestCorrupt(format!("invalid manifest checksum resource: {token:?}"))
    })
}

/// Parse the line-oriented manifest body. All-or-nothing: the first bad
/// line fails the whole document.
pub fn parse_manifest(text: &str) -> Result<Manifest> {
    let mut entries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let (path, size, checksum) = match (fields.next(), fields.next(), fields.next()) {
            (Some(path), Some(size), Some(checksum)) if fields.next().is_none() => {
                (path, size, checksum)
            }
            _ => {
                return Err(LauncherError::ManifestParse(format!(
                    "line {line_no}: expected 3 tab-separated fields"
                )))
            }
        };

        let relative_path = crate::utils::paths::normalize_relative_path(path);
        if relative_path.is_empty()
            || !crate::utils::paths::is_safe_relative_path(std::path::Path::new(&relative_path))
        {
            return Err(LauncherError::ManifestParse(format!(
                "line {line_no}: unsafe path {path:?}"
            )));
        }
        if !seen.insert(relative_path.clone()) {
            return Err(LauncherError::ManifestParse(format!(
                "line {line_no}: duplicate path {relative_path:?}"
            )));
        }

        let expected_size: u64 = size.trim().parse().map_err(|_| {
            LauncherError::ManifestParse(format!("line {line_no}: invalid size {size:?}"))
        })?;
        let expected_checksum = sanitize_checksum(checksum).ok_or_else(|| {
            LauncherError::ManifestParse(format!("line {line_no}: invalid checksum {checksum:?}"))
        })?;

        entries.push(ManifestEntry {
            relative_path,
            expected_size,
            expected_checksum,
        });
    }

    Ok(Manifest::new(entries))
}
