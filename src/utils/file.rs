use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::Result;

const HASH_BUFFER_BYTES: usize = 1024 * 1024;

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; HASH_BUFFER_BYTES];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase and validate a hex digest; `None` if it cannot be a digest.
pub fn sanitize_checksum(value: &str) -> Option<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.len() < 8 {
        return None;
    }
    if !normalized.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(normalized)
}

/// Move a verified temporary file over its final path. Parent directories
/// are created on demand; the rename keeps the prior file intact until the
/// new content is complete.
pub fn promote(temp_path: &Path, final_path: &Path) -> Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(temp_path, final_path)?;
    Ok(())
}

pub fn touch_marker(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)?;
    Ok(())
}

pub fn clear_marker(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("failed to clear marker {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hashes_file_and_bytes_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payload.bin");
        fs::write(&path, b"ember").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), sha256_hex(b"ember"));
    }

    #[test]
    fn sanitize_rejects_non_hex_and_short_values() {
        assert!(sanitize_checksum("zz00").is_none());
        assert!(sanitize_checksum("abc").is_none());
        assert_eq!(
            sanitize_checksum(" ABCDEF0123 ").as_deref(),
            Some("abcdef0123")
        );
    }

    #[test]
    fn promote_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("a.dat.part");
        let target = dir.path().join("nested").join("a.dat");
        fs::write(&temp, b"new").unwrap();
        promote(&temp, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!temp.exists());
    }

    #[test]
    fn markers_roundtrip() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join(".install_in_progress");
        touch_marker(&marker).unwrap();
        assert!(marker.exists());
        clear_marker(&marker);
        assert!(!marker.exists());
        // clearing twice is quiet
        clear_marker(&marker);
    }
}
