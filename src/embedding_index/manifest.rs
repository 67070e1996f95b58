//! Companion model manifest: a JSON document listing, for each file
//! contributing to an embedding model, its SHA-256 (spec §6, "Persistent
//! indices"). Every listed file must match on startup or it fails;
//! grounded on the teacher's `content_addressing::calculate_sha256` idiom.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileHash {
    pub path: String,
    pub sha256: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Verifies every file listed in `manifest` still matches its recorded hash
/// on disk at `base_dir`. Returns the name of the first file that fails to
/// match, or doesn't exist.
pub fn verify_file_hashes(base_dir: &Path, manifest: &[FileHash]) -> Result<()> {
    for entry in manifest {
        let full_path = base_dir.join(&entry.path);
        let content = fs::read(&full_path)
            .map_err(|e| Error::Configuration(format!("manifest file missing: {}: {e}", entry.path)))?;
        let actual = sha256_hex(&content);
        if actual != entry.sha256 {
            return Err(Error::Configuration(format!(
                "manifest hash mismatch for {}: expected {}, found {actual}",
                entry.path, entry.sha256
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_hash_passes() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("model.bin");
        fs::write(&file_path, b"weights").unwrap();

        let manifest = vec![FileHash {
            path: "model.bin".into(),
            sha256: sha256_hex(b"weights"),
        }];

        assert!(verify_file_hashes(dir.path(), &manifest).is_ok());
    }

    #[test]
    fn mismatched_hash_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("model.bin");
        fs::write(&file_path, b"weights-v2").unwrap();

        let manifest = vec![FileHash {
            path: "model.bin".into(),
            sha256: sha256_hex(b"weights"),
        }];

        assert!(verify_file_hashes(dir.path(), &manifest).is_err());
    }

    #[test]
    fn missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = vec![FileHash {
            path: "absent.bin".into(),
            sha256: "deadbeef".into(),
        }];
        assert!(verify_file_hashes(dir.path(), &manifest).is_err());
    }
}
