//! Package content hashing
//!
//! A package's identity for invalidation purposes is the SHA-256 over the
//! concatenated bytes of all its `.class` files, visited in sorted
//! relative-path order. Equal hash means the compiled surface is
//! unchanged and the package can be skipped wholesale.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::scan;

/// Hex SHA-256 digest of every class file under `classes_dir`.
///
/// An empty or missing directory hashes to the digest of zero bytes,
/// which is still a stable, comparable value.
pub fn package_content_hash(classes_dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for class_file in scan::class_files(classes_dir)? {
        let bytes = std::fs::read(&class_file)
            .with_context(|| format!("failed to read {}", class_file.display()))?;
        hasher.update(&bytes);
    }
    Ok(hex_digest(hasher))
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn hash_is_stable_across_calls() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("com")).unwrap();
        fs::write(dir.path().join("com/A.class"), b"alpha").unwrap();
        fs::write(dir.path().join("com/B.class"), b"beta").unwrap();

        let first = package_content_hash(dir.path()).unwrap();
        let second = package_content_hash(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn hash_changes_when_a_class_changes() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("A.class"), b"one").unwrap();
        let before = package_content_hash(dir.path()).unwrap();

        fs::write(dir.path().join("A.class"), b"two").unwrap();
        let after = package_content_hash(dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn non_class_files_do_not_affect_the_hash() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("A.class"), b"one").unwrap();
        let before = package_content_hash(dir.path()).unwrap();

        fs::write(dir.path().join("README.md"), b"docs").unwrap();
        let after = package_content_hash(dir.path()).unwrap();
        assert_eq!(before, after);
    }
}
