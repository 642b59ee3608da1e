//! Content checksums for files and directory trees
//!
//! A tree checksum is a SHA-256 over every regular file below the root, visited in
//! lexicographic order of their `/`-separated relative paths. For each file the
//! hasher is fed `path \0 hex(sha256(file)) \0`. Anything inside a `.git`
//! directory is skipped, at any depth.
//!
//! # Examples
//!
//! ```no_run
//! use yuki::integrity::{hash_tree, verify};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let checksum = hash_tree("deps/zap")?;
//! verify("deps/zap", &checksum)?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const VCS_DIR: &str = ".git";

/// SHA-256 of a file's raw bytes, as lowercase hex
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name() == VCS_DIR
}

/// Checksum of a whole directory tree, excluding version-control metadata
pub fn hash_tree<P: AsRef<Path>>(root: P) -> Result<String> {
    let root = root.as_ref();
    let mut files: Vec<(String, std::path::PathBuf)> = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_vcs_dir(e))
    {
        let entry = entry.map_err(|e| {
            Error::Other(format!("Failed to walk {}: {}", root.display(), e))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).map_err(|e| {
            Error::Other(format!(
                "Path {} escapes {}: {}",
                entry.path().display(),
                root.display(),
                e
            ))
        })?;

        // Join with '/' so the digest does not depend on the host separator.
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push((key, entry.into_path()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (relative, path) in &files {
        let file_hash = hash_file(path).map_err(|e| {
            Error::Other(format!("Failed to hash file {}: {}", path.display(), e))
        })?;

        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(file_hash.as_bytes());
        hasher.update([0u8]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Recompute the checksum of a file or directory and compare it
pub fn verify<P: AsRef<Path>>(path: P, expected: &str) -> Result<()> {
    let path = path.as_ref();
    let metadata = fs::metadata(path)?;

    let actual = if metadata.is_dir() {
        hash_tree(path)?
    } else {
        hash_file(path)?
    };

    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}
