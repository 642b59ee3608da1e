//! Lockfile generation and parsing for reproducible installs
//!
//! This module handles `yuki.lock`, which records the exact version, source and
//! tree checksum of every installed dependency. Packages are kept sorted by name
//! so the file diffs cleanly under version control.
//!
//! # Examples
//!
//! ```no_run
//! use yuki::{LockedPackage, Lockfile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut lockfile = Lockfile::load(".")?;
//! lockfile.upsert_package(LockedPackage {
//!     name: "zap".to_string(),
//!     version: "0.9.1".to_string(),
//!     source: "zigzap/zap".to_string(),
//!     checksum: "3f1a...".to_string(),
//! });
//! lockfile.save(".")?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// The lockfile filename
pub const LOCKFILE_NAME: &str = "yuki.lock";

/// Current lockfile format version
pub const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub metadata: LockfileMetadata,

    #[serde(rename = "package", default)]
    pub packages: Vec<LockedPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockfileMetadata {
    /// Format version; older writers store it as a string (`version = "1"`)
    #[serde(default = "default_format_version", deserialize_with = "format_version")]
    pub version: u32,

    /// Tool and version that wrote the file
    #[serde(default)]
    pub generator: String,

    /// Timestamp of the last modification (RFC 3339)
    #[serde(default)]
    pub generated_at: String,
}

fn default_format_version() -> u32 {
    LOCKFILE_VERSION
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFormatVersion {
    Number(u32),
    Text(String),
}

fn format_version<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    match RawFormatVersion::deserialize(deserializer)? {
        RawFormatVersion::Number(version) => Ok(version),
        RawFormatVersion::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid lockfile format version '{}'", text))),
    }
}

/// One installed dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,

    /// Resolved version, tag, branch or commit id
    pub version: String,

    /// Repository locator as declared in the manifest
    pub source: String,

    /// Tree checksum of the retrieved content
    pub checksum: String,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Lockfile {
    pub fn new() -> Self {
        Self {
            metadata: LockfileMetadata {
                version: LOCKFILE_VERSION,
                generator: format!("yuki {}", env!("CARGO_PKG_VERSION")),
                generated_at: now(),
            },
            packages: Vec::new(),
        }
    }

    /// Load yuki.lock from a project directory; an absent file is an empty lockfile
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::load_from(dir.as_ref().join(LOCKFILE_NAME))?.unwrap_or_default())
    }

    /// Load a lockfile from a specific path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        let mut lockfile: Lockfile = toml::from_str(&contents).map_err(|e| {
            Error::Other(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if lockfile.metadata.version > LOCKFILE_VERSION {
            return Err(Error::Other(format!(
                "{} uses lockfile format {}, newer than this yuki supports ({})",
                path.display(),
                lockfile.metadata.version,
                LOCKFILE_VERSION
            )));
        }

        lockfile.packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(lockfile))
    }

    /// Save yuki.lock into a project directory
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        self.save_to(dir.as_ref().join(LOCKFILE_NAME))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), toml_string)?;
        Ok(())
    }

    /// Add or replace a package, keeping name order
    pub fn upsert_package(&mut self, package: LockedPackage) {
        match self
            .packages
            .binary_search_by(|p| p.name.as_str().cmp(&package.name))
        {
            Ok(idx) => self.packages[idx] = package,
            Err(idx) => self.packages.insert(idx, package),
        }
        self.metadata.generated_at = now();
    }

    pub fn remove_package(&mut self, name: &str) -> Option<LockedPackage> {
        let idx = self.packages.iter().position(|p| p.name == name)?;
        self.metadata.generated_at = now();
        Some(self.packages.remove(idx))
    }

    /// Keep only packages whose name passes `keep`; returns the removed ones
    pub fn retain_packages<F>(&mut self, mut keep: F) -> Vec<LockedPackage>
    where
        F: FnMut(&str) -> bool,
    {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.packages)
            .into_iter()
            .partition(|p| keep(&p.name));
        self.packages = kept;

        if !removed.is_empty() {
            self.metadata.generated_at = now();
        }
        removed
    }

    pub fn get_package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}
