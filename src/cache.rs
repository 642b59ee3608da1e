//! Persistent fetch cache
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/index.json                         key -> entry map, rewritten on every mutation
//! <root>/repos/<owner>/<repo>/<reference>/  retrieved trees
//! ```
//!
//! Entries whose directory has disappeared are dropped the first time they are
//! looked up.

use crate::manifest::Selector;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const INDEX_FILE: &str = "index.json";
const REPOS_DIR: &str = "repos";

/// Lookup key derived from repository and selector
///
/// The dependency's manifest name does not take part, so two aliases of the
/// same repository and selector share an entry. Owner and repository are
/// compared case-insensitively, as GitHub does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(owner: &str, repo: &str, selector: &Selector) -> Self {
        let mut key = format!(
            "{}/{}#{}",
            owner.to_ascii_lowercase(),
            repo.to_ascii_lowercase(),
            selector.kind()
        );
        let value = selector.value();
        if !value.is_empty() {
            key.push('=');
            key.push_str(value);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A previously fetched dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub checksum: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

pub struct FetchCache {
    root: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl FetchCache {
    /// Open (creating if needed) the cache rooted at `root`
    ///
    /// An unreadable index is logged and treated as empty.
    pub fn open<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let index_path = root.join(INDEX_FILE);
        let entries = match fs::read_to_string(&index_path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable cache index {}: {}", index_path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding retrieved trees
    pub fn repos_dir(&self) -> PathBuf {
        self.root.join(REPOS_DIR)
    }

    /// Look up an entry, evicting it if its directory no longer exists
    pub fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.get(key.as_str())?;

        if !entry.path.exists() {
            debug!(
                "Evicting stale cache entry {} ({} is gone)",
                key,
                entry.path.display()
            );
            self.entries.remove(key.as_str());
            if let Err(e) = self.save() {
                warn!("Failed to persist cache eviction for {}: {}", key, e);
            }
            return None;
        }

        Some(entry.clone())
    }

    /// Insert or replace an entry and persist the index
    ///
    /// If the index cannot be written the in-memory map is left unchanged.
    pub fn set(&mut self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        let previous = self.entries.insert(key.as_str().to_string(), entry);

        if let Err(e) = self.save() {
            match previous {
                Some(previous) => self.entries.insert(key.as_str().to_string(), previous),
                None => self.entries.remove(key.as_str()),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn delete(&mut self, key: &CacheKey) -> Result<()> {
        if self.entries.remove(key.as_str()).is_some() {
            self.save()?;
        }
        Ok(())
    }

    /// Drop every entry and every retrieved tree
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();

        let repos = self.repos_dir();
        if repos.exists() {
            fs::remove_dir_all(&repos)?;
        }

        self.save()
    }

    /// Snapshot of all entries, keyed by cache key
    pub fn entries(&self) -> BTreeMap<String, CacheEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes of files under the cache root
    pub fn size(&self) -> u64 {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(self.root.join(INDEX_FILE), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry_at(path: PathBuf) -> CacheEntry {
        CacheEntry {
            path,
            checksum: "abc123".to_string(),
            version: "1.2.0".to_string(),
            commit: None,
        }
    }

    fn key() -> CacheKey {
        CacheKey::new("owner", "repo", &Selector::Tag("v1.2.0".to_string()))
    }

    #[test]
    fn test_key_shape() {
        assert_eq!(key().as_str(), "owner/repo#tag=v1.2.0");
        assert_eq!(
            CacheKey::new("o", "r", &Selector::Unspecified).as_str(),
            "o/r#default"
        );
        assert_eq!(
            CacheKey::new("o", "r", &Selector::LatestRelease).as_str(),
            "o/r#version=latest"
        );
    }

    #[test]
    fn test_key_ignores_owner_case_and_distinguishes_kind() {
        let tag = Selector::Tag("main".to_string());
        let branch = Selector::Branch("main".to_string());
        assert_eq!(CacheKey::new("Owner", "Repo", &tag), CacheKey::new("owner", "repo", &tag));
        assert_ne!(CacheKey::new("o", "r", &tag), CacheKey::new("o", "r", &branch));
    }

    #[test]
    fn test_set_then_get() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();

        let mut cache = FetchCache::open(temp.path().join("cache")).unwrap();
        cache.set(&key(), entry_at(tree.clone())).unwrap();

        assert_eq!(cache.get(&key()), Some(entry_at(tree)));
    }

    #[test]
    fn test_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        let root = temp.path().join("cache");

        {
            let mut cache = FetchCache::open(&root).unwrap();
            cache.set(&key(), entry_at(tree.clone())).unwrap();
        }

        let mut reopened = FetchCache::open(&root).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&key()), Some(entry_at(tree)));
    }

    #[test]
    fn test_stale_entry_evicted_idempotently() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        let root = temp.path().join("cache");

        let mut cache = FetchCache::open(&root).unwrap();
        cache.set(&key(), entry_at(tree.clone())).unwrap();
        fs::remove_dir_all(&tree).unwrap();

        assert_eq!(cache.get(&key()), None);
        assert_eq!(cache.get(&key()), None);
        assert!(cache.is_empty());

        // The eviction reached disk too.
        let reopened = FetchCache::open(&root).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let mut cache = FetchCache::open(temp.path()).unwrap();
        cache.set(&key(), entry_at(temp.path().to_path_buf())).unwrap();

        cache.delete(&key()).unwrap();
        assert_eq!(cache.get(&key()), None);
        cache.delete(&key()).unwrap();
    }

    #[test]
    fn test_clear_removes_trees() {
        let temp = TempDir::new().unwrap();
        let mut cache = FetchCache::open(temp.path()).unwrap();

        let tree = cache.repos_dir().join("owner").join("repo").join("v1.2.0");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("file.zig"), "x").unwrap();
        cache.set(&key(), entry_at(tree.clone())).unwrap();

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(!tree.exists());
        assert!(temp.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_corrupt_index_starts_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(INDEX_FILE), "{ not json").unwrap();

        let cache = FetchCache::open(temp.path()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_counts_files() {
        let temp = TempDir::new().unwrap();
        let cache = FetchCache::open(temp.path()).unwrap();
        fs::create_dir_all(cache.repos_dir()).unwrap();
        fs::write(cache.repos_dir().join("blob"), vec![0u8; 100]).unwrap();

        assert!(cache.size() >= 100);
    }
}
