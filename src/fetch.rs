//! Dependency fetching
//!
//! [`Fetcher::fetch_dependency`] runs the whole pipeline for one dependency:
//! locator parsing, cache lookup, reference resolution, retrieval into
//! `<cache>/repos/<owner>/<repo>/<reference>`, removal of VCS metadata, tree
//! checksum and finally the cache write. A failure at any step leaves neither a
//! retrieval directory nor a cache entry behind.

use crate::cache::{CacheEntry, CacheKey, FetchCache};
use crate::github::{parse_locator, GitHubClient, RepositoryMetadata};
use crate::integrity;
use crate::manifest::DependencySpec;
use crate::resolver::{ReferenceResolver, ResolvedReference};
use crate::vcs::{strategy_for, SystemGit, Vcs};
use crate::{Config, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A fetched dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub path: PathBuf,
    pub checksum: String,
    pub version: String,
    pub commit: Option<String>,
    pub warnings: Vec<String>,
    /// Served from the cache without touching the remote
    pub from_cache: bool,
}

impl FetchResult {
    fn from_entry(entry: CacheEntry, warnings: Vec<String>) -> Self {
        Self {
            path: entry.path,
            checksum: entry.checksum,
            version: entry.version,
            commit: entry.commit,
            warnings,
            from_cache: true,
        }
    }
}

pub struct Fetcher<M, V = SystemGit> {
    cache: FetchCache,
    resolver: ReferenceResolver<M>,
    vcs: V,
    clone_url: String,
}

impl Fetcher<GitHubClient, SystemGit> {
    /// Fetcher backed by GitHub and the system `git`, rooted at the configured cache
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = FetchCache::open(config.cache_dir())?;
        let resolver = ReferenceResolver::new(GitHubClient::from_config(config)?)
            .with_matching(config.resolver.constraint_matching);

        Ok(Self::new(cache, resolver, SystemGit).with_clone_url(config.github.clone_url.clone()))
    }
}

/// Directory name for a reference
///
/// Distinct references always get distinct names: everything outside
/// `[A-Za-z0-9._~-]` is percent-encoded, and so are the dots of `.` and `..`.
pub fn sanitize_reference(reference: &str) -> String {
    if !reference.is_empty() && reference.chars().all(|c| c == '.') {
        return reference.replace('.', "%2E");
    }
    urlencoding::encode(reference).into_owned()
}

fn remove_vcs_metadata(dir: &Path) -> Result<()> {
    let git = dir.join(".git");
    // Worktrees and submodules use a `.git` file instead of a directory.
    match fs::symlink_metadata(&git) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&git)?,
        Ok(_) => fs::remove_file(&git)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

impl<M: RepositoryMetadata, V: Vcs> Fetcher<M, V> {
    pub fn new(cache: FetchCache, resolver: ReferenceResolver<M>, vcs: V) -> Self {
        Self {
            cache,
            resolver,
            vcs,
            clone_url: "https://github.com".to_string(),
        }
    }

    /// Base URL repositories are cloned from (`<base>/<owner>/<repo>.git`)
    pub fn with_clone_url(mut self, clone_url: impl Into<String>) -> Self {
        self.clone_url = clone_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut FetchCache {
        &mut self.cache
    }

    pub fn resolver(&self) -> &ReferenceResolver<M> {
        &self.resolver
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Fetch one dependency, from the cache when possible
    ///
    /// Errors are wrapped in [`Error::Dependency`] naming `name`.
    pub fn fetch_dependency(&mut self, name: &str, spec: &DependencySpec) -> Result<FetchResult> {
        self.fetch_inner(name, spec)
            .map_err(|e| Error::for_dependency(name, e))
    }

    fn fetch_inner(&mut self, name: &str, spec: &DependencySpec) -> Result<FetchResult> {
        let (owner, repo) = parse_locator(&spec.git)?;
        let key = CacheKey::new(&owner, &repo, &spec.selector());

        if let Some(entry) = self.cache.get(&key) {
            debug!("Using cached version of '{}' ({})", name, key);
            let warnings = spec.shadowed_constraint_warning().into_iter().collect();
            return Ok(FetchResult::from_entry(entry, warnings));
        }

        info!("Fetching dependency '{}' from {}/{}", name, owner, repo);
        let resolved = self.resolver.resolve(&owner, &repo, spec)?;

        let dest = self
            .cache
            .repos_dir()
            .join(&owner)
            .join(&repo)
            .join(sanitize_reference(&resolved.reference));

        let checksum = match self.populate(&owner, &repo, &resolved, &dest, &key) {
            Ok(checksum) => checksum,
            Err(e) => {
                if dest.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&dest) {
                        warn!("Failed to clean up {}: {}", dest.display(), cleanup);
                    }
                }
                return Err(e);
            }
        };

        match &resolved.commit {
            Some(commit) => info!(
                "Fetched '{}@{}' (commit: {})",
                name,
                resolved.version,
                commit.chars().take(8).collect::<String>()
            ),
            None => info!("Fetched '{}@{}'", name, resolved.version),
        }

        Ok(FetchResult {
            path: dest,
            checksum,
            version: resolved.version,
            commit: resolved.commit,
            warnings: resolved.warnings,
            from_cache: false,
        })
    }

    /// Retrieve, strip, checksum and record; returns the tree checksum
    fn populate(
        &mut self,
        owner: &str,
        repo: &str,
        resolved: &ResolvedReference,
        dest: &Path,
        key: &CacheKey,
    ) -> Result<String> {
        if dest.exists() {
            debug!("Removing previous retrieval at {}", dest.display());
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = format!("{}/{}/{}.git", self.clone_url, owner, repo);
        let strategy = strategy_for(&resolved.reference);
        debug!(
            "Retrieving {}@{} into {} ({:?})",
            url,
            resolved.reference,
            dest.display(),
            strategy
        );
        strategy.retrieve(&self.vcs, &url, &resolved.reference, dest)?;

        remove_vcs_metadata(dest)?;
        let checksum = integrity::hash_tree(dest)?;

        self.cache.set(
            key,
            CacheEntry {
                path: dest.to_path_buf(),
                checksum: checksum.clone(),
                version: resolved.version.clone(),
                commit: resolved.commit.clone(),
            },
        )?;

        Ok(checksum)
    }

    /// Check a fetched tree against a recorded checksum
    pub fn verify_dependency<P: AsRef<Path>>(&self, path: P, checksum: &str) -> Result<()> {
        integrity::verify(path, checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_reference() {
        assert_eq!(sanitize_reference("v1.2.3-rc.1"), "v1.2.3-rc.1");
        assert_eq!(sanitize_reference("feature/new-api"), "feature%2Fnew-api");
        assert_eq!(sanitize_reference("a:b\\c d"), "a%3Ab%5Cc%20d");
        assert_eq!(sanitize_reference("../escape"), "..%2Fescape");
        assert_eq!(sanitize_reference(".."), "%2E%2E");
    }

    #[test]
    fn test_sanitize_reference_is_one_to_one() {
        let references = ["feature/x", "feature_x", "feature%2Fx", "..", "%2E%2E", "a b", "a+b"];
        let names: std::collections::BTreeSet<_> =
            references.iter().map(|r| sanitize_reference(r)).collect();
        assert_eq!(names.len(), references.len());
    }

    #[test]
    fn test_remove_vcs_metadata_dir_and_file() {
        let temp = TempDir::new().unwrap();

        let with_dir = temp.path().join("a");
        fs::create_dir_all(with_dir.join(".git").join("objects")).unwrap();
        remove_vcs_metadata(&with_dir).unwrap();
        assert!(!with_dir.join(".git").exists());

        let with_file = temp.path().join("b");
        fs::create_dir_all(&with_file).unwrap();
        fs::write(with_file.join(".git"), "gitdir: elsewhere").unwrap();
        remove_vcs_metadata(&with_file).unwrap();
        assert!(!with_file.join(".git").exists());

        remove_vcs_metadata(&with_file).unwrap();
    }
}
