//! Installing manifest dependencies and verifying installed trees
//!
//! Dependencies are processed one at a time, in name order. The lockfile is only
//! touched after each successful fetch, and entries for dependencies that left
//! the manifest are dropped at the end of a successful run.
//!
//! # Examples
//!
//! ```no_run
//! use yuki::{install_dependencies, Config, Fetcher, Lockfile, Manifest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load(".")?;
//! let mut lockfile = Lockfile::load(".")?;
//! let mut fetcher = Fetcher::from_config(&Config::load()?)?;
//!
//! let installed = install_dependencies(&manifest, &mut fetcher, &mut lockfile, None)?;
//! lockfile.save(".")?;
//! println!("Installed {} dependencies", installed.len());
//! # Ok(())
//! # }
//! ```

use crate::fetch::{FetchResult, Fetcher};
use crate::github::{parse_locator, RepositoryMetadata};
use crate::manifest::{DependencyKind, DependencySpec};
use crate::vcs::Vcs;
use crate::{integrity, Error, LockedPackage, Lockfile, Manifest, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Progress callback for installation
///
/// Called with the dependency name about to be fetched, its 1-based position and
/// the total number of dependencies.
pub type ProgressCallback = Arc<dyn Fn(&str, usize, usize) + Send + Sync>;

/// A fetched dependency together with its manifest name
#[derive(Debug, Clone)]
pub struct InstalledDependency {
    pub name: String,
    pub result: FetchResult,
}

/// Fetch every manifest dependency and record it in the lockfile
///
/// Stops at the first failure; packages recorded before it stay in `lockfile`.
pub fn install_dependencies<M: RepositoryMetadata, V: Vcs>(
    manifest: &Manifest,
    fetcher: &mut Fetcher<M, V>,
    lockfile: &mut Lockfile,
    progress: Option<ProgressCallback>,
) -> Result<Vec<InstalledDependency>> {
    let dependencies = manifest.all_dependencies();
    let total = dependencies.len();
    let mut installed = Vec::with_capacity(total);

    for (idx, (name, spec)) in dependencies.iter().enumerate() {
        if let Some(ref cb) = progress {
            cb(name, idx + 1, total);
        }

        let result = fetcher.fetch_dependency(name, spec)?;
        lockfile.upsert_package(LockedPackage {
            name: name.clone(),
            version: result.version.clone(),
            source: spec.git.clone(),
            checksum: result.checksum.clone(),
        });

        installed.push(InstalledDependency {
            name: name.clone(),
            result,
        });
    }

    let removed = lockfile.retain_packages(|name| dependencies.contains_key(name));
    for package in removed {
        info!("Removed '{}' from the lock file", package.name);
    }

    Ok(installed)
}

/// A dependency declared by [`add_dependency`]
#[derive(Debug, Clone)]
pub struct AddedDependency {
    pub name: String,
    pub result: FetchResult,
    /// Declaration the new one replaced, if `name` was already declared
    pub replaced: Option<DependencySpec>,
}

/// Parse a package argument: a repository locator with an optional `@version`
///
/// The dependency name is the repository name without `.git`. The `@` of an
/// SSH locator is not a version separator.
pub fn parse_package_arg(text: &str) -> Result<(String, DependencySpec)> {
    let text = text.trim();
    let (locator, version) = match text.rsplit_once('@') {
        Some((locator, version)) if !locator.is_empty() && !version.contains(['/', ':']) => {
            if version.trim().is_empty() {
                return Err(Error::InvalidLocator(text.to_string()));
            }
            (locator, Some(version.trim()))
        }
        _ => (text, None),
    };

    let (_, repo) = parse_locator(locator)?;
    let name = repo.strip_suffix(".git").unwrap_or(&repo).to_string();

    let mut spec = DependencySpec::new(locator);
    if let Some(version) = version {
        spec = spec.with_version(version);
    }
    Ok((name, spec))
}

/// Fetch a dependency and declare it in the manifest table for `kind`
///
/// The manifest is left untouched when the fetch fails. Saving it, and locking
/// the new dependency, is up to the caller.
pub fn add_dependency<M: RepositoryMetadata, V: Vcs>(
    manifest: &mut Manifest,
    fetcher: &mut Fetcher<M, V>,
    kind: DependencyKind,
    name: &str,
    spec: DependencySpec,
) -> Result<AddedDependency> {
    let result = fetcher.fetch_dependency(name, &spec)?;
    let replaced = manifest.insert_dependency(kind, name, spec);
    if replaced.is_some() {
        info!("Replaced the existing declaration of '{}'", name);
    }

    Ok(AddedDependency {
        name: name.to_string(),
        result,
        replaced,
    })
}

/// Verification outcome for one locked package
#[derive(Debug)]
pub struct Verification {
    pub name: String,
    /// Verified tree location, or why verification failed
    pub outcome: Result<PathBuf>,
}

/// Re-check every locked package that is still declared in the manifest
///
/// The tree is located through the fetcher (normally a cache hit) and compared
/// against the checksum recorded in the lockfile.
pub fn verify_installed<M: RepositoryMetadata, V: Vcs>(
    manifest: &Manifest,
    lockfile: &Lockfile,
    fetcher: &mut Fetcher<M, V>,
) -> Vec<Verification> {
    let dependencies = manifest.all_dependencies();

    lockfile
        .packages
        .iter()
        .filter_map(|package| {
            let spec = dependencies.get(&package.name)?;
            let outcome = fetcher
                .fetch_dependency(&package.name, spec)
                .and_then(|fetched| {
                    integrity::verify(&fetched.path, &package.checksum)?;
                    Ok(fetched.path)
                });

            Some(Verification {
                name: package.name.clone(),
                outcome,
            })
        })
        .collect()
}
