//! Yuki - a package manager for Zig projects
//!
//! Yuki takes the dependencies declared in `yuki.toml`, turns each declared
//! selector (revision, tag, branch, version constraint or "latest") into one
//! concrete git reference, retrieves that tree into a local cache and records
//! the result in `yuki.lock`:
//!
//! - Version constraints (`^`, `~`, `>=`, `<=`, `>`, `<`, `=`) over semantic versions
//! - A documented resolution order with fallbacks when a repository has no releases
//! - A persistent, self-healing fetch cache keyed by repository and selector
//! - SHA-256 tree checksums that ignore `.git` metadata
//! - Drift detection between manifest and lock file
//!
//! Each dependency is resolved on its own; transitive dependencies are not
//! followed.
//!
//! # Examples
//!
//! ```no_run
//! use yuki::{Config, DependencySpec, Fetcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let mut fetcher = Fetcher::from_config(&config)?;
//!
//! let spec = DependencySpec::new("zigzap/zap").with_version("^0.9.0");
//! let fetched = fetcher.fetch_dependency("zap", &spec)?;
//! println!("zap {} at {}", fetched.version, fetched.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`version`] - Semantic versions, constraints and best-match selection
//! - [`integrity`] - File and directory-tree checksums
//! - [`cache`] - The persistent fetch cache
//! - [`github`] - Repository metadata from GitHub and locator parsing
//! - [`vcs`] - Git invocation and retrieval strategies
//! - [`resolver`] - Selector to reference resolution
//! - [`fetch`] - The fetch pipeline
//! - [`checker`] - Manifest/lockfile consistency
//! - [`manifest`] - yuki.toml
//! - [`lockfile`] - yuki.lock
//! - [`installer`] - Whole-manifest install and verification
//! - [`config`] - User configuration
//! - [`error`] - Error types and result handling

pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod fetch;
pub mod github;
pub mod installer;
pub mod integrity;
pub mod lockfile;
pub mod manifest;
pub mod resolver;
pub mod vcs;
pub mod version;

pub use cache::{CacheEntry, CacheKey, FetchCache};
pub use checker::ConsistencyChecker;
pub use config::{Config, ConstraintMatching};
pub use error::{Error, Result};
pub use fetch::{FetchResult, Fetcher};
pub use github::{
    parse_locator, GitHubClient, RateLimit, Release, RepositoryInfo, RepositoryMetadata,
};
pub use installer::{
    add_dependency, install_dependencies, parse_package_arg, verify_installed, AddedDependency,
    InstalledDependency, ProgressCallback, Verification,
};
pub use lockfile::{LockedPackage, Lockfile, LOCKFILE_NAME};
pub use manifest::{DependencyKind, DependencySpec, Manifest, Selector, MANIFEST_NAME};
pub use resolver::{ReferenceResolver, ResolvedReference, UpdateInfo};
pub use vcs::{RetrievalStrategy, SystemGit, Vcs, VcsOutput};
pub use version::{Constraint, Version};
