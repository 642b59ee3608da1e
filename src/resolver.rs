//! Reference resolution
//!
//! Turns a dependency's declared selector into one concrete reference to
//! retrieve. Rules are tried in this order, first match wins:
//!
//! 1. `rev` is used verbatim and is fixed (content addressed)
//! 2. `tag` is used verbatim
//! 3. `branch` is used verbatim
//! 4. `latest-commit` resolves to the tip of the default branch
//! 5. `version = "latest"` resolves to the latest stable release tag
//! 6. any other `version` is a constraint, see [`ConstraintMatching`]
//! 7. nothing declared: latest stable release, else the default branch tip
//!
//! Each dependency is resolved on its own; there is no transitive resolution.
//!
//! # Examples
//!
//! ```no_run
//! use yuki::{DependencySpec, GitHubClient, ReferenceResolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ReferenceResolver::new(GitHubClient::new("https://api.github.com", None)?);
//! let spec = DependencySpec::new("zigzap/zap").with_version("^0.9.0");
//!
//! let resolved = resolver.resolve("zigzap", "zap", &spec)?;
//! println!("{} -> {}", resolved.version, resolved.reference);
//! # Ok(())
//! # }
//! ```

use crate::config::ConstraintMatching;
use crate::github::{parse_locator, RepositoryMetadata};
use crate::manifest::{DependencySpec, Selector};
use crate::version::{best_match, Constraint, Version};
use crate::{Error, Lockfile, Result};
use tracing::{debug, info, warn};

/// Outcome of resolving one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Tag, branch or commit id handed to the VCS
    pub reference: String,

    /// Version reported to the user and recorded in the lockfile
    pub version: String,

    /// Commit id, when the reference is one
    pub commit: Option<String>,

    /// Content addressed: the same reference always yields the same tree
    pub fixed: bool,

    /// Non-fatal problems with the declaration
    pub warnings: Vec<String>,
}

impl ResolvedReference {
    fn named(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self {
            version: reference.clone(),
            reference,
            commit: None,
            fixed: false,
            warnings: Vec::new(),
        }
    }

    fn commit(sha: String) -> Self {
        Self {
            reference: sha.clone(),
            version: sha.clone(),
            commit: Some(sha),
            fixed: false,
            warnings: Vec::new(),
        }
    }
}

/// A locked package with a newer release available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub name: String,
    pub current: String,
    pub latest: String,
    pub source: String,
}

pub struct ReferenceResolver<M> {
    metadata: M,
    matching: ConstraintMatching,
}

impl<M: RepositoryMetadata> ReferenceResolver<M> {
    pub fn new(metadata: M) -> Self {
        Self {
            metadata,
            matching: ConstraintMatching::default(),
        }
    }

    pub fn with_matching(mut self, matching: ConstraintMatching) -> Self {
        self.matching = matching;
        self
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn resolve(&self, owner: &str, repo: &str, spec: &DependencySpec) -> Result<ResolvedReference> {
        let selector = spec.selector();
        debug!("Resolving {}/{} ({})", owner, repo, selector.kind());

        let mut resolved = match selector {
            Selector::Rev(rev) => ResolvedReference {
                fixed: true,
                commit: Some(rev.clone()),
                ..ResolvedReference::named(rev)
            },
            Selector::Tag(tag) => ResolvedReference::named(tag),
            Selector::Branch(branch) => ResolvedReference::named(branch),
            Selector::LatestCommit => {
                info!("Fetching latest commit of {}/{}", owner, repo);
                ResolvedReference::commit(self.metadata.default_branch_tip(owner, repo)?)
            }
            Selector::LatestRelease => {
                ResolvedReference::named(self.latest_release_tag(owner, repo)?)
            }
            Selector::Constraint(text) => match self.matching {
                ConstraintMatching::BestMatch => self.best_matching_tag(owner, repo, &text)?,
                ConstraintMatching::LiteralTag => self.lookup_literal_tag(owner, repo, &text)?,
            },
            Selector::Unspecified => self.default_reference(owner, repo)?,
        };

        if let Some(warning) = spec.shadowed_constraint_warning() {
            warn!("{}/{}: {}", owner, repo, warning);
            resolved.warnings.push(warning);
        }

        debug!(
            "Resolved {}/{} to '{}' (version {})",
            owner, repo, resolved.reference, resolved.version
        );
        Ok(resolved)
    }

    /// Tag of the newest release that is neither a draft nor a prerelease
    fn latest_release_tag(&self, owner: &str, repo: &str) -> Result<String> {
        let release = self.metadata.latest_release(owner, repo)?;

        if release.draft || release.prerelease || release.tag_name.trim().is_empty() {
            debug!(
                "Ignoring latest release '{}' of {}/{} (draft: {}, prerelease: {})",
                release.tag_name, owner, repo, release.draft, release.prerelease
            );
            return Err(Error::ReleaseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }

        Ok(release.tag_name)
    }

    /// Highest tag satisfying the constraint, retrieved by its own spelling
    fn best_matching_tag(&self, owner: &str, repo: &str, text: &str) -> Result<ResolvedReference> {
        let constraint = Constraint::parse(text)?;

        // Prereleases only take part when the constraint itself names one.
        let allow_prerelease = constraint.version.is_prerelease();
        let (tags, versions): (Vec<String>, Vec<Version>) = self
            .metadata
            .tags(owner, repo)?
            .into_iter()
            .filter_map(|tag| match Version::parse(&tag) {
                Ok(version) => Some((tag, version)),
                Err(_) => {
                    debug!("Skipping non-version tag '{}' of {}/{}", tag, owner, repo);
                    None
                }
            })
            .filter(|(_, version)| allow_prerelease || !version.is_prerelease())
            .unzip();

        let best = best_match(&constraint, &versions)?;
        let tag = versions
            .iter()
            .position(|v| std::ptr::eq(v, best))
            .map(|idx| tags[idx].clone())
            .ok_or_else(|| Error::Other(format!("Lost track of tag for {}", best)))?;

        Ok(ResolvedReference {
            version: best.to_string(),
            ..ResolvedReference::named(tag)
        })
    }

    /// Look up the literal `X.Y.Z` and `vX.Y.Z` tags named by the constraint
    fn lookup_literal_tag(&self, owner: &str, repo: &str, text: &str) -> Result<ResolvedReference> {
        let bare = text.strip_prefix('^').unwrap_or(text);
        let bare = bare.strip_prefix('~').unwrap_or(bare);
        let bare = bare.strip_prefix('=').unwrap_or(bare);

        let candidates = vec![bare.to_string(), format!("v{}", bare)];
        for tag in &candidates {
            match self.metadata.tag_exists(owner, repo, tag) {
                Ok(true) => {
                    return Ok(ResolvedReference {
                        version: text.to_string(),
                        ..ResolvedReference::named(tag.clone())
                    })
                }
                Ok(false) => debug!("Tag '{}' not found in {}/{}", tag, owner, repo),
                Err(e) => debug!("Failed to look up tag '{}' of {}/{}: {}", tag, owner, repo, e),
            }
        }

        Err(Error::NoMatchingTag {
            version: text.to_string(),
            tried: candidates,
        })
    }

    fn default_reference(&self, owner: &str, repo: &str) -> Result<ResolvedReference> {
        match self.latest_release_tag(owner, repo) {
            Ok(tag) => Ok(ResolvedReference::named(tag)),
            Err(e) if e.is_release_not_found() => {
                info!("No releases for {}/{}, using the latest commit", owner, repo);
                Ok(ResolvedReference::commit(
                    self.metadata.default_branch_tip(owner, repo)?,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Locked packages whose repository has a newer stable release
    ///
    /// Packages locked to something other than a version (branch, commit) and
    /// repositories without releases are skipped.
    pub fn check_for_updates(&self, lockfile: &Lockfile) -> Vec<UpdateInfo> {
        let mut updates = Vec::new();

        for package in &lockfile.packages {
            let Ok((owner, repo)) = parse_locator(&package.source) else {
                continue;
            };
            let Ok(current) = Version::parse(&package.version) else {
                debug!("{} is not locked to a version, skipping", package.name);
                continue;
            };

            let tag = match self.latest_release_tag(&owner, &repo) {
                Ok(tag) => tag,
                Err(e) => {
                    debug!("No update information for {}: {}", package.name, e);
                    continue;
                }
            };
            let Ok(latest) = Version::parse(&tag) else {
                continue;
            };

            if latest.compare(&current).is_gt() {
                updates.push(UpdateInfo {
                    name: package.name.clone(),
                    current: package.version.clone(),
                    latest: tag,
                    source: package.source.clone(),
                });
            }
        }

        updates
    }
}
