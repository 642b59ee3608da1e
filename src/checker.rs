//! Manifest and lockfile consistency
//!
//! [`ConsistencyChecker::check_sync`] reports drift between the dependency names
//! in yuki.toml and yuki.lock. [`ConsistencyChecker::validate_dependencies`]
//! checks that each declaration is well formed and its repository reachable,
//! without fetching anything.

use crate::github::{parse_locator, GitHubClient, RepositoryMetadata};
use crate::manifest::{DependencySpec, LATEST};
use crate::version::Constraint;
use crate::{Config, Error, LockedPackage, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub struct ConsistencyChecker<M> {
    metadata: M,
}

impl ConsistencyChecker<GitHubClient> {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(GitHubClient::from_config(config)?))
    }
}

/// Drift between manifest and lockfile names, manifest-only names first
pub fn drift_issues(
    manifest_deps: &BTreeMap<String, DependencySpec>,
    locked: &[LockedPackage],
) -> Vec<String> {
    let locked_names: BTreeSet<&str> = locked.iter().map(|p| p.name.as_str()).collect();

    let mut issues: Vec<String> = manifest_deps
        .keys()
        .filter(|name| !locked_names.contains(name.as_str()))
        .map(|name| format!("'{}' is in manifest but not in lock file", name))
        .collect();

    issues.extend(
        locked
            .iter()
            .filter(|p| !manifest_deps.contains_key(&p.name))
            .map(|p| format!("'{}' is in lock file but not in manifest", p.name)),
    );

    issues
}

impl<M: RepositoryMetadata> ConsistencyChecker<M> {
    pub fn new(metadata: M) -> Self {
        Self { metadata }
    }

    /// Fail with [`Error::DriftDetected`] unless both sides name the same dependencies
    pub fn check_sync(
        &self,
        manifest_deps: &BTreeMap<String, DependencySpec>,
        locked: &[LockedPackage],
    ) -> Result<()> {
        let issues = drift_issues(manifest_deps, locked);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::DriftDetected(issues))
        }
    }

    /// Re-check every declaration; stops at the first invalid one
    pub fn validate_dependencies(&self, manifest_deps: &BTreeMap<String, DependencySpec>) -> Result<()> {
        for (name, spec) in manifest_deps {
            self.validate_one(spec)
                .map_err(|e| Error::for_dependency(name.as_str(), e))?;
            debug!("Dependency '{}' is valid", name);
        }
        Ok(())
    }

    fn validate_one(&self, spec: &DependencySpec) -> Result<()> {
        let (owner, repo) = parse_locator(&spec.git)?;
        self.metadata.repository(&owner, &repo)?;

        if let Some(version) = spec.version.as_deref().map(str::trim) {
            if !version.is_empty() && version != LATEST {
                Constraint::parse(version)?;
            }
        }
        Ok(())
    }
}
