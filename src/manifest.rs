//! Manifest handling for yuki.toml
//!
//! # Examples
//!
//! ```no_run
//! use yuki::Manifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load(".")?;
//! for (name, dep) in manifest.all_dependencies() {
//!     println!("{} -> {}", name, dep.git);
//! }
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The manifest filename
pub const MANIFEST_NAME: &str = "yuki.toml";

/// Sentinel version meaning "newest stable release"
pub const LATEST: &str = "latest";

/// Project manifest (yuki.toml)
///
/// Keys yuki does not model are kept in `extra` so a load/save cycle never
/// drops them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageInfo,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, DependencySpec>,

    #[serde(
        default,
        rename = "dev-dependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dev_dependencies: BTreeMap<String, DependencySpec>,

    #[serde(
        default,
        rename = "build-dependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub build_dependencies: BTreeMap<String, DependencySpec>,

    /// Feature name to the features or dependencies it enables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, Vec<String>>,

    /// Named shell commands
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Minimum Zig compiler version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zig_version: Option<String>,

    /// Default entry file for dependencies added to this project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// A dependency as declared in the manifest
///
/// At most one selector applies. `rev`, `tag` and `branch` win over `version`
/// when both are present; see [`DependencySpec::selector`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Repository locator (`owner/repo`, HTTPS URL or SSH form)
    pub git: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    /// Track the tip of the default branch
    #[serde(
        default,
        rename = "latest-commit",
        alias = "latest_commit",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub latest_commit: bool,

    /// Entry file inside the dependency, for build tooling
    #[serde(alias = "root-file", skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Manifest table a dependency is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Runtime,
    Dev,
    Build,
}

impl DependencyKind {
    pub fn label(&self) -> &'static str {
        match self {
            DependencyKind::Runtime => "runtime dependency",
            DependencyKind::Dev => "development dependency",
            DependencyKind::Build => "build dependency",
        }
    }
}

/// The effective selector of a dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Rev(String),
    Tag(String),
    Branch(String),
    LatestCommit,
    LatestRelease,
    Constraint(String),
    Unspecified,
}

impl Selector {
    /// Short name used in cache keys and log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Selector::Rev(_) => "rev",
            Selector::Tag(_) => "tag",
            Selector::Branch(_) => "branch",
            Selector::LatestCommit => "latest-commit",
            Selector::LatestRelease | Selector::Constraint(_) => "version",
            Selector::Unspecified => "default",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Selector::Rev(v) | Selector::Tag(v) | Selector::Branch(v) | Selector::Constraint(v) => {
                v.as_str()
            }
            Selector::LatestRelease => LATEST,
            Selector::LatestCommit | Selector::Unspecified => "",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl DependencySpec {
    pub fn new(git: impl Into<String>) -> Self {
        Self {
            git: git.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    pub fn with_root_file(mut self, root_file: impl Into<String>) -> Self {
        self.root_file = Some(root_file.into());
        self
    }

    /// Resolve the declared fields into the single selector that applies
    pub fn selector(&self) -> Selector {
        if let Some(rev) = non_empty(&self.rev) {
            Selector::Rev(rev.to_string())
        } else if let Some(tag) = non_empty(&self.tag) {
            Selector::Tag(tag.to_string())
        } else if let Some(branch) = non_empty(&self.branch) {
            Selector::Branch(branch.to_string())
        } else if self.latest_commit {
            Selector::LatestCommit
        } else if let Some(version) = non_empty(&self.version) {
            if version == LATEST {
                Selector::LatestRelease
            } else {
                Selector::Constraint(version.to_string())
            }
        } else {
            Selector::Unspecified
        }
    }

    /// Warning for a version constraint shadowed by an explicit reference
    pub fn shadowed_constraint_warning(&self) -> Option<String> {
        let version = non_empty(&self.version)?;
        let (field, value) = if let Some(rev) = non_empty(&self.rev) {
            ("rev", rev)
        } else if let Some(tag) = non_empty(&self.tag) {
            ("tag", tag)
        } else if let Some(branch) = non_empty(&self.branch) {
            ("branch", branch)
        } else {
            return None;
        };

        Some(format!(
            "version '{}' is ignored because {} '{}' is set",
            version, field, value
        ))
    }
}

impl Manifest {
    /// Load manifest from yuki.toml in the given directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let manifest_path = dir.as_ref().join(MANIFEST_NAME);

        if !manifest_path.exists() {
            return Err(Error::InvalidManifest(format!(
                "{} not found in {}",
                MANIFEST_NAME,
                dir.as_ref().display()
            )));
        }

        let content = fs::read_to_string(&manifest_path)?;
        let manifest: Manifest = toml::from_str(&content)?;
        Ok(manifest)
    }

    /// Save manifest to yuki.toml in the given directory
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(dir.as_ref().join(MANIFEST_NAME), content)?;
        Ok(())
    }

    pub fn exists<P: AsRef<Path>>(dir: P) -> bool {
        dir.as_ref().join(MANIFEST_NAME).exists()
    }

    pub fn validate(&self) -> Result<()> {
        if self.package.name.trim().is_empty() {
            return Err(Error::InvalidManifest("package name is required".to_string()));
        }
        if self.package.version.trim().is_empty() {
            return Err(Error::InvalidManifest(
                "package version is required".to_string(),
            ));
        }

        for (name, dep) in self.all_dependencies() {
            if dep.git.trim().is_empty() {
                return Err(Error::InvalidManifest(format!(
                    "dependency '{}' must have a git locator",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Runtime, dev and build dependencies merged, keyed by name
    ///
    /// A name declared in several tables resolves to the later table
    /// (build over dev over runtime).
    pub fn all_dependencies(&self) -> BTreeMap<String, DependencySpec> {
        let mut all = self.dependencies.clone();
        all.extend(self.dev_dependencies.clone());
        all.extend(self.build_dependencies.clone());
        all
    }

    /// Remove a dependency from every table; true if anything was removed
    pub fn remove_dependency(&mut self, name: &str) -> bool {
        self.take_dependency(name).is_some()
    }

    /// Remove a dependency from every table, returning the effective declaration
    pub fn take_dependency(&mut self, name: &str) -> Option<DependencySpec> {
        let runtime = self.dependencies.remove(name);
        let dev = self.dev_dependencies.remove(name);
        let build = self.build_dependencies.remove(name);
        build.or(dev).or(runtime)
    }

    /// Declare `name` in the table for `kind`, replacing any earlier declaration
    pub fn insert_dependency(
        &mut self,
        kind: DependencyKind,
        name: impl Into<String>,
        spec: DependencySpec,
    ) -> Option<DependencySpec> {
        let name = name.into();
        let previous = self.take_dependency(&name);
        let table = match kind {
            DependencyKind::Runtime => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Build => &mut self.build_dependencies,
        };
        table.insert(name, spec);
        previous
    }

    /// Table whose declaration of `name` is effective, see [`Manifest::all_dependencies`]
    pub fn dependency_kind(&self, name: &str) -> Option<DependencyKind> {
        if self.build_dependencies.contains_key(name) {
            Some(DependencyKind::Build)
        } else if self.dev_dependencies.contains_key(name) {
            Some(DependencyKind::Dev)
        } else if self.dependencies.contains_key(name) {
            Some(DependencyKind::Runtime)
        } else {
            None
        }
    }
}
