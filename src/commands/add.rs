use anyhow::{bail, Result};
use tracing::warn;
use yuki::vcs::check_git_available;
use yuki::{add_dependency, parse_package_arg, Config, DependencyKind, Fetcher, Manifest};

pub struct AddOptions {
    pub package: String,
    pub dev: bool,
    pub build: bool,
    pub alias: Option<String>,
    pub branch: Option<String>,
    pub root_file: Option<String>,
}

impl AddOptions {
    fn kind(&self) -> DependencyKind {
        if self.dev {
            DependencyKind::Dev
        } else if self.build {
            DependencyKind::Build
        } else {
            DependencyKind::Runtime
        }
    }
}

pub fn run(options: AddOptions) -> Result<()> {
    let project_dir = super::project_dir()?;
    let mut manifest = Manifest::load(&project_dir)?;

    let (repo_name, mut spec) = parse_package_arg(&options.package)?;
    let name = options.alias.clone().unwrap_or(repo_name);
    if name.trim().is_empty() {
        bail!("Dependency name cannot be empty");
    }

    if let Some(branch) = &options.branch {
        if let Some(version) = spec.version.take() {
            warn!("--branch overrides version '{}'", version);
        }
        spec = spec.with_branch(branch.clone());
    }

    if let Some(root_file) = options
        .root_file
        .clone()
        .or_else(|| manifest.package.root_file.clone())
    {
        spec = spec.with_root_file(root_file);
    }

    let kind = options.kind();
    if let Some(existing) = manifest.dependency_kind(&name) {
        println!("⚠ '{}' is already declared as a {}, replacing it", name, existing.label());
    }

    check_git_available()?;
    let config = Config::load()?;
    let mut fetcher = Fetcher::from_config(&config)?;

    println!("Adding {} ({})...", name, spec.git);
    let added = add_dependency(&mut manifest, &mut fetcher, kind, &name, spec)?;
    for warning in &added.result.warnings {
        println!("  ⚠ {}", warning);
    }

    manifest.save(&project_dir)?;

    let source = if added.result.from_cache { " (cached)" } else { "" };
    println!("  ✓ Resolved {}@{}{}", name, added.result.version, source);
    println!("  ✓ Added to yuki.toml as a {}", kind.label());
    println!();
    println!("Run 'yuki install' to update yuki.lock");

    Ok(())
}
