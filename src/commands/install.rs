use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use yuki::vcs::check_git_available;
use yuki::{install_dependencies, Config, Fetcher, Lockfile, Manifest, ProgressCallback};

/// Create an indicatif spinner driven by per-dependency progress
fn create_spinner() -> Result<(ProgressBar, ProgressCallback)> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    let handle = spinner.clone();
    let callback: ProgressCallback = Arc::new(move |name: &str, current: usize, total: usize| {
        handle.set_message(format!("[{}/{}] Fetching {}...", current, total, name));
    });

    Ok((spinner, callback))
}

pub fn run() -> Result<()> {
    let project_dir = super::project_dir()?;

    let manifest = Manifest::load(&project_dir)?;
    manifest.validate()?;

    let dependencies = manifest.all_dependencies();
    if dependencies.is_empty() {
        println!("No dependencies declared in yuki.toml");
        return Ok(());
    }

    check_git_available()?;

    let config = Config::load()?;
    let mut fetcher = Fetcher::from_config(&config)?;
    let mut lockfile = Lockfile::load(&project_dir)?;

    println!("Installing {} dependencies...", dependencies.len());
    println!();

    let (spinner, progress) = create_spinner()?;
    let outcome = install_dependencies(&manifest, &mut fetcher, &mut lockfile, Some(progress));
    spinner.finish_and_clear();
    let installed = outcome?;

    for dep in &installed {
        let source = if dep.result.from_cache { " (cached)" } else { "" };
        match &dep.result.commit {
            Some(commit) if *commit != dep.result.version => println!(
                "  ✓ {}@{} ({}){}",
                dep.name,
                dep.result.version,
                commit.chars().take(8).collect::<String>(),
                source
            ),
            _ => println!("  ✓ {}@{}{}", dep.name, dep.result.version, source),
        }
        for warning in &dep.result.warnings {
            println!("    ⚠ {}", warning);
        }
    }

    lockfile
        .save(&project_dir)
        .context("Failed to write yuki.lock")?;

    println!();
    println!("✓ Installed {} dependencies", installed.len());
    println!("  Lock file: {}", project_dir.join(yuki::LOCKFILE_NAME).display());

    Ok(())
}
