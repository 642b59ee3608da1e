use anyhow::Result;
use yuki::{Config, GitHubClient, Lockfile, ReferenceResolver};

pub fn run(package: Option<String>) -> Result<()> {
    let project_dir = super::project_dir()?;
    let lockfile = Lockfile::load(&project_dir)?;

    if lockfile.is_empty() {
        println!("Nothing is locked yet. Run 'yuki install' first.");
        return Ok(());
    }

    println!("Checking for dependency updates...");
    println!();

    let config = Config::load()?;
    let resolver = ReferenceResolver::new(GitHubClient::from_config(&config)?);

    let mut updates = resolver.check_for_updates(&lockfile);
    if let Some(ref name) = package {
        if lockfile.get_package(name).is_none() {
            anyhow::bail!("'{}' is not in yuki.lock", name);
        }
        updates.retain(|u| &u.name == name);
    }

    if updates.is_empty() {
        match package {
            Some(name) => println!("✓ '{}' is up to date", name),
            None => println!("✓ All dependencies are up to date"),
        }
        return Ok(());
    }

    println!("Available updates:");
    for update in &updates {
        println!("  {}: {} → {}", update.name, update.current, update.latest);
    }
    println!();
    println!(
        "Set `version` for a dependency in yuki.toml (e.g. {} = {{ git = \"{}\", version = \"{}\" }}) and run 'yuki install'.",
        updates[0].name, updates[0].source, updates[0].latest
    );

    Ok(())
}
