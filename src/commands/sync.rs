use anyhow::Result;
use yuki::{Config, ConsistencyChecker, Lockfile, Manifest};

pub fn run() -> Result<()> {
    let project_dir = super::project_dir()?;

    let manifest = Manifest::load(&project_dir)?;
    let lockfile = Lockfile::load(&project_dir)?;
    let dependencies = manifest.all_dependencies();

    println!("Checking dependency synchronization...");

    let config = Config::load()?;
    let checker = ConsistencyChecker::from_config(&config)?;

    checker.check_sync(&dependencies, &lockfile.packages)?;
    println!("  ✓ yuki.lock matches yuki.toml");

    checker.validate_dependencies(&dependencies)?;
    println!("  ✓ {} dependencies are valid", dependencies.len());

    println!();
    println!("✓ All dependencies are synchronized");
    Ok(())
}
