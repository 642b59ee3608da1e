use anyhow::{bail, Result};
use yuki::{verify_installed, Config, Fetcher, Lockfile, Manifest};

pub fn run() -> Result<()> {
    let project_dir = super::project_dir()?;

    let manifest = Manifest::load(&project_dir)?;
    let lockfile = Lockfile::load(&project_dir)?;

    if lockfile.is_empty() {
        println!("Nothing is locked yet. Run 'yuki install' first.");
        return Ok(());
    }

    println!("Verifying {} locked dependencies...", lockfile.packages.len());
    println!();

    let config = Config::load()?;
    let mut fetcher = Fetcher::from_config(&config)?;

    let mut failures = 0;
    for verification in verify_installed(&manifest, &lockfile, &mut fetcher) {
        match verification.outcome {
            Ok(path) => println!("  ✓ {} ({})", verification.name, path.display()),
            Err(e) => {
                failures += 1;
                println!("  ✗ {}", verification.name);
                for line in e.to_string().lines() {
                    println!("      {}", line);
                }
            }
        }
    }

    println!();
    if failures > 0 {
        bail!("{} dependencies failed verification", failures);
    }

    println!("✓ All dependencies verified");
    Ok(())
}
