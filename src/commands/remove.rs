use anyhow::Result;
use yuki::{Lockfile, Manifest};

pub fn run(name: String) -> Result<()> {
    let project_dir = super::project_dir()?;

    println!("Removing dependency: {}", name);
    println!();

    let mut manifest = Manifest::load(&project_dir)?;

    if !manifest.remove_dependency(&name) {
        println!("⚠ '{}' is not declared in yuki.toml", name);
        let declared = manifest.all_dependencies();
        if !declared.is_empty() {
            println!();
            println!("Declared dependencies:");
            for (dep_name, spec) in &declared {
                println!("  - {} ({})", dep_name, spec.git);
            }
        }
        return Ok(());
    }

    manifest.save(&project_dir)?;
    println!("  ✓ Removed from yuki.toml");

    let mut lockfile = Lockfile::load(&project_dir)?;
    if lockfile.remove_package(&name).is_some() {
        lockfile.save(&project_dir)?;
        println!("  ✓ Removed from yuki.lock");
    }

    println!();
    println!("✓ Successfully removed {}", name);
    Ok(())
}
