use anyhow::{bail, Result};
use yuki::{Lockfile, Manifest};

pub fn run(name: String) -> Result<()> {
    let project_dir = super::project_dir()?;
    let manifest = Manifest::load(&project_dir)?;

    let Some(kind) = manifest.dependency_kind(&name) else {
        let declared = manifest.all_dependencies();
        if declared.is_empty() {
            println!("No dependencies declared in yuki.toml");
        } else {
            println!("Declared dependencies:");
            for dep_name in declared.keys() {
                println!("  - {}", dep_name);
            }
            println!();
        }
        bail!("'{}' is not a dependency of this project", name);
    };

    let spec = &manifest.all_dependencies()[&name];
    println!("{} is a direct {}", name, kind.label());
    println!("  Source: {}", spec.git);

    let lockfile = Lockfile::load(&project_dir)?;
    match lockfile.get_package(&name) {
        Some(package) => println!("  Locked: {} ({})", package.version, package.checksum),
        None => println!("  Locked: no (run 'yuki install')"),
    }

    Ok(())
}
