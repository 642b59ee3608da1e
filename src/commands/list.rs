use anyhow::Result;
use std::collections::BTreeMap;
use yuki::{DependencySpec, Lockfile, Manifest, Selector};

fn describe(selector: &Selector) -> String {
    match selector.value() {
        "" => selector.kind().to_string(),
        value => format!("{} {}", selector.kind(), value),
    }
}

fn print_section(title: &str, deps: &BTreeMap<String, DependencySpec>, lockfile: &Lockfile) {
    if deps.is_empty() {
        return;
    }

    println!("{}:", title);
    for (name, spec) in deps {
        let installed = match lockfile.get_package(name) {
            Some(package) => format!("installed: {}", package.version),
            None => "not installed".to_string(),
        };
        println!("  {} @ {} ({})", name, describe(&spec.selector()), installed);
        println!("    Source: {}", spec.git);
    }
    println!();
}

pub fn run() -> Result<()> {
    let project_dir = super::project_dir()?;
    let manifest = Manifest::load(&project_dir)?;
    let lockfile = Lockfile::load(&project_dir)?;

    let dependencies = manifest.all_dependencies();
    let total = dependencies.len();
    if total == 0 {
        println!("No dependencies declared in yuki.toml");
        return Ok(());
    }

    print_section("Dependencies", &manifest.dependencies, &lockfile);
    print_section("Dev dependencies", &manifest.dev_dependencies, &lockfile);
    print_section("Build dependencies", &manifest.build_dependencies, &lockfile);

    let installed = dependencies
        .keys()
        .filter(|name| lockfile.get_package(name).is_some())
        .count();
    println!("Total: {} package(s), {} installed", total, installed);

    Ok(())
}
