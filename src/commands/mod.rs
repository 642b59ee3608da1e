pub mod add;
pub mod cache;
pub mod doctor;
pub mod info;
pub mod install;
pub mod list;
pub mod remove;
pub mod sync;
pub mod update;
pub mod verify;
pub mod why;

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use yuki::{Manifest, MANIFEST_NAME};

/// Current directory, which must hold a yuki.toml
fn project_dir() -> Result<PathBuf> {
    let dir = env::current_dir()?;
    if !Manifest::exists(&dir) {
        bail!(
            "No {} found in {}\n\nRun yuki from the root of a project.",
            MANIFEST_NAME,
            dir.display()
        );
    }
    Ok(dir)
}
