//! Fetch cache management commands
//!
//! - `cache list` - List cached dependencies
//! - `cache clear` - Remove all cached trees and entries
//! - `cache path` - Show the cache location

use anyhow::Result;
use yuki::{Config, FetchCache};

/// Format bytes as human-readable size
pub(super) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn open_cache() -> Result<FetchCache> {
    let config = Config::load()?;
    Ok(FetchCache::open(config.cache_dir())?)
}

pub fn run_list() -> Result<()> {
    let cache = open_cache()?;

    println!("Cached dependencies in {}:", cache.root().display());
    println!();

    let entries = cache.entries();
    if entries.is_empty() {
        println!("  (nothing cached)");
        println!();
        println!("Dependencies are cached automatically when you run `yuki install`.");
        return Ok(());
    }

    for (key, entry) in &entries {
        let status = if entry.path.exists() { "" } else { " (missing)" };
        println!("  {}{}", key, status);
        println!("    version:  {}", entry.version);
        if let Some(commit) = &entry.commit {
            println!("    commit:   {}", commit);
        }
        println!("    checksum: {}", entry.checksum);
        println!("    path:     {}", entry.path.display());
    }

    println!();
    println!(
        "{} entries, {} on disk",
        entries.len(),
        format_size(cache.size())
    );
    Ok(())
}

pub fn run_clear() -> Result<()> {
    let mut cache = open_cache()?;
    let count = cache.len();
    let size = cache.size();

    cache.clear()?;

    println!(
        "✓ Removed {} cached dependencies ({} freed)",
        count,
        format_size(size)
    );
    Ok(())
}

pub fn run_path() -> Result<()> {
    let config = Config::load()?;
    println!("{}", config.cache_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
