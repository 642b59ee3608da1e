//! Doctor command - diagnose setup issues
//!
//! Checks git, the configuration, the fetch cache, GitHub connectivity and,
//! inside a project, the manifest and lock file.

use anyhow::{bail, Result};
use std::env;
use yuki::checker::drift_issues;
use yuki::vcs::check_git_available;
use yuki::{Config, FetchCache, GitHubClient, Lockfile, Manifest};

/// Status of a check
#[derive(Debug)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    details: Option<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn print(&self) {
        println!("  {} {} - {}", self.status.symbol(), self.name, self.message);
        if let Some(ref details) = self.details {
            for line in details.lines() {
                println!("      {}", line);
            }
        }
    }
}

fn check_git() -> CheckResult {
    match check_git_available() {
        Ok(version) => CheckResult::new("Git", CheckStatus::Ok, version),
        Err(e) => CheckResult::new("Git", CheckStatus::Error, "git not found")
            .with_details(e.to_string()),
    }
}

fn check_auth(config: &Config) -> CheckResult {
    if config.github.token.is_some() {
        CheckResult::new("GitHub token", CheckStatus::Ok, "configured")
    } else {
        CheckResult::new("GitHub token", CheckStatus::Warning, "not configured").with_details(
            "Unauthenticated requests are limited to 60 per hour.\n\
             Set GITHUB_TOKEN or github.token in config.toml.",
        )
    }
}

fn check_cache(config: &Config) -> CheckResult {
    let dir = config.cache_dir();
    match FetchCache::open(&dir) {
        Ok(cache) => CheckResult::new(
            "Cache",
            CheckStatus::Ok,
            format!(
                "{} entries, {}",
                cache.len(),
                super::cache::format_size(cache.size())
            ),
        )
        .with_details(dir.display().to_string()),
        Err(e) => CheckResult::new("Cache", CheckStatus::Error, "cannot be opened")
            .with_details(format!("{}\n{}", dir.display(), e)),
    }
}

fn check_github(config: &Config) -> CheckResult {
    let quota = GitHubClient::from_config(config).and_then(|client| client.rate_limit());
    match quota {
        Ok(quota) if quota.remaining == 0 => CheckResult::new(
            "GitHub API",
            CheckStatus::Warning,
            format!("reachable, rate limit exhausted ({} per hour)", quota.limit),
        ),
        Ok(quota) => CheckResult::new(
            "GitHub API",
            CheckStatus::Ok,
            format!("reachable, {}/{} requests left", quota.remaining, quota.limit),
        ),
        Err(e) => CheckResult::new("GitHub API", CheckStatus::Error, "unreachable")
            .with_details(format!("{}\n{}", config.github.api_url, e)),
    }
}

/// Manifest and lock file checks, when run inside a project
fn check_project() -> Option<Vec<CheckResult>> {
    let dir = env::current_dir().ok()?;
    if !Manifest::exists(&dir) {
        return None;
    }

    let manifest = match Manifest::load(&dir).and_then(|m| m.validate().map(|_| m)) {
        Ok(manifest) => manifest,
        Err(e) => {
            return Some(vec![CheckResult::new("Manifest", CheckStatus::Error, "invalid")
                .with_details(e.to_string())])
        }
    };

    let dependencies = manifest.all_dependencies();
    let mut results = vec![CheckResult::new(
        "Manifest",
        CheckStatus::Ok,
        format!("{} ({} dependencies)", manifest.package.name, dependencies.len()),
    )];

    let lock = match Lockfile::load(&dir) {
        Ok(lockfile) => {
            let issues = drift_issues(&dependencies, &lockfile.packages);
            if issues.is_empty() {
                CheckResult::new("Lock file", CheckStatus::Ok, "matches yuki.toml")
            } else {
                CheckResult::new("Lock file", CheckStatus::Warning, "out of date")
                    .with_details(format!("{}\nRun 'yuki install'.", issues.join("\n")))
            }
        }
        Err(e) => CheckResult::new("Lock file", CheckStatus::Error, "unreadable")
            .with_details(e.to_string()),
    };
    results.push(lock);

    Some(results)
}

pub fn run() -> Result<()> {
    println!("Yuki Doctor");
    println!("===========");
    println!();

    let mut results = vec![check_git()];

    match Config::load() {
        Ok(config) => {
            results.push(CheckResult::new("Configuration", CheckStatus::Ok, "loaded"));
            results.push(check_auth(&config));
            results.push(check_cache(&config));
            results.push(check_github(&config));
        }
        Err(e) => results.push(
            CheckResult::new("Configuration", CheckStatus::Error, "invalid")
                .with_details(e.to_string()),
        ),
    }

    if let Some(project) = check_project() {
        results.extend(project);
    }

    for result in &results {
        result.print();
    }

    let warn_count = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Warning))
        .count();
    let error_count = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Error))
        .count();

    println!();
    println!(
        "Summary: {} passed, {} warnings, {} errors",
        results.len() - warn_count - error_count,
        warn_count,
        error_count
    );

    if error_count > 0 {
        bail!("{} check(s) failed", error_count);
    }
    if warn_count == 0 {
        println!("All checks passed! Your setup looks good.");
    }
    Ok(())
}
