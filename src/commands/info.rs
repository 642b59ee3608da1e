use anyhow::Result;
use tracing::debug;
use yuki::{parse_locator, Config, GitHubClient, RepositoryMetadata};

const RECENT_RELEASES: usize = 5;

pub fn run(locator: String) -> Result<()> {
    let (owner, repo) = parse_locator(&locator)?;
    let config = Config::load()?;
    let client = GitHubClient::from_config(&config)?;

    let info = client.repository(&owner, &repo)?;

    println!("{}", info.full_name);
    if let Some(description) = &info.description {
        println!("  {}", description);
    }
    println!();
    if let Some(url) = &info.html_url {
        println!("  Homepage:       {}", url);
    }
    if let Some(branch) = &info.default_branch {
        println!("  Default branch: {}", branch);
    }
    println!("  Stars:          {}", info.stargazers_count);
    if let Some(updated) = &info.updated_at {
        println!("  Updated:        {}", updated);
    }

    let releases = match client.releases(&owner, &repo, RECENT_RELEASES) {
        Ok(releases) => releases,
        Err(e) => {
            debug!("Could not list releases of {}/{}: {}", owner, repo, e);
            Vec::new()
        }
    };

    println!();
    if releases.is_empty() {
        println!("No releases published");
    } else {
        println!("Recent releases:");
        for release in &releases {
            let marker = if release.draft {
                " (draft)"
            } else if release.prerelease {
                " (prerelease)"
            } else {
                ""
            };
            match &release.name {
                Some(name) if !name.is_empty() && *name != release.tag_name => {
                    println!("  {} - {}{}", release.tag_name, name, marker)
                }
                _ => println!("  {}{}", release.tag_name, marker),
            }
        }
    }

    Ok(())
}
