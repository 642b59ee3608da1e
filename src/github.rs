//! Repository metadata from GitHub
//!
//! [`RepositoryMetadata`] is the capability the resolver needs from a remote;
//! [`GitHubClient`] implements it against the GitHub REST API.

use crate::{Config, Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

/// A published release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Core API quota as reported by `/rate_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimit,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

/// Remote repository queries used during resolution
pub trait RepositoryMetadata {
    /// Newest release; `Error::ReleaseNotFound` when there is none
    fn latest_release(&self, owner: &str, repo: &str) -> Result<Release>;

    /// Tag names, in no particular order
    fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>>;

    fn tag_exists(&self, owner: &str, repo: &str, tag: &str) -> Result<bool>;

    /// Commit id at the tip of the default branch (`main`, else `master`)
    fn default_branch_tip(&self, owner: &str, repo: &str) -> Result<String>;

    /// Repository details; `Error::RepositoryNotFound` when unreachable
    fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo>;
}

impl<T: RepositoryMetadata + ?Sized> RepositoryMetadata for &T {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        (**self).latest_release(owner, repo)
    }

    fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        (**self).tags(owner, repo)
    }

    fn tag_exists(&self, owner: &str, repo: &str, tag: &str) -> Result<bool> {
        (**self).tag_exists(owner, repo, tag)
    }

    fn default_branch_tip(&self, owner: &str, repo: &str) -> Result<String> {
        (**self).default_branch_tip(owner, repo)
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo> {
        (**self).repository(owner, repo)
    }
}

/// Default branch names tried, in order
pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

const USER_AGENT: &str = "yuki-package-manager";

/// Page size for list endpoints (the API maximum)
const PAGE_SIZE: usize = 100;

pub struct GitHubClient {
    api_url: String,
    client: reqwest::blocking::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.github.api_url.clone(), config.github.token.clone())
    }

    fn get(&self, path: &str) -> Result<reqwest::blocking::Response> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        request.send().map_err(|e| {
            if e.is_connect() {
                Error::Remote(format!(
                    "Cannot connect to {}\n\
                     Please check your network connection and the configured API URL.",
                    self.api_url
                ))
            } else if e.is_timeout() {
                Error::Remote(format!("Request to {} timed out", url))
            } else {
                Error::Http(e)
            }
        })
    }

    fn status_error(status: reqwest::StatusCode, what: &str) -> Error {
        let msg = match status.as_u16() {
            401 => format!("{}: authentication failed (HTTP 401); check your GitHub token", what),
            403 | 429 => format!(
                "{}: GitHub API rate limit or permission error (HTTP {}).\n\
                 Set GITHUB_TOKEN to raise the rate limit.",
                what,
                status.as_u16()
            ),
            500 | 502 | 503 | 504 => format!(
                "{}: GitHub server error (HTTP {}). Please try again later.",
                what,
                status.as_u16()
            ),
            code => format!("{}: GitHub API error (HTTP {})", what, code),
        };
        Error::Remote(msg)
    }

    /// Most recent releases, newest first, drafts and prereleases included
    pub fn releases(&self, owner: &str, repo: &str, limit: usize) -> Result<Vec<Release>> {
        let response = self.get(&format!(
            "/repos/{}/{}/releases?per_page={}",
            owner,
            repo,
            limit.clamp(1, PAGE_SIZE)
        ))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::RepositoryNotFound(format!("{}/{}", owner, repo)));
        }
        if !status.is_success() {
            return Err(Self::status_error(status, "Failed to fetch releases"));
        }

        let mut releases: Vec<Release> = response.json()?;
        releases.truncate(limit);
        Ok(releases)
    }

    /// Remaining core API quota; does not count against it
    pub fn rate_limit(&self) -> Result<RateLimit> {
        let response = self.get("/rate_limit")?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, "Failed to query rate limit"));
        }

        let body: RateLimitResponse = response.json()?;
        Ok(body.resources.core)
    }
}

impl RepositoryMetadata for GitHubClient {
    fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let response = self.get(&format!("/repos/{}/{}/releases/latest", owner, repo))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ReleaseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Self::status_error(status, "Failed to fetch latest release"));
        }

        Ok(response.json()?)
    }

    fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page = 1;

        loop {
            let response = self.get(&format!(
                "/repos/{}/{}/tags?per_page={}&page={}",
                owner, repo, PAGE_SIZE, page
            ))?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::RepositoryNotFound(format!("{}/{}", owner, repo)));
            }
            if !status.is_success() {
                return Err(Self::status_error(status, "Failed to fetch tags"));
            }

            let tags: Vec<ApiTag> = response.json()?;
            let count = tags.len();
            names.extend(tags.into_iter().map(|t| t.name));

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!("{}/{} has {} tags", owner, repo, names.len());
        Ok(names)
    }

    fn tag_exists(&self, owner: &str, repo: &str, tag: &str) -> Result<bool> {
        let response = self.get(&format!(
            "/repos/{}/{}/git/ref/tags/{}",
            owner,
            repo,
            urlencoding::encode(tag)
        ))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Self::status_error(status, "Failed to look up tag"));
        }
        Ok(true)
    }

    fn default_branch_tip(&self, owner: &str, repo: &str) -> Result<String> {
        for branch in DEFAULT_BRANCHES {
            let response = self.get(&format!("/repos/{}/{}/commits/{}", owner, repo, branch))?;
            let status = response.status();

            // GitHub answers 422 for an unknown ref on this endpoint.
            if status == reqwest::StatusCode::NOT_FOUND
                || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
            {
                debug!("{}/{} has no '{}' branch", owner, repo, branch);
                continue;
            }
            if !status.is_success() {
                return Err(Self::status_error(status, "Failed to fetch latest commit"));
            }

            let commit: ApiCommit = response.json()?;
            return Ok(commit.sha);
        }

        Err(Error::Remote(format!(
            "No commit found on {} for {}/{}",
            DEFAULT_BRANCHES.join(" or "),
            owner,
            repo
        )))
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo> {
        let response = self.get(&format!("/repos/{}/{}", owner, repo))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::RepositoryNotFound(format!("{}/{}", owner, repo)));
        }
        if !status.is_success() {
            return Err(Self::status_error(status, "Failed to fetch repository"));
        }

        Ok(response.json()?)
    }
}

fn ssh_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^git@github\.com:([^/]+)/(.+?)(?:\.git)?$").expect("ssh pattern is valid")
    })
}

fn checked(owner: &str, repo: &str, text: &str) -> Result<(String, String)> {
    let valid = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace) && !s.contains('/');
    if valid(owner) && valid(repo) {
        Ok((owner.to_string(), repo.to_string()))
    } else {
        Err(Error::InvalidLocator(text.to_string()))
    }
}

/// Split a repository locator into `(owner, repo)`
///
/// Accepted forms: `owner/repo`, `https://github.com/owner/repo[.git]` and
/// `git@github.com:owner/repo[.git]`.
pub fn parse_locator(text: &str) -> Result<(String, String)> {
    let text = text.trim();
    let invalid = || Error::InvalidLocator(text.to_string());

    if !text.contains('/') {
        return Err(invalid());
    }

    if !text.contains("://") && !text.contains('@') {
        let mut parts = text.split('/');
        return match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) => checked(owner, repo, text),
            _ => Err(invalid()),
        };
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        let url = url::Url::parse(text).map_err(|_| invalid())?;
        if url.host_str() != Some("github.com") {
            return Err(Error::InvalidLocator(format!(
                "{} (only github.com repositories are supported)",
                text
            )));
        }

        let mut segments = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|s| !s.is_empty());
        let owner = segments.next().ok_or_else(invalid)?;
        let repo = segments.next().ok_or_else(invalid)?;
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        return checked(owner, repo, text);
    }

    if let Some(caps) = ssh_regex().captures(text) {
        return checked(&caps[1], &caps[2], text);
    }

    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> (String, String) {
        parse_locator(text).unwrap()
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!(parsed("zigzap/zap"), ("zigzap".into(), "zap".into()));
    }

    #[test]
    fn test_parse_https_forms() {
        let expected = ("Hejsil".to_string(), "zig-clap".to_string());
        assert_eq!(parsed("https://github.com/Hejsil/zig-clap"), expected);
        assert_eq!(parsed("https://github.com/Hejsil/zig-clap.git"), expected);
        assert_eq!(parsed("https://github.com/Hejsil/zig-clap/"), expected);
        assert_eq!(
            parsed("https://github.com/Hejsil/zig-clap/tree/master"),
            expected
        );
    }

    #[test]
    fn test_parse_ssh_form() {
        assert_eq!(
            parsed("git@github.com:acme/widgets.git"),
            ("acme".into(), "widgets".into())
        );
        assert_eq!(
            parsed("git@github.com:acme/widgets"),
            ("acme".into(), "widgets".into())
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "justaname",
            "a/b/c",
            "/repo",
            "owner/",
            "https://gitlab.com/a/b",
            "https://github.com/onlyowner",
            "git@gitlab.com:a/b.git",
            "ftp://github.com/a/b",
        ] {
            assert!(
                matches!(parse_locator(text), Err(Error::InvalidLocator(_))),
                "{:?} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GitHubClient::new("http://localhost:1234/", None).unwrap();
        assert_eq!(client.api_url, "http://localhost:1234");
    }

    #[test]
    fn test_release_deserialization_defaults() {
        let release: Release = serde_json::from_str(r#"{"tag_name": "v1.0.0"}"#).unwrap();
        assert_eq!(release.tag_name, "v1.0.0");
        assert!(!release.draft);
        assert!(!release.prerelease);
    }
}
