//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.yuki/config.toml`. Nothing in the
//! library reads it implicitly: callers load a [`Config`] and hand it to
//! [`crate::Fetcher::from_config`] or [`crate::ConsistencyChecker::from_config`].
//!
//! # Examples
//!
//! ```no_run
//! use yuki::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("Cache root: {}", config.cache_dir().display());
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "YUKI_CONFIG_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache root; `~` is expanded
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

fn default_cache_dir() -> String {
    "~/.yuki/cache".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL repositories are cloned from
    #[serde(default = "default_clone_url")]
    pub clone_url: String,

    /// API token (GITHUB_TOKEN / GH_TOKEN take precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_clone_url() -> String {
    "https://github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            clone_url: default_clone_url(),
            token: None,
        }
    }
}

/// How a concrete version constraint (`^1.2.0`) is turned into a tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintMatching {
    /// Highest tag satisfying the constraint
    #[default]
    BestMatch,
    /// Look up the literal `X.Y.Z` / `vX.Y.Z` tags named by the constraint
    LiteralTag,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub constraint_matching: ConstraintMatching,
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses YUKI_CONFIG_DIR if set, otherwise ~/.yuki/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".yuki").join("config.toml"))
    }

    /// Load config from the default location
    ///
    /// Environment variable overrides:
    /// - `GITHUB_TOKEN` / `GH_TOKEN`: override `github.token`
    /// - `YUKI_CONFIG_DIR`: overrides the config directory location
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Self::default_path()?)?;

        for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
            if let Ok(token) = std::env::var(var) {
                if !token.is_empty() {
                    config.github.token = Some(token);
                    break;
                }
            }
        }

        Ok(config)
    }

    /// Load config from a specific file, defaulting when it does not exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Cache root with `~` expanded
    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache.dir).into_owned())
    }

    /// Config rooted at an explicit cache directory
    pub fn with_cache_dir<P: AsRef<Path>>(dir: P) -> Self {
        let mut config = Self::default();
        config.cache.dir = dir.as_ref().to_string_lossy().into_owned();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.dir, "~/.yuki/cache");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.clone_url, "https://github.com");
        assert_eq!(
            config.resolver.constraint_matching,
            ConstraintMatching::BestMatch
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[resolver]
constraint_matching = "literal-tag"
"#,
        )
        .unwrap();
        assert_eq!(
            config.resolver.constraint_matching,
            ConstraintMatching::LiteralTag
        );
        assert_eq!(config.cache.dir, "~/.yuki/cache");
    }

    #[test]
    fn test_cache_dir_expands_tilde() {
        let config = Config::default();
        assert!(!config.cache_dir().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_save_and_load_from() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::with_cache_dir(temp.path().join("cache"));
        config.github.api_url = "http://127.0.0.1:9".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.github.api_url, "http://127.0.0.1:9");
        assert_eq!(loaded.cache_dir(), temp.path().join("cache"));
    }

    #[test]
    fn test_load_from_missing_is_default() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(temp.path().join("absent.toml")).unwrap();
        assert!(config.github.token.is_none());
    }
}
