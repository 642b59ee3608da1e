use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid repository locator: {0}\n\n\
             Hint: use one of the supported forms:\n\
             - owner/repo\n\
             - https://github.com/owner/repo(.git)\n\
             - git@github.com:owner/repo.git")]
    InvalidLocator(String),

    #[error("Invalid semantic version: {0}")]
    InvalidVersion(String),

    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No version satisfies constraint '{constraint}'\n\n\
             Available versions:\n  {}",
             format_candidates(.candidates))]
    NoMatchingVersion {
        constraint: String,
        candidates: Vec<String>,
    },

    #[error("No matching tag found for version {version} (tried: {})", .tried.join(", "))]
    NoMatchingTag { version: String, tried: Vec<String> },

    #[error("No releases found for {owner}/{repo}")]
    ReleaseNotFound { owner: String, repo: String },

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Failed to retrieve '{reference}': {message}")]
    RetrievalFailure { reference: String, message: String },

    #[error("Checksum mismatch for {}\nExpected: {expected}\nComputed: {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Dependencies are not synchronized:\n  - {}\n\n\
             Hint: run 'yuki install' to bring the lock file up to date.",
             .0.join("\n  - "))]
    DriftDetected(Vec<String>),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Dependency '{name}': {source}")]
    Dependency {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "(none)".to_string()
    } else {
        candidates.join("\n  ")
    }
}

impl Error {
    /// Attach the name of the dependency being processed
    pub fn for_dependency(name: impl Into<String>, source: Error) -> Self {
        Error::Dependency {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// True when the remote simply has no (usable) release
    pub fn is_release_not_found(&self) -> bool {
        match self {
            Error::ReleaseNotFound { .. } => true,
            Error::Dependency { source, .. } => source.is_release_not_found(),
            _ => false,
        }
    }

    pub fn retrieval(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RetrievalFailure {
            reference: reference.into(),
            message: message.into(),
        }
    }
}
