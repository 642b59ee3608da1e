//! Semantic versions and version constraints
//!
//! Versions follow `[v]MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`. Build metadata is
//! kept for display but never takes part in ordering.
//!
//! Constraint operators:
//!
//! - `^1.2.3` - same major version, at least `1.2.3`
//! - `~1.2.3` - same major and minor version, at least `1.2.3`
//! - `>=`, `<=`, `>`, `<`, `=` - direct comparison
//! - bare `1.2.3` - exact match
//!
//! Note that `^` keeps the major version fixed even for `0.x` releases.
//!
//! # Examples
//!
//! ```
//! use yuki::version::{best_match, Constraint, Version};
//!
//! let constraint = Constraint::parse("^1.0.0").unwrap();
//! let candidates: Vec<Version> = ["1.0.0", "1.2.5", "2.0.0"]
//!     .iter()
//!     .map(|v| Version::parse(v).unwrap())
//!     .collect();
//!
//! let best = best_match(&constraint, &candidates).unwrap();
//! assert_eq!(best.to_string(), "1.2.5");
//! ```

use crate::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^v?(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z\-\.]+))?(?:\+([0-9A-Za-z\-\.]+))?$",
        )
        .expect("version pattern is valid")
    })
}

/// An immutable semantic version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version, ignoring a leading `v`
    pub fn parse(text: &str) -> Result<Self> {
        let caps = version_regex()
            .captures(text)
            .ok_or_else(|| Error::InvalidVersion(text.to_string()))?;

        let number = |idx: usize| -> Result<u64> {
            caps[idx]
                .parse::<u64>()
                .map_err(|_| Error::InvalidVersion(text.to_string()))
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Precedence comparison; build metadata is ignored
    ///
    /// With equal numbers, a release outranks any prerelease, and two prereleases
    /// compare as plain strings.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Constraint operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Caret,
    Tilde,
    GreaterEq,
    LessEq,
    Greater,
    Less,
    Exact,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Caret => "^",
            Op::Tilde => "~",
            Op::GreaterEq => ">=",
            Op::LessEq => "<=",
            Op::Greater => ">",
            Op::Less => "<",
            Op::Exact => "=",
        }
    }
}

/// An operator paired with a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: Op,
    pub version: Version,
}

impl Constraint {
    /// Parse a constraint such as `^1.2.3`, `>=2.0.0` or a bare `1.0.0`
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();

        // Two-character operators must be tried before their one-character prefixes.
        let (op, rest) = if let Some(rest) = trimmed.strip_prefix(">=") {
            (Op::GreaterEq, rest)
        } else if let Some(rest) = trimmed.strip_prefix("<=") {
            (Op::LessEq, rest)
        } else if let Some(rest) = trimmed.strip_prefix('^') {
            (Op::Caret, rest)
        } else if let Some(rest) = trimmed.strip_prefix('~') {
            (Op::Tilde, rest)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            (Op::Greater, rest)
        } else if let Some(rest) = trimmed.strip_prefix('<') {
            (Op::Less, rest)
        } else if let Some(rest) = trimmed.strip_prefix('=') {
            (Op::Exact, rest)
        } else {
            (Op::Exact, trimmed)
        };

        let version = Version::parse(rest).map_err(|_| Error::InvalidConstraint {
            constraint: text.to_string(),
            reason: format!("'{}' is not a semantic version", rest),
        })?;

        Ok(Self { op, version })
    }

    pub fn satisfies(&self, version: &Version) -> bool {
        let ord = version.compare(&self.version);
        match self.op {
            Op::Caret => version.major == self.version.major && ord != Ordering::Less,
            Op::Tilde => {
                version.major == self.version.major
                    && version.minor == self.version.minor
                    && ord != Ordering::Less
            }
            Op::GreaterEq => ord != Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
            Op::Greater => ord == Ordering::Greater,
            Op::Less => ord == Ordering::Less,
            Op::Exact => ord == Ordering::Equal,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// Highest candidate satisfying the constraint
pub fn best_match<'a>(constraint: &Constraint, candidates: &'a [Version]) -> Result<&'a Version> {
    candidates
        .iter()
        .filter(|v| constraint.satisfies(v))
        .max_by(|a, b| a.compare(b))
        .ok_or_else(|| Error::NoMatchingVersion {
            constraint: constraint.to_string(),
            candidates: candidates.iter().map(|v| v.to_string()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    fn c(text: &str) -> Constraint {
        Constraint::parse(text).unwrap()
    }

    #[test]
    fn test_parse_full_version() {
        let version = v("v1.2.3-beta.1+build.5");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert_eq!(version.prerelease.as_deref(), Some("beta.1"));
        assert_eq!(version.build.as_deref(), Some("build.5"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["1.2", "1.2.3.4", "x1.2.3", "1.2.3-", "", "1.a.3", "V1.2.3"] {
            assert!(
                matches!(Version::parse(text), Err(Error::InvalidVersion(_))),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["0.0.1", "1.2.3", "10.20.30-rc.1", "v4.5.6"] {
            let parsed = v(text);
            assert_eq!(v(&parsed.to_string()), parsed);
        }
        assert_eq!(v("v4.5.6").to_string(), "4.5.6");
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let versions = [
            "1.0.0",
            "1.0.0-alpha",
            "1.0.0-beta",
            "1.0.1",
            "1.1.0",
            "2.0.0",
            "0.9.9",
        ];
        for a in versions {
            assert_eq!(v(a).compare(&v(a)), Ordering::Equal);
            for b in versions {
                assert_eq!(v(a).compare(&v(b)), v(b).compare(&v(a)).reverse());
            }
        }
    }

    #[test]
    fn test_release_outranks_prerelease() {
        assert_eq!(v("1.0.0").compare(&v("1.0.0-rc.1")), Ordering::Greater);
        assert_eq!(v("1.0.0-alpha").compare(&v("1.0.0-beta")), Ordering::Less);
    }

    #[test]
    fn test_build_metadata_ignored_in_ordering() {
        assert_eq!(v("1.0.0+a").compare(&v("1.0.0+b")), Ordering::Equal);
    }

    #[test]
    fn test_caret() {
        let caret = c("^1.2.3");
        assert!(caret.satisfies(&v("1.2.3")));
        assert!(caret.satisfies(&v("1.9.0")));
        assert!(!caret.satisfies(&v("2.0.0")));
        assert!(!caret.satisfies(&v("1.2.2")));
    }

    #[test]
    fn test_caret_zero_major_keeps_major_only() {
        let caret = c("^0.2.0");
        assert!(caret.satisfies(&v("0.5.0")));
        assert!(!caret.satisfies(&v("1.0.0")));
    }

    #[test]
    fn test_tilde() {
        let tilde = c("~1.2.3");
        assert!(tilde.satisfies(&v("1.2.9")));
        assert!(!tilde.satisfies(&v("1.3.0")));
        assert!(!tilde.satisfies(&v("1.2.2")));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(c(">=1.0.0").satisfies(&v("1.0.0")));
        assert!(c(">1.0.0").satisfies(&v("1.0.1")));
        assert!(!c(">1.0.0").satisfies(&v("1.0.0")));
        assert!(c("<=1.0.0").satisfies(&v("1.0.0")));
        assert!(c("<1.0.0").satisfies(&v("0.9.0")));
        assert!(!c("<1.0.0").satisfies(&v("1.0.0")));
        assert!(c("=1.0.0").satisfies(&v("1.0.0")));
        assert!(c("1.0.0").satisfies(&v("v1.0.0")));
        assert!(!c("1.0.0").satisfies(&v("1.0.1")));
    }

    #[test]
    fn test_constraint_parse_errors() {
        assert!(matches!(
            Constraint::parse("^banana"),
            Err(Error::InvalidConstraint { .. })
        ));
        assert!(matches!(
            Constraint::parse("latest"),
            Err(Error::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_constraint_display() {
        assert_eq!(c(" >=1.2.3 ").to_string(), ">=1.2.3");
        assert_eq!(c("1.2.3").to_string(), "=1.2.3");
    }

    #[test]
    fn test_best_match() {
        let candidates: Vec<Version> = ["1.0.0", "1.2.0", "1.2.5", "2.0.0"]
            .iter()
            .map(|s| v(s))
            .collect();
        let best = best_match(&c("^1.0.0"), &candidates).unwrap();
        assert_eq!(best, &v("1.2.5"));
    }

    #[test]
    fn test_best_match_no_candidates() {
        let candidates = vec![v("1.0.0")];
        match best_match(&c("^2.0.0"), &candidates) {
            Err(Error::NoMatchingVersion {
                constraint,
                candidates,
            }) => {
                assert_eq!(constraint, "^2.0.0");
                assert_eq!(candidates, vec!["1.0.0".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
