//! Version-control retrieval
//!
//! [`Vcs`] is the subprocess boundary: each operation reports success plus the
//! captured diagnostic text, and only a failure to start the client at all is an
//! `io::Error`. [`RetrievalStrategy`] turns those primitives into a checkout of
//! one reference.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Outcome of one VCS invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsOutput {
    pub success: bool,
    /// Combined stdout and stderr
    pub diagnostics: String,
}

impl VcsOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            diagnostics: String::new(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

pub trait Vcs {
    /// Clone only `reference` (branch or tag), without history
    fn clone_shallow(&self, url: &str, reference: &str, dest: &Path) -> io::Result<VcsOutput>;

    fn clone_full(&self, url: &str, dest: &Path) -> io::Result<VcsOutput>;

    /// Check out `reference` in an existing working copy
    fn checkout(&self, workdir: &Path, reference: &str) -> io::Result<VcsOutput>;
}

impl<T: Vcs + ?Sized> Vcs for &T {
    fn clone_shallow(&self, url: &str, reference: &str, dest: &Path) -> io::Result<VcsOutput> {
        (**self).clone_shallow(url, reference, dest)
    }

    fn clone_full(&self, url: &str, dest: &Path) -> io::Result<VcsOutput> {
        (**self).clone_full(url, dest)
    }

    fn checkout(&self, workdir: &Path, reference: &str) -> io::Result<VcsOutput> {
        (**self).checkout(workdir, reference)
    }
}

/// The `git` executable on PATH
#[derive(Debug, Clone, Default)]
pub struct SystemGit;

impl SystemGit {
    fn run(command: &mut Command) -> io::Result<VcsOutput> {
        debug!("Running {:?}", command);
        let output = command.output()?;

        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(VcsOutput {
            success: output.status.success(),
            diagnostics,
        })
    }
}

impl Vcs for SystemGit {
    fn clone_shallow(&self, url: &str, reference: &str, dest: &Path) -> io::Result<VcsOutput> {
        Self::run(
            Command::new("git")
                .args(["clone", "--depth=1", "--branch", reference, url])
                .arg(dest),
        )
    }

    fn clone_full(&self, url: &str, dest: &Path) -> io::Result<VcsOutput> {
        Self::run(Command::new("git").args(["clone", url]).arg(dest))
    }

    fn checkout(&self, workdir: &Path, reference: &str) -> io::Result<VcsOutput> {
        Self::run(
            Command::new("git")
                .arg("-C")
                .arg(workdir)
                .args(["checkout", reference]),
        )
    }
}

/// Check that the `git` executable can be started
pub fn check_git_available() -> Result<String> {
    let output = Command::new("git").arg("--version").output().map_err(|e| {
        Error::Other(format!(
            "git is not available: {}\n\nHint: install git and make sure it is on PATH.",
            e
        ))
    })?;

    if !output.status.success() {
        return Err(Error::Other("`git --version` failed".to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether clone output says the requested reference is unknown to the remote
///
/// Some servers refuse a `--branch` lookup for refs they would happily check out
/// from a full clone, so this is the signal to retry without `--depth`.
pub fn is_missing_reference(diagnostics: &str) -> bool {
    diagnostics.contains("does not exist") || diagnostics.contains("not found")
}

/// True for a full 40-character hexadecimal commit id
pub fn is_commit_id(reference: &str) -> bool {
    reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// How one reference is brought into a working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// Shallow clone; full clone plus checkout when the reference is reported missing
    ShallowWithFallback,
    /// Full clone followed by checkout
    ExplicitCheckout,
}

/// Strategy suited to a reference: commit ids cannot be fetched with `--branch`
pub fn strategy_for(reference: &str) -> RetrievalStrategy {
    if is_commit_id(reference) {
        RetrievalStrategy::ExplicitCheckout
    } else {
        RetrievalStrategy::ShallowWithFallback
    }
}

fn spawn_error(reference: &str, e: io::Error) -> Error {
    Error::retrieval(reference, format!("could not run version control client: {}", e))
}

impl RetrievalStrategy {
    /// Populate `dest` with the tree at `reference`
    ///
    /// `dest` must not exist yet; its parent must.
    pub fn retrieve(&self, vcs: &dyn Vcs, url: &str, reference: &str, dest: &Path) -> Result<()> {
        match self {
            RetrievalStrategy::ExplicitCheckout => full_clone_and_checkout(vcs, url, reference, dest),
            RetrievalStrategy::ShallowWithFallback => {
                let output = vcs
                    .clone_shallow(url, reference, dest)
                    .map_err(|e| spawn_error(reference, e))?;
                if output.success {
                    return Ok(());
                }

                if !is_missing_reference(&output.diagnostics) {
                    return Err(Error::retrieval(
                        reference,
                        format!("clone failed\n{}", output.diagnostics.trim_end()),
                    ));
                }

                debug!(
                    "Shallow clone of {} could not find '{}', retrying with a full clone: {}",
                    url,
                    reference,
                    output.diagnostics.trim_end()
                );
                if dest.exists() {
                    fs::remove_dir_all(dest)?;
                }
                full_clone_and_checkout(vcs, url, reference, dest)
            }
        }
    }
}

fn full_clone_and_checkout(vcs: &dyn Vcs, url: &str, reference: &str, dest: &Path) -> Result<()> {
    let output = vcs.clone_full(url, dest).map_err(|e| spawn_error(reference, e))?;
    if !output.success {
        return Err(Error::retrieval(
            reference,
            format!("clone failed\n{}", output.diagnostics.trim_end()),
        ));
    }

    let output = vcs
        .checkout(dest, reference)
        .map_err(|e| spawn_error(reference, e))?;
    if !output.success {
        warn!("git checkout of '{}' failed in {}", reference, dest.display());
        return Err(Error::retrieval(
            reference,
            format!("checkout failed\n{}", output.diagnostics.trim_end()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Replays canned outputs and records the calls made
    struct Scripted {
        shallow: VcsOutput,
        full: VcsOutput,
        checkout: VcsOutput,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(shallow: VcsOutput, full: VcsOutput, checkout: VcsOutput) -> Self {
            Self {
                shallow,
                full,
                checkout,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Vcs for Scripted {
        fn clone_shallow(&self, _url: &str, reference: &str, dest: &Path) -> io::Result<VcsOutput> {
            self.calls.borrow_mut().push(format!("shallow {}", reference));
            // Failed shallow clones may leave a partial directory behind.
            fs::create_dir_all(dest)?;
            Ok(self.shallow.clone())
        }

        fn clone_full(&self, _url: &str, dest: &Path) -> io::Result<VcsOutput> {
            self.calls.borrow_mut().push("full".to_string());
            assert!(!dest.exists(), "full clone must start from a clean directory");
            fs::create_dir_all(dest)?;
            Ok(self.full.clone())
        }

        fn checkout(&self, _workdir: &Path, reference: &str) -> io::Result<VcsOutput> {
            self.calls.borrow_mut().push(format!("checkout {}", reference));
            Ok(self.checkout.clone())
        }
    }

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_missing_reference_heuristic() {
        assert!(is_missing_reference(
            "warning: Could not find remote branch 1.5.0 to clone.\nfatal: Remote branch 1.5.0 not found in upstream origin"
        ));
        assert!(is_missing_reference("error: pathspec 'x' does not exist"));
        assert!(!is_missing_reference("fatal: unable to access: Could not resolve host"));
    }

    #[test]
    fn test_strategy_for_commit_ids() {
        assert_eq!(strategy_for(SHA), RetrievalStrategy::ExplicitCheckout);
        assert_eq!(strategy_for("v1.0.0"), RetrievalStrategy::ShallowWithFallback);
        assert_eq!(strategy_for(&SHA[..39]), RetrievalStrategy::ShallowWithFallback);
        assert_eq!(
            strategy_for(&"g".repeat(40)),
            RetrievalStrategy::ShallowWithFallback
        );
    }

    #[test]
    fn test_shallow_success_stops_there() {
        let temp = TempDir::new().unwrap();
        let vcs = Scripted::new(VcsOutput::ok(), VcsOutput::ok(), VcsOutput::ok());

        RetrievalStrategy::ShallowWithFallback
            .retrieve(&vcs, "url", "v1.0.0", &temp.path().join("dest"))
            .unwrap();
        assert_eq!(vcs.calls(), vec!["shallow v1.0.0"]);
    }

    #[test]
    fn test_shallow_missing_reference_falls_back() {
        let temp = TempDir::new().unwrap();
        let vcs = Scripted::new(
            VcsOutput::failed("fatal: Remote branch 1.5.0 not found in upstream origin"),
            VcsOutput::ok(),
            VcsOutput::ok(),
        );

        RetrievalStrategy::ShallowWithFallback
            .retrieve(&vcs, "url", "1.5.0", &temp.path().join("dest"))
            .unwrap();
        assert_eq!(vcs.calls(), vec!["shallow 1.5.0", "full", "checkout 1.5.0"]);
    }

    #[test]
    fn test_shallow_other_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let vcs = Scripted::new(
            VcsOutput::failed("fatal: unable to access: Could not resolve host"),
            VcsOutput::ok(),
            VcsOutput::ok(),
        );

        let err = RetrievalStrategy::ShallowWithFallback
            .retrieve(&vcs, "url", "1.5.0", &temp.path().join("dest"))
            .unwrap_err();
        assert!(matches!(err, Error::RetrievalFailure { .. }));
        assert!(err.to_string().contains("Could not resolve host"));
        assert_eq!(vcs.calls(), vec!["shallow 1.5.0"]);
    }

    #[test]
    fn test_fallback_checkout_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let vcs = Scripted::new(
            VcsOutput::failed("Remote branch nope not found"),
            VcsOutput::ok(),
            VcsOutput::failed("error: pathspec 'nope' did not match"),
        );

        let err = RetrievalStrategy::ShallowWithFallback
            .retrieve(&vcs, "url", "nope", &temp.path().join("dest"))
            .unwrap_err();
        assert!(err.to_string().contains("checkout failed"));
    }

    #[test]
    fn test_explicit_checkout_skips_shallow() {
        let temp = TempDir::new().unwrap();
        let vcs = Scripted::new(VcsOutput::ok(), VcsOutput::ok(), VcsOutput::ok());

        RetrievalStrategy::ExplicitCheckout
            .retrieve(&vcs, "url", SHA, &temp.path().join("dest"))
            .unwrap();
        assert_eq!(vcs.calls(), vec!["full".to_string(), format!("checkout {}", SHA)]);
    }
}
