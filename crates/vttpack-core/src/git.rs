use crate::CoreError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use vttpack_schema::Version;

static TAG_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs/tags/(\S+)").expect("invalid regex"));

static TRACKED_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\* \S+ +[0-9a-fA-F]+ \[([^/\]]+)/").expect("invalid regex")
});

/// Thin wrapper over the `git` binary, run inside one working tree.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn output(&self, args: &[&str]) -> Result<Output, CoreError> {
        debug!("git {}", args.join(" "));
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CoreError::Git {
                command: args.join(" "),
                stderr: e.to_string(),
            })
    }

    /// Run `git` and return stdout, failing on a non-zero exit.
    fn run(&self, args: &[&str]) -> Result<String, CoreError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(CoreError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run `git`, logging instead of failing.
    fn run_ignored(&self, args: &[&str]) {
        match self.output(args) {
            Ok(output) if output.status.success() => {}
            Ok(output) => debug!(
                "ignoring failed git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => debug!("ignoring {e}"),
        }
    }

    /// Highest version-like tag, or `v0.0.0` when there is none.
    pub fn latest_version_tag(&self) -> Result<Version, CoreError> {
        // show-ref exits 1 when the repository has no tags at all.
        let output = self.output(&["show-ref", "--tags"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let latest = parse_version_tags(&stdout)
            .into_iter()
            .max()
            .unwrap_or_default();
        debug!("latest version tag: {latest}");
        Ok(latest)
    }

    pub fn ensure_clean(&self) -> Result<(), CoreError> {
        let status = self.run(&["status", "--porcelain"])?;
        if status.trim().is_empty() {
            Ok(())
        } else {
            Err(CoreError::DirtyWorkingTree)
        }
    }

    pub fn commit_version(&self, version: &Version) -> Result<(), CoreError> {
        self.run(&["add", "."])?;
        self.run(&["commit", "-m", &format!("Updated to {version}")])?;
        info!("committed {version}");
        Ok(())
    }

    /// Delete `version`'s tag locally and on `origin`. Either may not exist.
    pub fn delete_tag(&self, version: &Version) {
        let tag = version.to_string();
        self.run_ignored(&["tag", "-d", &tag]);
        self.run_ignored(&["push", "--delete", "origin", &tag]);
    }

    /// Create an annotated tag for `version` and push it to `origin`.
    pub fn tag_version(&self, version: &Version) -> Result<(), CoreError> {
        let tag = version.to_string();
        self.run(&["tag", "-a", &tag, "-m", &format!("Updated to {tag}")])?;
        self.run(&["push", "origin", &tag])?;
        info!("tagged and pushed {tag}");
        Ok(())
    }

    pub fn push(&self) -> Result<(), CoreError> {
        self.run(&["push"])?;
        Ok(())
    }

    pub fn remotes(&self) -> Result<Vec<String>, CoreError> {
        let out = self.run(&["remote"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Remote tracked by the current branch, if any.
    pub fn tracked_remote(&self) -> Result<Option<String>, CoreError> {
        let out = self.run(&["branch", "-vv", "--no-color"])?;
        Ok(parse_tracked_remote(&out))
    }

    pub fn push_url(&self, remote: &str) -> Result<String, CoreError> {
        let out = self.run(&["remote", "get-url", "--push", remote])?;
        Ok(out.trim().to_owned())
    }

    /// The remote releases are pushed to: the only remote, or the one the
    /// current branch tracks.
    pub fn release_remote(&self) -> Result<Option<String>, CoreError> {
        let mut remotes = self.remotes()?;
        if remotes.len() == 1 {
            return Ok(remotes.pop());
        }
        let tracked = self.tracked_remote()?;
        if tracked.is_none() {
            warn!(
                "{} remotes configured and the current branch tracks none",
                remotes.len()
            );
        }
        Ok(tracked)
    }
}

/// Version tags found in `git show-ref --tags` output. Other tags are
/// skipped.
pub fn parse_version_tags(show_ref: &str) -> Vec<Version> {
    TAG_REF
        .captures_iter(show_ref)
        .filter_map(|caps| Version::parse(&caps[1]).ok())
        .collect()
}

/// Remote name from the current-branch line of `git branch -vv`.
pub fn parse_tracked_remote(branch_vv: &str) -> Option<String> {
    TRACKED_REMOTE
        .captures(branch_vv)
        .map(|caps| caps[1].to_owned())
}
