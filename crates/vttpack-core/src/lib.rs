//! Release workflows for vttpack packages.
//!
//! This crate drives everything around the manifest that touches the outside
//! world: run-instance configuration (`foundryconfig.json`), version bumping,
//! git tagging through the `git` binary, GitHub release links, and the
//! `publish` / `reupload` sequences that tie them together.

pub mod bump;
pub mod config;
pub mod git;
pub mod github;
pub mod release;

pub use bump::{ensure_newer, VersionBump};
pub use config::{RunConfig, RunConfigs, CONFIG_FILE_NAME};
pub use git::{parse_tracked_remote, parse_version_tags, Git};
pub use github::{
    apply_github_links, detect_github_repo, parse_github_remote, GithubLinks, ReleaseChannel,
};
pub use release::{
    next_version, publish, reupload, update_manifest_for_github, update_package_json, Project,
    PublishOutcome,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] vttpack_schema::ManifestError),
    #[error("version error: {0}")]
    Version(#[from] vttpack_schema::VersionError),
    #[error("version error: missing version number, expected major, minor, patch or a version")]
    MissingVersion,
    #[error("release error: new version is not higher. old: {old} | new: {new}")]
    NotNewer { old: String, new: String },
    #[error("release error: you must first commit your pending changes")]
    DirtyWorkingTree,
    #[error("git error: `git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },
    #[error("release error: could not determine the GitHub repository: {0}")]
    GithubRepo(String),
    #[error("release error: manifest in {0} has no id")]
    MissingId(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
