use crate::git::Git;
use crate::CoreError;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;
use vttpack_schema::{Manifest, ManifestKind, Version};

static SSH_REMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^git@github\.com:(.+?)(?:\.git)?/?$").expect("invalid regex"));

static HTTPS_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:[^@/]+@)?github\.com/(.+?)(?:\.git)?/?$").expect("invalid regex")
});

/// Which release a published manifest URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    /// `releases/download/latest/...`, follows every new release.
    Latest,
    /// `releases/download/<version>/...`, fixed to one release.
    Pinned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GithubLinks {
    pub url: String,
    pub manifest: String,
    pub download: String,
}

impl GithubLinks {
    pub fn new(repo: &str, kind: ManifestKind, version: &Version, channel: ReleaseChannel) -> Self {
        let url = format!("https://github.com/{repo}");
        let release = match channel {
            ReleaseChannel::Latest => "latest".to_owned(),
            ReleaseChannel::Pinned => version.to_string(),
        };
        Self {
            manifest: format!("{url}/releases/download/{release}/{}", kind.file_name()),
            download: format!("{url}/releases/download/{version}/module.zip"),
            url,
        }
    }
}

/// Point `url`, `manifest` and `download` at the GitHub release for `version`.
pub fn apply_github_links(
    manifest: &mut Manifest,
    repo: &str,
    kind: ManifestKind,
    version: &Version,
    channel: ReleaseChannel,
) -> GithubLinks {
    let links = GithubLinks::new(repo, kind, version, channel);
    manifest.url = Some(links.url.clone());
    manifest.manifest = Some(links.manifest.clone());
    manifest.download = Some(links.download.clone());
    links
}

/// `owner/name` from a GitHub ssh or https remote URL.
pub fn parse_github_remote(url: &str) -> Option<String> {
    let url = url.trim();
    SSH_REMOTE
        .captures(url)
        .or_else(|| HTTPS_REMOTE.captures(url))
        .map(|caps| caps[1].to_owned())
}

/// Resolve the `owner/name` slug releases are published under.
///
/// `env_repo` (from `GITHUB_REPOSITORY` in CI) wins; otherwise the push URL
/// of the release remote is parsed.
pub fn detect_github_repo(git: &Git, env_repo: Option<&str>) -> Result<String, CoreError> {
    if let Some(repo) = env_repo.map(str::trim).filter(|r| !r.is_empty()) {
        debug!("using repository {repo} from environment");
        return Ok(repo.to_owned());
    }

    let remote = git.release_remote()?.ok_or_else(|| {
        CoreError::GithubRepo("no single remote and the current branch tracks none".to_owned())
    })?;
    let push_url = git.push_url(&remote)?;
    let repo = parse_github_remote(&push_url).ok_or_else(|| {
        CoreError::GithubRepo(format!(
            "push url of remote '{remote}' is not a GitHub url: {push_url}"
        ))
    })?;
    debug!("using repository {repo} from remote {remote}");
    Ok(repo)
}
