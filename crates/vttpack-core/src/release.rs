use crate::bump::{ensure_newer, VersionBump};
use crate::config::{RunConfig, RunConfigs};
use crate::git::Git;
use crate::github::{apply_github_links, GithubLinks, ReleaseChannel};
use crate::CoreError;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vttpack_schema::{write_atomic, Directives, ManifestFile, Version};

pub const PACKAGE_JSON: &str = "package.json";

/// A package checkout: the repository root and the directory holding the
/// source manifest.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    src_dir: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, src_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        let src_dir = root.join(src_dir);
        Self { root, src_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn git(&self) -> Git {
        Git::new(&self.root)
    }

    pub fn read_manifest(&self) -> Result<ManifestFile, CoreError> {
        Ok(ManifestFile::read(&self.src_dir)?)
    }

    pub fn run_configs(&self) -> Result<RunConfigs, CoreError> {
        RunConfigs::load(&self.root)
    }

    /// Install directories of this package for the selected run instances.
    pub fn install_dirs(&self, key: Option<&str>) -> Result<Vec<(RunConfig, PathBuf)>, CoreError> {
        let file = self.read_manifest()?;
        let id = file
            .manifest
            .id
            .clone()
            .ok_or_else(|| CoreError::MissingId(file.path.display().to_string()))?;
        let configs = self.run_configs()?;
        Ok(configs
            .select(key)?
            .into_iter()
            .map(|config| {
                let dir = config.install_dir(file.kind, &id);
                (config.clone(), dir)
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub previous: String,
    pub version: String,
    pub repository: String,
    pub manifest_path: PathBuf,
    pub links: GithubLinks,
    pub package_json_updated: bool,
}

/// Version `publish` would release: the bump applied to the latest tag,
/// checked to be strictly newer.
pub fn next_version(git: &Git, bump: &VersionBump) -> Result<(Version, Version), CoreError> {
    let latest = git.latest_version_tag()?;
    let next = bump.apply(&latest)?;
    ensure_newer(&latest, &next)?;
    Ok((latest, next))
}

/// Cut a release: stamp the manifest with the new version and pinned GitHub
/// links, commit, push and tag.
pub fn publish(
    project: &Project,
    bump: &VersionBump,
    repository: &str,
) -> Result<PublishOutcome, CoreError> {
    let git = project.git();
    let (previous, version) = next_version(&git, bump)?;
    git.ensure_clean()?;
    info!("publishing {version} (previous {previous})");

    let mut file = project.read_manifest()?;
    file.manifest.version = Some(version.to_string());
    let links = apply_github_links(
        &mut file.manifest,
        repository,
        file.kind,
        &version,
        ReleaseChannel::Pinned,
    );
    file.write(Directives::all())?;

    let package_json_updated = update_package_json(&project.root.join(PACKAGE_JSON), &version)?;

    git.commit_version(&version)?;
    git.push()?;
    git.delete_tag(&version);
    git.tag_version(&version)?;

    Ok(PublishOutcome {
        previous: previous.to_string(),
        version: version.to_string(),
        repository: repository.to_owned(),
        manifest_path: file.path,
        links,
        package_json_updated,
    })
}

/// Move the latest version tag to the current commit and push it again.
pub fn reupload(project: &Project) -> Result<Version, CoreError> {
    let git = project.git();
    let latest = git.latest_version_tag()?;
    if latest == Version::default() {
        warn!("no version tag found, tagging {latest}");
    }
    git.delete_tag(&latest);
    git.tag_version(&latest)?;
    Ok(latest)
}

/// Rewrite a manifest with GitHub release links and every enrichment.
///
/// The manifest is read from the project's source directory and written to
/// `dest` when given (e.g. a build output folder), else back in place. The
/// links use the manifest's own version, or the latest tag when it has none.
pub fn update_manifest_for_github(
    project: &Project,
    repository: &str,
    channel: ReleaseChannel,
    dest: Option<&Path>,
) -> Result<PathBuf, CoreError> {
    let mut file = project.read_manifest()?;
    let version = match file.manifest.version.as_deref().map(Version::parse) {
        Some(Ok(version)) => version,
        Some(Err(e)) => {
            warn!("{e}, falling back to the latest tag");
            project.git().latest_version_tag()?
        }
        None => project.git().latest_version_tag()?,
    };
    debug!("linking {} to {repository} at {version}", file.path.display());
    apply_github_links(&mut file.manifest, repository, file.kind, &version, channel);

    let written = match dest {
        Some(dest) => file.write_to(dest, Directives::all())?,
        None => {
            file.write(Directives::all())?;
            file.path.clone()
        }
    };
    info!("wrote {}", written.display());
    Ok(written)
}

/// Set `version` in `package.json`, keeping every other key and its order.
/// Returns `false` when there is no `package.json`.
pub fn update_package_json(path: &Path, version: &Version) -> Result<bool, CoreError> {
    if !path.is_file() {
        debug!("no {} to update", path.display());
        return Ok(false);
    }
    let content = std::fs::read_to_string(path)?;
    let mut package: Value = serde_json::from_str(&content)?;
    let Some(fields) = package.as_object_mut() else {
        return Err(CoreError::Config(format!(
            "{} must contain an object",
            path.display()
        )));
    };
    fields.insert("version".to_owned(), Value::String(version.to_string()));

    let mut rendered = serde_json::to_string_pretty(&package)?;
    rendered.push('\n');
    write_atomic(path, &rendered)?;
    Ok(true)
}
