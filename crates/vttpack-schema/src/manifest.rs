use crate::legacy::SchemaRevision;
use crate::materialize::{materialize, Directives, SerializableManifest};
use crate::model::Manifest;
use crate::normalize::normalize;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("manifest {path} must contain a JSON object, found {found}")]
    MalformedInput { path: String, found: &'static str },
    #[error("could not find a module.json or system.json in {}", dir.display())]
    MissingManifest { dir: PathBuf },
    #[error("asset discovery failed under {}: {source}", root.display())]
    AssetDiscovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("cannot inject assets into '{field}': expected a list of strings, found {found}")]
    InjectionTarget { field: String, found: &'static str },
}

/// The two package kinds, told apart by manifest file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Module,
    System,
}

impl ManifestKind {
    pub const ALL: [Self; 2] = [Self::Module, Self::System];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Module => "module.json",
            Self::System => "system.json",
        }
    }

    /// Directory under the host's `Data/` folder that holds this kind.
    pub fn install_dir_name(self) -> &'static str {
        match self {
            Self::Module => "modules",
            Self::System => "systems",
        }
    }

    pub fn from_path(path: &Path) -> Self {
        if path.to_string_lossy().ends_with(Self::System.file_name()) {
            Self::System
        } else {
            Self::Module
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Module => "module",
            Self::System => "system",
        })
    }
}

/// Resolve `path` to a manifest file. Directories are searched for
/// `module.json`, then `system.json`.
pub fn locate_manifest(path: &Path) -> Result<(PathBuf, ManifestKind), ManifestError> {
    locate_manifest_optional(path)?.ok_or_else(|| ManifestError::MissingManifest {
        dir: path.to_path_buf(),
    })
}

/// Like [`locate_manifest`], but a directory without a manifest is `None`.
pub fn locate_manifest_optional(
    path: &Path,
) -> Result<Option<(PathBuf, ManifestKind)>, ManifestError> {
    if !path.is_dir() {
        if !path.exists() {
            return Ok(None);
        }
        return Ok(Some((path.to_path_buf(), ManifestKind::from_path(path))));
    }
    for kind in ManifestKind::ALL {
        let candidate = path.join(kind.file_name());
        if candidate.is_file() {
            return Ok(Some((candidate, kind)));
        }
    }
    Ok(None)
}

/// Parse manifest text into a raw JSON object. Anything but an object is
/// rejected here, before normalization.
pub fn parse_raw_manifest(input: &str, origin: &str) -> Result<Map<String, Value>, ManifestError> {
    match serde_json::from_str::<Value>(input)? {
        Value::Object(map) => Ok(map),
        other => Err(ManifestError::MalformedInput {
            path: origin.to_owned(),
            found: json_type_name(&other),
        }),
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    Ok(normalize(&parse_raw_manifest(input, "<input>")?))
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    Ok(normalize(&parse_raw_manifest(
        &content,
        &path.display().to_string(),
    )?))
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A manifest loaded from disk, with where it came from.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    pub kind: ManifestKind,
    pub path: PathBuf,
    pub revision: SchemaRevision,
    pub manifest: Manifest,
}

impl ManifestFile {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let (file, kind) = locate_manifest(path.as_ref())?;
        Self::load(file, kind)
    }

    pub fn read_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ManifestError> {
        match locate_manifest_optional(path.as_ref())? {
            Some((file, kind)) => Self::load(file, kind).map(Some),
            None => Ok(None),
        }
    }

    fn load(path: PathBuf, kind: ManifestKind) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(&path)?;
        let raw = parse_raw_manifest(&content, &path.display().to_string())?;
        let revision = SchemaRevision::detect(&raw);
        info!("read {kind} manifest {} ({revision})", path.display());
        Ok(Self {
            kind,
            path,
            revision,
            manifest: normalize(&raw),
        })
    }

    /// Directory asset discovery runs against.
    pub fn asset_root(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn render(&self, directives: Directives) -> Result<SerializableManifest, ManifestError> {
        materialize(&self.manifest, directives, self.asset_root())
    }

    /// Materialize and write back to the file this manifest was read from.
    pub fn write(&self, directives: Directives) -> Result<(), ManifestError> {
        let rendered = self.render(directives)?;
        write_atomic(&self.path, &rendered.to_json_pretty()?)
    }

    /// Materialize against and write into another directory, e.g. an
    /// installed copy of the package. The file name is kept.
    pub fn write_to(&self, dest_dir: &Path, directives: Directives) -> Result<PathBuf, ManifestError> {
        let dest = dest_dir.join(self.kind.file_name());
        let rendered = materialize(&self.manifest, directives, dest_dir)?;
        write_atomic(&dest, &rendered.to_json_pretty()?)?;
        Ok(dest)
    }
}

/// Replace `dest` with `content` through a temp file in the same directory,
/// so readers never see a half-written file.
pub fn write_atomic(dest: &Path, content: &str) -> Result<(), ManifestError> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| ManifestError::Io(e.error))?;
    debug!("wrote {}", dest.display());
    Ok(())
}
