use crate::CoreError;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;
use vttpack_schema::{json_type_name, ManifestKind, PackageId};

pub const CONFIG_FILE_NAME: &str = "foundryconfig.json";

/// A local host installation packages can be installed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub key: String,
    pub data_path: PathBuf,
    pub foundry_path: PathBuf,
}

impl RunConfig {
    /// `<dataPath>/Data/<modules|systems>/<id>`
    pub fn install_dir(&self, kind: ManifestKind, id: &PackageId) -> PathBuf {
        self.data_path
            .join("Data")
            .join(kind.install_dir_name())
            .join(id.as_str())
    }
}

/// All run instances declared in `foundryconfig.json`, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfigs {
    entries: Vec<RunConfig>,
}

impl RunConfigs {
    /// Load `foundryconfig.json` from `root`. A missing file means no run
    /// instances.
    pub fn load(root: &Path) -> Result<Self, CoreError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("no {} in {}", CONFIG_FILE_NAME, root.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse_str(&content)
    }

    pub fn parse_str(input: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| CoreError::Config(format!("invalid {CONFIG_FILE_NAME}: {e}")))?;
        let file = match value {
            Value::Object(file) => file,
            other => {
                return Err(CoreError::Config(format!(
                    "expected {CONFIG_FILE_NAME} to contain an object, found {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut entries = Vec::with_capacity(file.len());
        for (key, entry) in &file {
            let Value::Object(fields) = entry else {
                return Err(CoreError::Config(format!(
                    "expected {key} to be an object, found {}",
                    json_type_name(entry)
                )));
            };
            let path_field = |name: &str| -> Result<PathBuf, CoreError> {
                match fields.get(name) {
                    Some(Value::String(s)) => Ok(PathBuf::from(s)),
                    other => Err(CoreError::Config(format!(
                        "expected {key}.{name} to be a string, found {}",
                        other.map_or("undefined", json_type_name)
                    ))),
                }
            };
            entries.push(RunConfig {
                key: key.clone(),
                data_path: path_field("dataPath")?,
                foundry_path: path_field("foundryPath")?,
            });
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunConfig> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&RunConfig> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// The instance named `key`, or every instance when no key is given.
    /// An unknown key is an error.
    pub fn select(&self, key: Option<&str>) -> Result<Vec<&RunConfig>, CoreError> {
        match key {
            Some(key) => self.get(key).map(|entry| vec![entry]).ok_or_else(|| {
                CoreError::Config(format!(
                    "runInstanceKey ({key}) not found in {CONFIG_FILE_NAME}"
                ))
            }),
            None => Ok(self.entries.iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_INSTANCES: &str = r#"{
        "v11": {"dataPath": "/srv/foundry11/data", "foundryPath": "/opt/foundry11"},
        "v9": {"dataPath": "/srv/foundry9/data", "foundryPath": "/opt/foundry9"}
    }"#;

    #[test]
    fn parses_entries_in_file_order() {
        let configs = RunConfigs::parse_str(TWO_INSTANCES).unwrap();
        let keys: Vec<_> = configs.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["v11", "v9"]);
        assert_eq!(
            configs.get("v9").unwrap().foundry_path,
            PathBuf::from("/opt/foundry9")
        );
    }

    #[test]
    fn select_by_key_or_all() {
        let configs = RunConfigs::parse_str(TWO_INSTANCES).unwrap();
        let one = configs.select(Some("v9")).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].key, "v9");
        assert_eq!(configs.select(None).unwrap().len(), 2);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let configs = RunConfigs::parse_str(TWO_INSTANCES).unwrap();
        let err = configs.select(Some("unknown")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config error: runInstanceKey (unknown) not found in foundryconfig.json"
        );
        assert!(RunConfigs::default().select(Some("v9")).is_err());
    }

    #[test]
    fn install_dir_uses_kind_folder() {
        let configs = RunConfigs::parse_str(TWO_INSTANCES).unwrap();
        let v11 = configs.get("v11").unwrap();
        assert_eq!(
            v11.install_dir(ManifestKind::System, &PackageId::new("my-system")),
            PathBuf::from("/srv/foundry11/data/Data/systems/my-system")
        );
        assert_eq!(
            v11.install_dir(ManifestKind::Module, &PackageId::new("my-module")),
            PathBuf::from("/srv/foundry11/data/Data/modules/my-module")
        );
    }

    #[test]
    fn rejects_wrong_shapes() {
        let err = RunConfigs::parse_str("[]").unwrap_err();
        assert!(err.to_string().contains("found array"), "{err}");

        let err = RunConfigs::parse_str(r#"{"main": "path"}"#).unwrap_err();
        assert!(err.to_string().contains("expected main to be an object"), "{err}");

        let err =
            RunConfigs::parse_str(r#"{"main": {"dataPath": 3, "foundryPath": "/x"}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config error: expected main.dataPath to be a string, found number"
        );

        let err = RunConfigs::parse_str(r#"{"main": {"dataPath": "/x"}}"#).unwrap_err();
        assert!(err.to_string().contains("main.foundryPath"), "{err}");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunConfigs::load(dir.path()).unwrap().is_empty());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), TWO_INSTANCES).unwrap();
        assert_eq!(RunConfigs::load(dir.path()).unwrap().iter().count(), 2);
    }
}
