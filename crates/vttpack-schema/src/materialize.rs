use crate::assets::{discover_assets, merge_sorted};
use crate::keyed::KeyedList;
use crate::legacy::LegacyDependency;
use crate::manifest::{json_type_name, ManifestError};
use crate::model::{Manifest, HBS_FILES_FLAG};
use crate::types::{PackageId, RelationshipKind};
use crate::version::Version;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Highest host major version that still reads the legacy field names.
pub const LEGACY_HOST_MAJOR: u64 = 9;

/// Output key order. Keys not listed follow in lexicographic order.
pub const KEY_ORDER: &[&str] = &[
    "id",
    "name",
    "title",
    "version",
    "compatibility",
    "minimumCoreVersion",
    "compatibleCoreVersion",
    "description",
    "author",
    "authors",
    "url",
    "manifest",
    "download",
    "media",
    "license",
    "readme",
    "bugs",
    "changelog",
    "flags",
    "scripts",
    "esmodules",
    "styles",
    "languages",
    "packs",
    "relationships",
    "system",
    "dependencies",
    "socket",
    "protected",
    "exclusive",
];

/// Enrichment steps applied while materializing. Each is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Directives {
    /// Add every `*.css` under the asset root to `styles`.
    pub inject_css: bool,
    /// Add every `*.hbs` under the asset root to `flags.hbsFiles`.
    pub inject_hbs: bool,
    /// Write the pre-V10 field names next to the current ones.
    pub inject_older_version_properties: bool,
}

impl Directives {
    /// Everything the release workflows enable.
    pub fn all() -> Self {
        Self {
            inject_css: true,
            inject_hbs: true,
            inject_older_version_properties: true,
        }
    }
}

/// A manifest ready to be written, with its keys in final order.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializableManifest {
    fields: Vec<(String, Value)>,
}

impl SerializableManifest {
    /// Order `fields` by [`KEY_ORDER`], then unknown keys alphabetically.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut ordered = Vec::with_capacity(fields.len());
        for key in KEY_ORDER {
            if let Some(value) = fields.remove(*key) {
                ordered.push(((*key).to_owned(), value));
            }
        }
        let mut rest: Vec<(String, Value)> = fields.into_iter().collect();
        rest.sort_by(|a, b| a.0.cmp(&b.0));
        ordered.extend(rest);
        Self { fields: ordered }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect())
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

impl Serialize for SerializableManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Produce the on-disk form of `manifest`.
///
/// The caller's manifest is left untouched. Asset discovery runs against
/// `asset_root`; if it fails nothing is produced.
pub fn materialize(
    manifest: &Manifest,
    directives: Directives,
    asset_root: &Path,
) -> Result<SerializableManifest, ManifestError> {
    let mut output = manifest.clone();

    if directives.inject_css {
        let discovered = discover_assets(asset_root, "css")?;
        let existing = match output.extra.remove("styles") {
            Some(raw) => listed_strings("styles", raw)?,
            None => output.styles.take().unwrap_or_default(),
        };
        output.styles = Some(merge_sorted(discovered, existing));
    }

    if directives.inject_hbs {
        if let Some(raw) = output.extra.remove("flags") {
            return Err(ManifestError::InjectionTarget {
                field: "flags".to_owned(),
                found: json_type_name(&raw),
            });
        }
        let discovered = discover_assets(asset_root, "hbs")?;
        let flags = output.flags.get_or_insert_with(Map::new);
        let existing = match flags.remove(HBS_FILES_FLAG) {
            Some(raw) => listed_strings(&format!("flags.{HBS_FILES_FLAG}"), raw)?,
            None => Vec::new(),
        };
        let merged = merge_sorted(discovered, existing);
        flags.insert(
            HBS_FILES_FLAG.to_owned(),
            Value::Array(merged.into_iter().map(Value::String).collect()),
        );
    }

    let mut fields: Map<String, Value> = serde_json::from_value(serde_json::to_value(&output)?)?;

    if directives.inject_older_version_properties {
        match legacy_floor(&output) {
            Some(major) if major <= LEGACY_HOST_MAJOR => {
                debug!(major, "writing legacy manifest fields");
                backfill_legacy_fields(&output, &mut fields)?;
            }
            floor => debug!(?floor, "compatibility floor too new for legacy fields"),
        }
    }

    Ok(SerializableManifest::from_fields(fields))
}

/// Entries already listed under an injection target. A bare string counts
/// as one entry and `null` as none.
fn listed_strings(field: &str, raw: Value) -> Result<Vec<String>, ManifestError> {
    let items = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::String(s) => return Ok(vec![s]),
        Value::Array(items) => items,
        other => {
            return Err(ManifestError::InjectionTarget {
                field: field.to_owned(),
                found: json_type_name(&other),
            })
        }
    };
    items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(ManifestError::InjectionTarget {
                field: format!("{field}[]"),
                found: json_type_name(&other),
            }),
        })
        .collect()
}

fn legacy_floor(manifest: &Manifest) -> Option<u64> {
    let minimum = manifest.compatibility.as_ref()?.minimum.as_deref()?;
    Version::parse(minimum).ok().map(|v| v.major)
}

/// Regenerate the pre-V10 sibling fields from canonical data.
fn backfill_legacy_fields(
    manifest: &Manifest,
    fields: &mut Map<String, Value>,
) -> Result<(), ManifestError> {
    if let Some(compat) = &manifest.compatibility {
        if let Some(minimum) = &compat.minimum {
            fields.insert("minimumCoreVersion".to_owned(), Value::from(minimum.as_str()));
        }
        let compatible = compat
            .verified
            .as_ref()
            .or(compat.maximum.as_ref())
            .or(compat.minimum.as_ref());
        if let Some(compatible) = compatible {
            fields.insert(
                "compatibleCoreVersion".to_owned(),
                Value::from(compatible.as_str()),
            );
        }
    }

    if let Some(id) = &manifest.id {
        fields.insert("name".to_owned(), Value::from(id.as_str()));
    }

    if let Some(Value::Array(packs)) = fields.get_mut("packs") {
        for pack in packs.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(pack_type) = pack.get("type").cloned() {
                pack.insert("entity".to_owned(), pack_type);
            }
        }
    }

    let mut modules = KeyedList::<PackageId, LegacyDependency>::new();
    let mut systems = KeyedList::<PackageId, ()>::new();
    let relationships = &manifest.relationships;
    for rel in relationships.requires.iter().chain(&relationships.systems) {
        match rel.kind {
            Some(RelationshipKind::Module) => {
                modules.insert(rel.id.clone(), LegacyDependency::from_relationship(rel));
            }
            Some(RelationshipKind::System) => {
                systems.insert(rel.id.clone(), ());
            }
            _ => {}
        }
    }

    fields.insert(
        "dependencies".to_owned(),
        serde_json::to_value(modules.into_values())?,
    );
    fields.insert(
        "system".to_owned(),
        Value::Array(systems.keys().map(|id| Value::from(id.as_str())).collect()),
    );
    Ok(())
}
