//! Record types for the pre-V10 manifest schema.
//!
//! These only exist at the parse boundary: the normalizer folds them into
//! [`crate::Manifest`] and the materializer regenerates their JSON shape for
//! old hosts. Nothing else in the workspace sees them.

use crate::model::{Flags, Pack, Relationship};
use crate::types::{PackType, PackageId, RelationshipKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Top-level keys that only exist in the legacy schema.
pub const LEGACY_KEYS: &[&str] = &[
    "name",
    "author",
    "minimumCoreVersion",
    "compatibleCoreVersion",
    "system",
    "dependencies",
];

/// Legacy fields lifted out of a raw payload before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyFields {
    pub name: Option<PackageId>,
    pub author: Option<String>,
    pub minimum_core_version: Option<String>,
    pub compatible_core_version: Option<String>,
    pub system: Option<Vec<String>>,
    pub dependencies: Option<Vec<LegacyDependency>>,
}

/// Entry of the legacy flat `dependencies` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyDependency {
    pub name: PackageId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RelationshipKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl LegacyDependency {
    pub fn into_relationship(self) -> Relationship {
        Relationship {
            id: self.name,
            kind: self.kind,
            manifest: self.manifest,
            compatibility: None,
            reason: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn from_relationship(rel: &Relationship) -> Self {
        Self {
            name: rel.id.clone(),
            kind: rel.kind.clone(),
            manifest: rel.manifest.clone(),
        }
    }
}

/// Pack entry keyed by `entity` instead of `type`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LegacyPack {
    pub name: String,
    pub label: String,
    pub path: String,
    pub entity: PackType,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub flags: Option<Flags>,
}

/// A pack entry as found on disk: current shape first, legacy as fallback.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawPack {
    Current(Pack),
    Legacy(LegacyPack),
}

impl RawPack {
    /// Current entries pass through untouched; legacy entries keep only
    /// the fields the current schema knows.
    pub fn into_pack(self) -> Pack {
        match self {
            Self::Current(pack) => pack,
            Self::Legacy(legacy) => Pack {
                name: legacy.name,
                label: legacy.label,
                path: legacy.path,
                pack_type: legacy.entity,
                system: legacy.system,
                private: legacy.private,
                flags: legacy.flags,
                extra: BTreeMap::new(),
            },
        }
    }
}

/// Which schema generation a raw payload looks like.
///
/// Diagnostic only: normalization reads every generation's fields regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaRevision {
    /// `name` / `author` / `dependencies` era.
    V8,
    /// `id` / `compatibility` / `relationships.{requires,systems}`.
    V10,
    /// Adds `relationships.{recommends,conflicts,flags}`.
    V11,
    /// Fields from more than one generation side by side.
    Mixed,
}

impl SchemaRevision {
    pub fn detect(raw: &Map<String, Value>) -> Self {
        let legacy = LEGACY_KEYS.iter().any(|k| raw.contains_key(*k)) || has_legacy_packs(raw);
        let modern = ["id", "compatibility", "relationships"]
            .iter()
            .any(|k| raw.contains_key(*k));
        let relationships = raw.get("relationships").and_then(Value::as_object);

        if legacy && modern {
            return Self::Mixed;
        }
        if legacy {
            return Self::V8;
        }
        match relationships {
            Some(rel)
                if ["recommends", "conflicts", "flags"]
                    .iter()
                    .any(|k| rel.contains_key(*k)) =>
            {
                Self::V11
            }
            _ => Self::V10,
        }
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V8 => "v8",
            Self::V10 => "v10",
            Self::V11 => "v11",
            Self::Mixed => "mixed",
        })
    }
}

fn has_legacy_packs(raw: &Map<String, Value>) -> bool {
    raw.get("packs")
        .and_then(Value::as_array)
        .is_some_and(|packs| {
            packs.iter().filter_map(Value::as_object).any(|pack| {
                pack.contains_key("entity") && !pack.contains_key("type")
            })
        })
}
