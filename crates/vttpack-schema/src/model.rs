use crate::types::{PackType, PackageId, RelationshipKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Opaque key-value bag carried through untouched (`flags` at any level).
pub type Flags = Map<String, Value>;

/// Keys the materializer owns inside [`Manifest::flags`].
pub const HBS_FILES_FLAG: &str = "hbsFiles";

/// Canonical, latest-revision manifest.
///
/// Produced fresh by [`crate::normalize`] on every read. Fields the source
/// payload never declared stay `None` and are not serialized. Keys outside
/// the known schema survive in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PackageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bugs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esmodules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<Language>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packs: Option<Vec<Pack>>,
    #[serde(default)]
    pub relationships: Relationships,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Flags>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Host versions a package (or a relationship target) works with.
///
/// `minimum <= verified <= maximum` is expected but not enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Compatibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Compatibility {
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.verified.is_none()
            && self.maximum.is_none()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Language {
    pub lang: String,
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Compendium pack declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pack {
    pub name: String,
    pub label: String,
    pub path: String,
    #[serde(rename = "type")]
    pub pack_type: PackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Flags>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A declared link to another package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: PackageId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RelationshipKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn new(id: impl Into<PackageId>, kind: RelationshipKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            manifest: None,
            compatibility: None,
            reason: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_kind(&self, kind: &RelationshipKind) -> bool {
        self.kind.as_ref() == Some(kind)
    }
}

/// `requires` and `systems` hold at most one entry per id and are always
/// written, even when empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Relationships {
    #[serde(default)]
    pub requires: Vec<Relationship>,
    #[serde(default)]
    pub systems: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommends: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Flags>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_are_not_serialized() {
        let manifest = Manifest {
            id: Some(PackageId::new("my-module")),
            ..Manifest::default()
        };
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value,
            json!({"id": "my-module", "relationships": {"requires": [], "systems": []}})
        );
    }

    #[test]
    fn unknown_keys_survive_in_extra() {
        let manifest: Manifest = serde_json::from_value(json!({
            "id": "my-module",
            "zeta": {"nested": true},
            "authors": [{"name": "Ann", "patreon": "ann"}]
        }))
        .unwrap();
        assert_eq!(manifest.extra.get("zeta"), Some(&json!({"nested": true})));
        let authors = manifest.authors.as_ref().unwrap();
        assert_eq!(authors[0].extra.get("patreon"), Some(&json!("ann")));

        let back = serde_json::to_value(&manifest).unwrap();
        assert_eq!(back["zeta"], json!({"nested": true}));
        assert_eq!(back["authors"][0]["patreon"], json!("ann"));
    }

    #[test]
    fn pack_type_serializes_under_type_key() {
        let pack: Pack = serde_json::from_value(json!({
            "name": "monsters",
            "label": "Monsters",
            "path": "packs/monsters.db",
            "type": "Actor"
        }))
        .unwrap();
        assert_eq!(pack.pack_type, PackType::Actor);
        assert_eq!(serde_json::to_value(&pack).unwrap()["type"], json!("Actor"));
    }

    #[test]
    fn relationship_without_type_is_accepted() {
        let rel: Relationship = serde_json::from_value(json!({"id": "socketlib"})).unwrap();
        assert!(rel.kind.is_none());
        assert!(!rel.is_kind(&RelationshipKind::Module));
    }

    #[test]
    fn compatibility_emptiness() {
        assert!(Compatibility::default().is_empty());
        let compat = Compatibility {
            minimum: Some("10".to_owned()),
            ..Compatibility::default()
        };
        assert!(!compat.is_empty());
    }
}
