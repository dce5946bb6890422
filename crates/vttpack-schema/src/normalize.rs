use crate::keyed::KeyedList;
use crate::legacy::{LegacyDependency, LegacyFields, RawPack, SchemaRevision};
use crate::model::{Author, Compatibility, Flags, Manifest, Relationship, Relationships};
use crate::types::{PackageId, RelationshipKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Fold a manifest payload of any schema revision into the canonical form.
///
/// Total over JSON objects: missing fields stay absent, and a known field
/// with an unexpected JSON type is carried through verbatim instead of
/// failing. Legacy-only keys never reach the result.
pub fn normalize(raw: &Map<String, Value>) -> Manifest {
    let revision = SchemaRevision::detect(raw);
    debug!(%revision, "normalizing manifest");

    let mut reader = FieldReader::new(raw.clone());
    let legacy = read_legacy_fields(&mut reader);

    let id = reader.take::<PackageId>("id");
    let id = if reader.kept_raw("id") {
        id
    } else {
        id.or(legacy.name)
    };

    let mut authors = reader.take::<Vec<Author>>("authors");
    if let Some(author) = legacy.author {
        if reader.kept_raw("authors") {
            warn!("dropping legacy author '{author}': authors is not a list");
        } else {
            authors
                .get_or_insert_with(Vec::new)
                .push(Author::named(author));
        }
    }

    let compatibility = reader.take::<Compatibility>("compatibility");
    let compatibility = if compatibility.is_some() || reader.kept_raw("compatibility") {
        compatibility
    } else {
        let synthesized = Compatibility {
            minimum: legacy.minimum_core_version,
            verified: legacy.compatible_core_version,
            ..Compatibility::default()
        };
        (!synthesized.is_empty()).then_some(synthesized)
    };

    let packs = reader
        .take::<Vec<RawPack>>("packs")
        .map(|packs| packs.into_iter().map(RawPack::into_pack).collect());

    let relationships = merge_relationships(
        reader.take_object("relationships"),
        legacy.dependencies.unwrap_or_default(),
        legacy.system.unwrap_or_default(),
    );

    Manifest {
        id,
        title: reader.take("title"),
        description: reader.take("description"),
        authors,
        version: reader.take("version"),
        compatibility,
        url: reader.take("url"),
        license: reader.take("license"),
        readme: reader.take("readme"),
        bugs: reader.take("bugs"),
        changelog: reader.take("changelog"),
        manifest: reader.take("manifest"),
        download: reader.take("download"),
        scripts: reader.take("scripts"),
        esmodules: reader.take("esmodules"),
        styles: reader.take("styles"),
        languages: reader.take("languages"),
        packs,
        relationships,
        socket: reader.take("socket"),
        protected: reader.take("protected"),
        exclusive: reader.take("exclusive"),
        media: reader.take("media"),
        flags: reader.take::<Flags>("flags"),
        extra: reader.finish(),
    }
}

fn read_legacy_fields(reader: &mut FieldReader) -> LegacyFields {
    LegacyFields {
        name: reader.take_legacy("name"),
        author: reader.take_legacy("author"),
        minimum_core_version: reader.take_legacy("minimumCoreVersion"),
        compatible_core_version: reader.take_legacy("compatibleCoreVersion"),
        system: reader.take_legacy_list("system"),
        dependencies: reader.take_legacy_list("dependencies"),
    }
}

/// Merge every generation's relationship data. Later sources overwrite
/// earlier ones on id: legacy `dependencies`, legacy `system`, then
/// `relationships.requires`, then `relationships.systems`.
fn merge_relationships(
    modern: Option<Map<String, Value>>,
    dependencies: Vec<LegacyDependency>,
    legacy_systems: Vec<String>,
) -> Relationships {
    let mut requires: KeyedList<PackageId, Relationship> = KeyedList::new();
    let mut systems: KeyedList<PackageId, Relationship> = KeyedList::new();

    for dependency in dependencies {
        let rel = dependency.into_relationship();
        if rel.is_kind(&RelationshipKind::System) {
            systems.insert(rel.id.clone(), rel);
        } else {
            requires.insert(rel.id.clone(), rel);
        }
    }

    for system in legacy_systems {
        let rel = Relationship::new(system.as_str(), RelationshipKind::System);
        systems.insert(rel.id.clone(), rel);
    }

    let mut modern = modern.unwrap_or_default();

    for rel in relationship_list(&mut modern, "requires").unwrap_or_default() {
        if rel.is_kind(&RelationshipKind::System) {
            debug!(id = %rel.id, "moving system-typed requirement into systems");
            systems.insert(rel.id.clone(), rel);
        } else {
            requires.insert(rel.id.clone(), rel);
        }
    }

    for rel in relationship_list(&mut modern, "systems").unwrap_or_default() {
        systems.insert(rel.id.clone(), rel);
    }

    let recommends = relationship_list(&mut modern, "recommends");
    let conflicts = relationship_list(&mut modern, "conflicts");
    let flags = match modern.remove("flags") {
        Some(Value::Object(flags)) => Some(flags),
        Some(Value::Null) | None => None,
        Some(other) => {
            modern.insert("flags".to_owned(), other);
            None
        }
    };

    Relationships {
        requires: requires.into_values(),
        systems: systems.into_values(),
        recommends,
        conflicts,
        flags,
        extra: modern.into_iter().collect(),
    }
}

/// Entries without a usable `id` are skipped; a relationship cannot be
/// keyed without one.
fn relationship_list(map: &mut Map<String, Value>, key: &str) -> Option<Vec<Relationship>> {
    match map.remove(key)? {
        Value::Array(entries) => Some(
            entries
                .into_iter()
                .filter_map(|entry| relationship_entry(key, entry))
                .collect(),
        ),
        Value::Null => None,
        other => {
            warn!("ignoring relationships.{key}: expected a list, found {other}");
            None
        }
    }
}

/// Only `id` has to fit its type. Any other field that does not is kept
/// verbatim in the entry's `extra`.
fn relationship_entry(key: &str, entry: Value) -> Option<Relationship> {
    let fields = match entry {
        Value::Object(fields) => fields,
        other => {
            warn!("skipping relationships.{key} entry {other}: expected an object");
            return None;
        }
    };
    let mut reader = FieldReader::new(fields);
    let Some(id) = reader.take::<PackageId>("id") else {
        warn!("skipping relationships.{key} entry without a string id");
        return None;
    };
    Some(Relationship {
        id,
        kind: reader.take("type"),
        manifest: reader.take("manifest"),
        compatibility: reader.take("compatibility"),
        reason: reader.take("reason"),
        extra: reader.finish(),
    })
}

/// Pulls typed fields out of a raw payload, remembering anything that did
/// not fit its declared type so it can be written back untouched.
struct FieldReader {
    fields: Map<String, Value>,
    passthrough: BTreeMap<String, Value>,
}

impl FieldReader {
    fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            passthrough: BTreeMap::new(),
        }
    }

    fn take<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.fields.remove(key)?;
        if value.is_null() {
            return None;
        }
        match T::deserialize(&value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("keeping malformed manifest field '{key}' as-is: {e}");
                self.passthrough.insert(key.to_owned(), value);
                None
            }
        }
    }

    fn take_legacy<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.fields.remove(key)?;
        if value.is_null() {
            return None;
        }
        match T::deserialize(&value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("dropping malformed legacy field '{key}': {e}");
                None
            }
        }
    }

    /// A legacy list read entry by entry; a bad entry drops only itself.
    fn take_legacy_list<T: DeserializeOwned>(&mut self, key: &str) -> Option<Vec<T>> {
        let entries = match self.fields.remove(key)? {
            Value::Array(entries) => entries,
            Value::Null => return None,
            other => {
                warn!("dropping malformed legacy field '{key}': expected a list, found {other}");
                return None;
            }
        };
        Some(
            entries
                .into_iter()
                .filter_map(|entry| match T::deserialize(&entry) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!("dropping legacy {key} entry {entry}: {e}");
                        None
                    }
                })
                .collect(),
        )
    }

    fn take_object(&mut self, key: &str) -> Option<Map<String, Value>> {
        match self.fields.remove(key)? {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                warn!("dropping '{key}': expected an object, found {other}");
                None
            }
        }
    }

    fn kept_raw(&self, key: &str) -> bool {
        self.passthrough.contains_key(key)
    }

    fn finish(self) -> BTreeMap<String, Value> {
        let mut extra = self.passthrough;
        extra.extend(self.fields);
        extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackType;
    use serde_json::json;

    fn normalize_json(value: Value) -> Manifest {
        let Value::Object(map) = value else {
            panic!("test payload must be an object");
        };
        normalize(&map)
    }

    #[test]
    fn upgrades_legacy_manifest() {
        let manifest = normalize_json(json!({
            "name": "foo",
            "author": "Bob",
            "minimumCoreVersion": "9",
            "compatibleCoreVersion": "10",
            "system": ["dnd5e"],
            "dependencies": [{"name": "lib-wrapper", "type": "module"}]
        }));

        assert_eq!(manifest.id.as_deref(), Some("foo"));
        assert_eq!(manifest.authors, Some(vec![Author::named("Bob")]));
        let compat = manifest.compatibility.as_ref().unwrap();
        assert_eq!(compat.minimum.as_deref(), Some("9"));
        assert_eq!(compat.verified.as_deref(), Some("10"));
        assert_eq!(
            manifest.relationships.systems,
            vec![Relationship::new("dnd5e", RelationshipKind::System)]
        );
        assert_eq!(
            manifest.relationships.requires,
            vec![Relationship::new("lib-wrapper", RelationshipKind::Module)]
        );

        let value = serde_json::to_value(&manifest).unwrap();
        for key in crate::legacy::LEGACY_KEYS {
            assert!(value.get(*key).is_none(), "legacy key '{key}' leaked");
        }
    }

    #[test]
    fn id_wins_over_legacy_name() {
        let manifest = normalize_json(json!({"id": "new-id", "name": "old-name"}));
        assert_eq!(manifest.id.as_deref(), Some("new-id"));
        assert!(manifest.extra.is_empty());
    }

    #[test]
    fn legacy_author_is_appended_after_authors() {
        let manifest = normalize_json(json!({
            "authors": [{"name": "Ann", "discord": "ann#1"}],
            "author": "Bob"
        }));
        let names: Vec<_> = manifest
            .authors
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
    }

    #[test]
    fn existing_compatibility_is_used_verbatim() {
        let manifest = normalize_json(json!({
            "compatibility": {"minimum": "10", "maximum": "11"},
            "minimumCoreVersion": "0.8.9"
        }));
        let compat = manifest.compatibility.unwrap();
        assert_eq!(compat.minimum.as_deref(), Some("10"));
        assert_eq!(compat.maximum.as_deref(), Some("11"));
        assert!(compat.verified.is_none());
    }

    #[test]
    fn no_compatibility_when_no_source_has_one() {
        let manifest = normalize_json(json!({"id": "bare"}));
        assert!(manifest.compatibility.is_none());
        assert!(manifest.relationships.requires.is_empty());
        assert!(manifest.relationships.systems.is_empty());
    }

    #[test]
    fn migrates_entity_packs() {
        let manifest = normalize_json(json!({
            "packs": [
                {"name": "a", "label": "A", "path": "packs/a.db", "entity": "Actor", "system": "dnd5e"},
                {"name": "b", "label": "B", "path": "packs/b.db", "type": "Item"}
            ]
        }));
        let packs = manifest.packs.unwrap();
        assert_eq!(packs[0].pack_type, PackType::Actor);
        assert_eq!(packs[0].system.as_deref(), Some("dnd5e"));
        assert_eq!(packs[1].pack_type, PackType::Item);
    }

    #[test]
    fn modern_requirement_overrides_legacy_dependency() {
        let manifest = normalize_json(json!({
            "dependencies": [{"name": "a", "type": "module"}],
            "relationships": {"requires": [{"id": "a", "type": "module", "manifest": "http://x"}]}
        }));
        let requires = &manifest.relationships.requires;
        assert_eq!(requires.len(), 1);
        assert_eq!(requires[0].manifest.as_deref(), Some("http://x"));
    }

    #[test]
    fn system_typed_requirement_moves_to_systems() {
        let manifest = normalize_json(json!({
            "id": "m",
            "relationships": {"requires": [{"id": "pf2e", "type": "system"}]}
        }));
        assert!(manifest.relationships.requires.is_empty());
        assert_eq!(manifest.relationships.systems[0].id, "pf2e");
    }

    #[test]
    fn later_sources_replace_in_place() {
        let manifest = normalize_json(json!({
            "dependencies": [
                {"name": "dnd5e", "type": "system", "manifest": "old"},
                {"name": "pf2e", "type": "system"}
            ],
            "system": ["dnd5e"],
            "relationships": {"systems": [{"id": "pf2e", "type": "system", "reason": "new"}]}
        }));
        let systems = &manifest.relationships.systems;
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].id, "dnd5e");
        assert!(systems[0].manifest.is_none());
        assert_eq!(systems[1].id, "pf2e");
        assert_eq!(systems[1].reason.as_deref(), Some("new"));
    }

    #[test]
    fn keeps_v11_relationship_extras() {
        let manifest = normalize_json(json!({
            "id": "m",
            "relationships": {
                "recommends": [{"id": "dice-so-nice", "type": "module"}],
                "conflicts": [{"id": "bad-module", "reason": "breaks sheets"}],
                "flags": {"note": 1},
                "custom": true
            }
        }));
        let rel = manifest.relationships;
        assert_eq!(rel.recommends.unwrap()[0].id, "dice-so-nice");
        assert_eq!(rel.conflicts.unwrap()[0].reason.as_deref(), Some("breaks sheets"));
        assert_eq!(rel.flags.unwrap()["note"], json!(1));
        assert_eq!(rel.extra.get("custom"), Some(&json!(true)));
    }

    #[test]
    fn mistyped_fields_pass_through() {
        let manifest = normalize_json(json!({"id": "m", "version": 3, "socket": "yes"}));
        assert!(manifest.version.is_none());
        assert_eq!(manifest.extra.get("version"), Some(&json!(3)));
        assert_eq!(manifest.extra.get("socket"), Some(&json!("yes")));
    }

    #[test]
    fn malformed_legacy_fields_are_dropped() {
        let manifest = normalize_json(json!({"id": "m", "author": {"name": "x"}, "system": "dnd5e"}));
        assert!(manifest.authors.is_none());
        assert!(manifest.extra.is_empty());
        assert!(manifest.relationships.systems.is_empty());
    }

    #[test]
    fn unknown_keys_and_flags_survive() {
        let manifest = normalize_json(json!({
            "id": "m",
            "flags": {"allowBugReporter": true, "hbsFiles": ["t.hbs"]},
            "zeta": [1, 2]
        }));
        assert_eq!(manifest.flags.unwrap()["allowBugReporter"], json!(true));
        assert_eq!(manifest.extra.get("zeta"), Some(&json!([1, 2])));
    }

    #[test]
    fn mistyped_relationship_fields_keep_the_entry() {
        let manifest = normalize_json(json!({
            "id": "m",
            "relationships": {
                "requires": [
                    {"id": "lib-wrapper", "type": "module", "compatibility": {"minimum": 1}},
                    {"id": "socketlib", "reason": 5, "manifest": "https://example.com/s.json"},
                    {"type": "module"},
                    "not-an-entry"
                ]
            }
        }));
        let requires = &manifest.relationships.requires;
        assert_eq!(requires.len(), 2);

        assert_eq!(requires[0].id, "lib-wrapper");
        assert!(requires[0].is_kind(&RelationshipKind::Module));
        assert!(requires[0].compatibility.is_none());
        assert_eq!(
            requires[0].extra.get("compatibility"),
            Some(&json!({"minimum": 1}))
        );

        assert_eq!(requires[1].id, "socketlib");
        assert!(requires[1].reason.is_none());
        assert_eq!(requires[1].extra.get("reason"), Some(&json!(5)));
        assert_eq!(requires[1].manifest.as_deref(), Some("https://example.com/s.json"));

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value["relationships"]["requires"][0],
            json!({"id": "lib-wrapper", "type": "module", "compatibility": {"minimum": 1}})
        );
    }

    #[test]
    fn bad_legacy_dependency_drops_only_itself() {
        let manifest = normalize_json(json!({
            "name": "m",
            "dependencies": [
                {"name": "lib-wrapper", "type": "module"},
                {"type": "module"},
                {"name": "dnd5e", "type": "system"}
            ],
            "system": ["pf2e", 7]
        }));
        assert_eq!(
            manifest.relationships.requires,
            vec![Relationship::new("lib-wrapper", RelationshipKind::Module)]
        );
        let systems: Vec<_> = manifest
            .relationships
            .systems
            .iter()
            .map(|rel| rel.id.as_str())
            .collect();
        assert_eq!(systems, vec!["dnd5e", "pf2e"]);
    }
}
