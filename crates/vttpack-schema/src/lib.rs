//! Package manifest model, schema migration, and materialization for vttpack.
//!
//! This crate defines the schema layer: tolerant parsing of every manifest
//! generation into one canonical [`Manifest`] (`normalize`), writing it back
//! out with optional asset injection and legacy back-fill (`materialize`),
//! and the semantic version rules shared by the release tooling (`version`).

pub mod assets;
pub mod keyed;
pub mod legacy;
pub mod manifest;
pub mod materialize;
pub mod model;
pub mod normalize;
pub mod types;
pub mod version;

pub use assets::{discover_assets, merge_sorted};
pub use keyed::KeyedList;
pub use legacy::{LegacyDependency, SchemaRevision};
pub use manifest::{
    json_type_name, locate_manifest, locate_manifest_optional, parse_manifest_file,
    parse_manifest_str, parse_raw_manifest, write_atomic, ManifestError, ManifestFile,
    ManifestKind,
};
pub use materialize::{materialize, Directives, SerializableManifest, KEY_ORDER};
pub use model::{
    Author, Compatibility, Flags, Language, Manifest, Pack, Relationship, Relationships,
    HBS_FILES_FLAG,
};
pub use normalize::normalize;
pub use types::{PackType, PackageId, RelationshipKind};
pub use version::{compare_versions, is_version_string, Version, VersionError};
