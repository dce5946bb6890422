use crate::manifest::ManifestError;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Recursively find files with the given extension under `root`.
///
/// Paths come back relative to `root` with `/` separators, sorted. Hidden
/// files and directories are skipped. Any traversal error fails the whole
/// scan.
pub fn discover_assets(root: &Path, extension: &str) -> Result<BTreeSet<String>, ManifestError> {
    let mut found = BTreeSet::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
        })
    {
        let entry = entry.map_err(|source| ManifestError::AssetDiscovery {
            root: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let joined = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        found.insert(joined);
    }

    debug!(
        "discovered {} *.{extension} file(s) under {}",
        found.len(),
        root.display()
    );
    Ok(found)
}

/// Union of discovered and already-declared paths, de-duplicated and sorted.
pub fn merge_sorted(discovered: BTreeSet<String>, existing: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut all = discovered;
    all.extend(existing);
    all.into_iter().collect()
}
