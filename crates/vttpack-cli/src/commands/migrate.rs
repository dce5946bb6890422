use super::{json_pretty, manifest_error, EXIT_SUCCESS};
use std::path::Path;
use vttpack_schema::{Directives, ManifestFile};

pub fn run(path: &Path, directives: Directives, dry_run: bool, json: bool) -> Result<u8, String> {
    let file = ManifestFile::read(path).map_err(|e| manifest_error(&e))?;

    if dry_run {
        let rendered = file.render(directives).map_err(|e| manifest_error(&e))?;
        if json {
            println!("{}", json_pretty(&rendered)?);
        } else {
            print!(
                "{}",
                rendered
                    .to_json_pretty()
                    .map_err(|e| format!("JSON serialization failed: {e}"))?
            );
        }
        return Ok(EXIT_SUCCESS);
    }

    file.write(directives).map_err(|e| manifest_error(&e))?;
    if json {
        let payload = serde_json::json!({
            "path": file.path,
            "kind": file.kind,
            "from_revision": file.revision,
            "legacy_fields": directives.inject_older_version_properties,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "migrated {} ({} -> canonical)",
            file.path.display(),
            file.revision
        );
    }
    Ok(EXIT_SUCCESS)
}
