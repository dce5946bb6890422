use super::{colorize_revision, json_pretty, manifest_error, EXIT_SUCCESS};
use std::path::Path;
use vttpack_schema::ManifestFile;

pub fn run(path: &Path, json: bool) -> Result<u8, String> {
    let file = ManifestFile::read(path).map_err(|e| manifest_error(&e))?;
    if json {
        let payload = serde_json::json!({
            "kind": file.kind,
            "path": file.path,
            "revision": file.revision,
            "manifest": file.manifest,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let relationships = &file.manifest.relationships;
        println!("path:      {}", file.path.display());
        println!("kind:      {}", file.kind);
        println!("revision:  {}", colorize_revision(file.revision));
        println!("id:        {}", file.manifest.id.as_deref().unwrap_or("(none)"));
        println!(
            "version:   {}",
            file.manifest.version.as_deref().unwrap_or("(none)")
        );
        println!("requires:  {}", relationships.requires.len());
        println!("systems:   {}", relationships.systems.len());
        println!("{}", json_pretty(&file.manifest)?);
    }
    Ok(EXIT_SUCCESS)
}
