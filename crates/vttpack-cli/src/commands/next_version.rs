use super::{json_pretty, EXIT_SUCCESS};
use vttpack_core::{next_version, Project, VersionBump};

pub fn run(project: &Project, update: Option<&str>, json: bool) -> Result<u8, String> {
    let bump = VersionBump::parse(update).map_err(|e| e.to_string())?;
    let (latest, next) = next_version(&project.git(), &bump).map_err(|e| e.to_string())?;
    if json {
        let payload = serde_json::json!({
            "latest": latest.to_string(),
            "next": next.to_string(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{next}");
    }
    Ok(EXIT_SUCCESS)
}
