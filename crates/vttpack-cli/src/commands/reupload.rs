use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use vttpack_core::{reupload, Project};

pub fn run(project: &Project, json: bool) -> Result<u8, String> {
    let pb = spinner("moving release tag…");
    let version = reupload(project).map_err(|e| {
        spin_fail(&pb, "reupload failed");
        e.to_string()
    })?;
    spin_ok(&pb, &format!("re-tagged {version}"));

    if json {
        let payload = serde_json::json!({ "version": version.to_string() });
        println!("{}", json_pretty(&payload)?);
    }
    Ok(EXIT_SUCCESS)
}
