use super::{github_repository, json_pretty, EXIT_SUCCESS};
use std::path::Path;
use vttpack_core::{update_manifest_for_github, Project, ReleaseChannel};

pub fn run(
    project: &Project,
    channel: ReleaseChannel,
    dest: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let repository = github_repository(project)?;
    let written = update_manifest_for_github(project, &repository, channel, dest)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "path": written,
            "repository": repository,
            "channel": channel,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("updated {} for {repository}", written.display());
    }
    Ok(EXIT_SUCCESS)
}
