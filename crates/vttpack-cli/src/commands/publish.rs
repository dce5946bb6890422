use super::{github_repository, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use vttpack_core::{publish, Project, VersionBump};

pub fn run(project: &Project, update: Option<&str>, json: bool) -> Result<u8, String> {
    let bump = VersionBump::parse(update).map_err(|e| e.to_string())?;
    let repository = github_repository(project)?;

    let pb = spinner("publishing…");
    let outcome = publish(project, &bump, &repository).map_err(|e| {
        spin_fail(&pb, "publish failed");
        e.to_string()
    })?;
    spin_ok(&pb, &format!("published {}", outcome.version));

    if json {
        println!("{}", json_pretty(&outcome)?);
    } else {
        println!(
            "{} -> {} on {}",
            outcome.previous, outcome.version, outcome.repository
        );
        println!("manifest: {}", outcome.links.manifest);
        println!("download: {}", outcome.links.download);
        if outcome.package_json_updated {
            println!("package.json version updated");
        }
    }
    Ok(EXIT_SUCCESS)
}
