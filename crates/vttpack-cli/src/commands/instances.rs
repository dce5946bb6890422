use super::{json_pretty, EXIT_SUCCESS};
use vttpack_core::{Project, CONFIG_FILE_NAME};

pub fn run(project: &Project, key: Option<&str>, json: bool) -> Result<u8, String> {
    let instances = project.install_dirs(key).map_err(|e| e.to_string())?;

    if json {
        let payload: Vec<_> = instances
            .iter()
            .map(|(config, dir)| {
                serde_json::json!({
                    "key": config.key,
                    "data_path": config.data_path,
                    "foundry_path": config.foundry_path,
                    "install_dir": dir,
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else if instances.is_empty() {
        println!("no run instances configured in {CONFIG_FILE_NAME}");
    } else {
        println!("{:<16} INSTALL_DIR", "KEY");
        for (config, dir) in &instances {
            println!("{:<16} {}", config.key, dir.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
