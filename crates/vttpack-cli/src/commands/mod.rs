pub mod completions;
pub mod github_manifest;
pub mod inspect;
pub mod instances;
pub mod migrate;
pub mod next_version;
pub mod publish;
pub mod reupload;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use vttpack_core::{detect_github_repo, Project};
use vttpack_schema::SchemaRevision;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_RELEASE_ERROR: u8 = 3;

/// CI provides the `owner/name` slug here.
pub const GITHUB_REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_revision(revision: SchemaRevision) -> String {
    use console::Style;
    let label = revision.to_string();
    match revision {
        SchemaRevision::V11 => Style::new().green().apply_to(label).to_string(),
        SchemaRevision::V10 => Style::new().cyan().apply_to(label).to_string(),
        SchemaRevision::V8 => Style::new().yellow().apply_to(label).to_string(),
        SchemaRevision::Mixed => Style::new().red().bold().apply_to(label).to_string(),
    }
}

pub fn manifest_error(e: &vttpack_schema::ManifestError) -> String {
    format!("manifest error: {e}")
}

/// Repository slug for release links: `GITHUB_REPOSITORY`, else the git
/// remote.
pub fn github_repository(project: &Project) -> Result<String, String> {
    let from_env = std::env::var(GITHUB_REPOSITORY_ENV).ok();
    detect_github_repo(&project.git(), from_env.as_deref()).map_err(|e| e.to_string())
}
