mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_RELEASE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;
use vttpack_core::{Project, ReleaseChannel};
use vttpack_schema::Directives;

#[derive(Debug, Parser)]
#[command(
    name = "vttpack",
    version,
    about = "Manifest migration and release tooling for Foundry VTT modules and systems"
)]
struct Cli {
    /// Directory holding the source module.json or system.json.
    #[arg(long, default_value = "src", global = true)]
    src: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the detected schema revision and canonical form of a manifest.
    Inspect {
        /// Manifest file or directory containing one (defaults to --src).
        path: Option<PathBuf>,
    },
    /// Rewrite a manifest in canonical form.
    Migrate {
        /// Manifest file or directory containing one (defaults to --src).
        path: Option<PathBuf>,
        /// Add every *.css next to the manifest to `styles`.
        #[arg(long, default_value_t = false)]
        inject_css: bool,
        /// Add every *.hbs next to the manifest to `flags.hbsFiles`.
        #[arg(long, default_value_t = false)]
        inject_hbs: bool,
        /// Also write pre-V10 fields when the compatibility floor is V9 or older.
        #[arg(long, default_value_t = false)]
        legacy: bool,
        /// Print the result instead of writing it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Print the version `publish` would release.
    NextVersion {
        /// major, minor, patch, or an explicit version such as 1.4.0.
        #[arg(short = 'u', long = "update")]
        update: Option<String>,
    },
    /// Stamp the manifest with a new version, commit, push, and tag it.
    Publish {
        /// major, minor, patch, or an explicit version such as 1.4.0.
        #[arg(short = 'u', long = "update")]
        update: Option<String>,
    },
    /// Move the latest version tag to the current commit and push it.
    Reupload,
    /// Point the manifest at the latest GitHub release, for the packaged zip.
    #[command(alias = "updateZipManifestForGithub")]
    UpdateZipManifestForGithub {
        /// Write into this directory instead of rewriting the source manifest.
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Point the manifest at the current version's GitHub release.
    #[command(alias = "updateExternalManifestForGithub")]
    UpdateExternalManifestForGithub {
        /// Write into this directory instead of rewriting the source manifest.
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// List run instances from foundryconfig.json and where the package installs.
    Instances {
        /// Only this run instance. Spelled `--fi` for short; the single-dash
        /// `-fi` form is not accepted.
        #[arg(long, visible_alias = "fi", conflicts_with = "all_foundry_instances")]
        foundry_instance: Option<String>,
        /// Every run instance (the default). Spelled `--afi` for short; the
        /// single-dash `-afi` form is not accepted.
        #[arg(long, visible_alias = "afi", default_value_t = false)]
        all_foundry_instances: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("VTTPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let project = Project::new(".", &cli.src);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Inspect { path } => {
            commands::inspect::run(&path.unwrap_or_else(|| cli.src.clone()), json_output)
        }
        Commands::Migrate {
            path,
            inject_css,
            inject_hbs,
            legacy,
            dry_run,
        } => commands::migrate::run(
            &path.unwrap_or_else(|| cli.src.clone()),
            Directives {
                inject_css,
                inject_hbs,
                inject_older_version_properties: legacy,
            },
            dry_run,
            json_output,
        ),
        Commands::NextVersion { update } => {
            commands::next_version::run(&project, update.as_deref(), json_output)
        }
        Commands::Publish { update } => {
            commands::publish::run(&project, update.as_deref(), json_output)
        }
        Commands::Reupload => commands::reupload::run(&project, json_output),
        Commands::UpdateZipManifestForGithub { dest } => commands::github_manifest::run(
            &project,
            ReleaseChannel::Latest,
            dest.as_deref(),
            json_output,
        ),
        Commands::UpdateExternalManifestForGithub { dest } => commands::github_manifest::run(
            &project,
            ReleaseChannel::Pinned,
            dest.as_deref(),
            json_output,
        ),
        Commands::Instances {
            foundry_instance,
            all_foundry_instances,
        } => {
            let key = if all_foundry_instances {
                None
            } else {
                foundry_instance.as_deref()
            };
            commands::instances::run(&project, key, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest error:") {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("release error:")
        || msg.starts_with("git error:")
        || msg.starts_with("version error:")
    {
        EXIT_RELEASE_ERROR
    } else {
        EXIT_FAILURE
    }
}
