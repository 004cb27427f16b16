//! Project Sync - Main entry point
//!
//! Stateless commands that sync a local project workspace with the platform.
//! Each command prints a JSON report on stdout; logs go to stderr.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use project_sync::api::PlatformClient;
use project_sync::config::{project_dir_or_cwd, Config, ConnectionArgs, ConnectionSettings};
use project_sync::executor::build::{upload_build, BuildOptions};
use project_sync::executor::pull::{pull, PullMode, PullOptions};
use project_sync::executor::push::{push, PushOptions};
use project_sync::executor::softwares::list_softwares;
use project_sync::executor::template::{create_from_template, TemplateOptions};
use project_sync::sync::UploadMode;
use project_sync::{utils, ToolContext};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    connection: ConnectionFlags,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionFlags {
    /// Platform API base URL (else SPARKX_API_BASE_URL / API_BASE_URL)
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Bearer token (else SPARKX_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Project id (else inferred from the project directory name)
    #[arg(long, global = true)]
    project_id: Option<u64>,

    /// Project directory (default: current directory)
    #[arg(long, value_name = "DIR", global = true)]
    project_dir: Option<PathBuf>,

    /// Accept invalid TLS certificates (local development only)
    #[arg(long, global = true)]
    insecure_tls: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a software from a template and unpack it into game/{software}
    CreateFromTemplate {
        #[arg(long)]
        template_name: String,
        #[arg(long)]
        software_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        technology_stack: Option<String>,
    },

    /// List the project's software components
    ListSoftwares {
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// Pull the latest manifest of every software and its files
    Pull {
        #[arg(long, value_enum, default_value_t = PullMode::Overwrite)]
        mode: PullMode,
        #[arg(long)]
        page_size: Option<u64>,
    },

    /// Push local changes of one software as a new manifest version
    Push {
        #[arg(long)]
        software_name: Option<String>,
        #[arg(long, value_enum, default_value_t = UploadMode::Changed)]
        mode: UploadMode,
        #[arg(long)]
        max_files: Option<usize>,
        /// Publish a version even when nothing changed
        #[arg(long)]
        force_version: bool,
        #[arg(long)]
        version_description: Option<String>,
    },

    /// Upload a build output directory as a new build version
    UploadBuild {
        #[arg(long)]
        software_name: Option<String>,
        /// Build output directory relative to the project (default: build)
        #[arg(long)]
        target_dir: Option<String>,
        #[arg(long)]
        version_description: Option<String>,
        #[arg(long, default_value = "index.html")]
        entry: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Initialize logging
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let project_dir = project_dir_or_cwd(cli.connection.project_dir.clone())?;
    let settings = ConnectionSettings::resolve(
        &ConnectionArgs {
            api_base_url: cli.connection.api_base_url.clone(),
            token: cli.connection.token.clone(),
            project_id: cli.connection.project_id,
            insecure_tls: cli.connection.insecure_tls,
        },
        &config.platform,
        &project_dir,
    )?;

    tracing::debug!(
        "project-sync v{} against {} (project {})",
        env!("CARGO_PKG_VERSION"),
        settings.api_base_url,
        settings.project_id
    );

    let client = PlatformClient::new(&settings.api_base_url, &settings.token, &settings.transport)?;
    let sync = config.sync.clone();
    let default_software = sync.software_name.clone();
    let ctx = ToolContext {
        client,
        project_id: settings.project_id,
        project_dir,
        sync,
    };

    match cli.command {
        Command::CreateFromTemplate {
            template_name,
            software_name,
            description,
            technology_stack,
        } => {
            let options = TemplateOptions {
                template_name,
                software_name: software_name.unwrap_or(default_software),
                description,
                technology_stack,
            };
            print_json(&create_from_template(&ctx, &options).await?)
        }
        Command::ListSoftwares { page_size } => {
            let page_size = page_size.unwrap_or(ctx.sync.pull_page_size);
            print_json(&list_softwares(&ctx, page_size).await?)
        }
        Command::Pull { mode, page_size } => {
            let options = PullOptions {
                mode,
                page_size: page_size.unwrap_or(ctx.sync.pull_page_size),
            };
            print_json(&pull(&ctx, &options).await?)
        }
        Command::Push {
            software_name,
            mode,
            max_files,
            force_version,
            version_description,
        } => {
            let options = PushOptions {
                software_name: software_name.unwrap_or(default_software),
                mode,
                max_files: max_files.unwrap_or(ctx.sync.max_push_files),
                force_version,
                version_description,
            };
            print_json(&push(&ctx, &options).await?)
        }
        Command::UploadBuild {
            software_name,
            target_dir,
            version_description,
            entry,
        } => {
            let options = BuildOptions {
                software_name: software_name.unwrap_or(default_software),
                target_dir,
                version_description,
                entry,
            };
            print_json(&upload_build(&ctx, &options).await?)
        }
    }
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
