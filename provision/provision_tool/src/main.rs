// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! CLI for converging a Windows host into a Jenkins CI server.

use clap::Parser;
use clap::Subcommand;
use jenkins_provision::config::HostConfig;
use jenkins_provision::converge::converge;
use jenkins_provision::converge::ConvergeOptions;
use jenkins_provision::descriptor;
use jenkins_provision::gitconfig;
use jenkins_provision::hostenv::HostEnv;
use jenkins_provision::service::StartupMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provision-tool", about = "Provision a Jenkins CI server host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge this host: account, dependencies, runtime, artifacts,
    /// configuration, service registration.
    Converge(ConvergeArgs),
    /// Render the generated configuration documents without touching the
    /// host.
    Render(RenderArgs),
}

#[derive(clap::Args)]
struct ConvergeArgs {
    /// JSON attribute file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Service startup mode
    #[arg(long)]
    startup_mode: Option<StartupMode>,
    /// HTTP listening port
    #[arg(long)]
    http_port: Option<u16>,
    /// Server working directory
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Directory the java runtime archive is staged in
    #[arg(long)]
    staging_dir: Option<PathBuf>,
    /// Persist the generated service-account credential to this path
    #[arg(long)]
    credential_out: Option<PathBuf>,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// JSON attribute file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory the documents are written into
    #[arg(long)]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Converge(args) => {
            let mut cfg = HostConfig::load(args.config.as_deref())?;
            if let Some(startup_mode) = args.startup_mode {
                cfg.server.startup_mode = startup_mode;
            }
            if let Some(http_port) = args.http_port {
                cfg.server.http_port = http_port;
            }
            if let Some(work_dir) = args.work_dir {
                cfg.server.work_dir = work_dir;
            }
            if let Some(staging_dir) = args.staging_dir {
                cfg.java.staging_dir = staging_dir;
            }
            let opts = ConvergeOptions {
                credential_out: args.credential_out,
            };
            converge(&cfg, &opts)
        }
        Commands::Render(args) => {
            let cfg = HostConfig::load(args.config.as_deref())?;
            let git_root = HostEnv::capture().program_files_x86().join("Git");
            let written = descriptor::write_into(&args.out_dir, &cfg.server, &cfg.java)?;
            let gitconfig_path = gitconfig::write_gitconfig(
                &args.out_dir,
                &cfg.git.identity,
                &gitconfig::credential_helper(&git_root),
            )?;
            for path in written.iter().chain([&gitconfig_path]) {
                tracing::info!(path = %path.display(), "rendered");
            }
            Ok(())
        }
    }
}
