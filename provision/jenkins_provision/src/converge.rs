// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The convergence run: sequences the provisioning steps against this host.
//!
//! Strictly sequential and fail-fast. There is no rollback; a failed run is
//! re-invoked from scratch and each step tolerates the state an earlier run
//! left behind.

use crate::account;
use crate::artifacts;
use crate::config::HostConfig;
use crate::descriptor;
use crate::gitconfig;
use crate::hostenv::HostEnv;
use crate::hostenv::SearchPath;
use crate::java_runtime;
use crate::machine_path;
use crate::package;
use crate::service;
use crate::service_logon;
use anyhow::Context;
use std::path::PathBuf;

/// Run-level options that are not host attributes.
#[derive(Debug, Clone, Default)]
pub struct ConvergeOptions {
    /// Persist the generated service-account credential to this path.
    ///
    /// Without it the password exists only in process memory, and a run
    /// interrupted after account creation strands the account.
    pub credential_out: Option<PathBuf>,
}

/// Converge this host into a running CI server host.
pub fn converge(cfg: &HostConfig, opts: &ConvergeOptions) -> anyhow::Result<()> {
    let env = HostEnv::capture();
    let mut search_path = SearchPath::from_env(&env);

    // account
    tracing::info!(phase = "account", username = cfg.account.username, "creating service account");
    let password = account::generate_password()?;
    let credential = account::create_service_account(&cfg.account.username, &password)?;
    if let Some(path) = &opts.credential_out {
        account::save_credential(path, &credential)?;
    }
    let home_dir = account::create_home_dir(&cfg.account.users_dir, &cfg.account.username)?;

    // service logon right
    tracing::info!(phase = "service-logon-right", "granting service logon right");
    let sid = account::account_sid(&cfg.account.username)?;
    service_logon::grant_service_logon_right(&cfg.scratch_dir, &sid)?;

    // dependency packages
    tracing::info!(phase = "dependencies", "installing dependency packages");
    let download_dir = cfg.server.work_dir.join("downloads");
    let seven_zip_exe = java_runtime::seven_zip_exe(&env);
    package::install(&cfg.seven_zip, &download_dir, Some(&seven_zip_exe))?;

    let git_root = env.program_files_x86().join("Git");
    let git_exe = git_root.join("Cmd").join("git.exe");
    package::install(&cfg.git.package, &download_dir, Some(&git_exe))?;

    // machine PATH
    tracing::info!(phase = "machine-path", "updating machine PATH");
    let git_cmd_dir = machine_path::git_cmd_dir(&env);
    machine_path::add_to_machine_path(&git_cmd_dir, &mut search_path)?;
    // resolve through the updated snapshot, not the ambient process PATH
    search_path
        .locate("git")
        .context("git is not resolvable after the PATH update")?;

    // java runtime
    tracing::info!(phase = "java-runtime", "unpacking java runtime");
    java_runtime::unpack(&cfg.java, &seven_zip_exe)?;

    // server artifacts
    tracing::info!(phase = "artifacts", "fetching server artifacts");
    artifacts::fetch_server_artifacts(&cfg.server)?;

    // configuration documents
    tracing::info!(phase = "descriptors", "writing configuration documents");
    descriptor::write_into(&cfg.server.work_dir, &cfg.server, &cfg.java)?;
    gitconfig::write_gitconfig(
        &home_dir,
        &cfg.git.identity,
        &gitconfig::credential_helper(&git_root),
    )?;

    // service registration
    tracing::info!(phase = "service-registration", "registering service");
    service::register_service(&cfg.server, &credential)?;
    service::register_event_log_source(&cfg.server.service_name, &cfg.server.wrapper_file())?;
    machine_path::set_machine_env_var(
        descriptor::HOME_ENV_VAR,
        &descriptor::forward_slashes(&cfg.server.work_dir),
    )?;

    tracing::info!(
        service = cfg.server.service_name,
        port = cfg.server.http_port,
        "host converged"
    );
    Ok(())
}
