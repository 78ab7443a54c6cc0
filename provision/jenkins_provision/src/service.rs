// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registers the service wrapper as a Windows service bound to the
//! provisioned account, and wires up its event-log source.

use crate::account::Credential;
use crate::config::ServerSettings;
use anyhow::Context;
use powershell_builder as ps;
use powershell_builder::PowerShellBuilder;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use std::process::Command;

const PASSWORD_ENV: &str = "PROVISION_SVC_PASSWORD";

/// Service startup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StartupMode {
    /// Start with the OS
    Automatic,
    /// Start on demand
    Manual,
}

impl Display for StartupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupMode::Automatic => write!(f, "Automatic"),
            StartupMode::Manual => write!(f, "Manual"),
        }
    }
}

/// Build the `New-Service` invocation.
///
/// The generated password travels through the script's environment; the
/// visible command line carries only variable references.
fn new_service_command(server: &ServerSettings, credential: &Credential) -> Command {
    let secure = ps::Variable::new("securePassword");
    let ps_credential = ps::Variable::new("credential");
    // the `.\` prefix scopes the account to the local machine
    let run_as = format!(r".\{}", credential.username);

    PowerShellBuilder::new()
        .env(PASSWORD_ENV, &credential.password)
        .cmdlet_to_var("ConvertTo-SecureString", &secure)
        .positional(ps::env_ref(PASSWORD_ENV))
        .flag("AsPlainText")
        .flag("Force")
        .next()
        .cmdlet_to_var("New-Object", &ps_credential)
        .positional(ps::RawVal::new("pscredential"))
        .positional(ps::Array::new([
            ps::Value::new(run_as.as_str()),
            ps::Value::new(&secure),
        ]))
        .next()
        .cmdlet("New-Service")
        .arg("Name", &server.service_name)
        .arg("BinaryPathName", &server.wrapper_file())
        .arg("Credential", &ps_credential)
        .arg("DisplayName", &server.display_name)
        .arg("StartupType", ps::RawVal::new(server.startup_mode.to_string()))
        .finish()
        .build()
}

/// Register the service under the provisioned account.
pub fn register_service(server: &ServerSettings, credential: &Credential) -> anyhow::Result<()> {
    cmd_builder::run(new_service_command(server, credential))
        .with_context(|| format!("failed to register service {}", server.service_name))?;
    tracing::info!(
        service = server.service_name,
        startup_mode = %server.startup_mode,
        "registered service"
    );
    Ok(())
}

/// Register the service as an event-log source so it can emit log events
/// while running under the restricted account.
pub fn register_event_log_source(service_name: &str, message_file: &Path) -> anyhow::Result<()> {
    let key = format!(r"HKLM\SYSTEM\CurrentControlSet\Services\EventLog\Application\{service_name}");

    let mut message = Command::new("reg.exe");
    message
        .args(["add", &key, "/v", "EventMessageFile", "/t", "REG_EXPAND_SZ", "/d"])
        .arg(message_file)
        .arg("/f");
    cmd_builder::run(message).context("failed to register the event-log message file")?;

    let mut types = Command::new("reg.exe");
    types.args([
        "add",
        &key,
        "/v",
        "TypesSupported",
        "/t",
        "REG_DWORD",
        "/d",
        "7",
        "/f",
    ]);
    cmd_builder::run(types).context("failed to register the supported event types")?;

    tracing::info!(service = service_name, "registered event-log source");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn startup_mode_spells_like_the_cmdlet_expects() {
        assert_eq!(StartupMode::Automatic.to_string(), "Automatic");
        assert_eq!(StartupMode::Manual.to_string(), "Manual");
    }

    #[test]
    fn startup_mode_from_attributes() {
        assert_eq!(
            serde_json::from_str::<StartupMode>(r#""manual""#).unwrap(),
            StartupMode::Manual
        );
    }

    #[test]
    fn service_registration_binds_the_local_account() {
        let cfg = HostConfig::default();
        let credential = Credential {
            username: "jenkins_master".into(),
            password: "not-a-real-password".into(),
        };
        let cmd = new_service_command(&cfg.server, &credential);
        let args = args_of(&cmd);

        let startup = args.iter().position(|a| a == "-StartupType").unwrap();
        assert_eq!(args[startup + 1], "Automatic");
        assert!(args.contains(&r#"@(".\jenkins_master", $securePassword)"#.to_owned()));
        // the password reaches the script via its environment only
        assert!(args.iter().all(|a| !a.contains("not-a-real-password")));
    }
}
