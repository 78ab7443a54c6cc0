// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Creates the dedicated local account the CI server service runs under.

use anyhow::Context;
use powershell_builder as ps;
use powershell_builder::PowerShellBuilder;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Environment variable the generated password is handed to scripts
/// through, keeping it off visible command lines.
const PASSWORD_ENV: &str = "PROVISION_SVC_PASSWORD";

/// A local account credential.
///
/// The password exists only for the duration of the run unless the caller
/// persists it with [`save_credential`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Local account name
    pub username: String,
    /// Generated password
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh random password in UUID v4 format.
///
/// The host's password-complexity policy is not consulted; a policy that
/// rejects 36-character alphanumeric passwords will fail account creation.
pub fn generate_password() -> anyhow::Result<String> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes)
        .map_err(|err| anyhow::anyhow!("failed to gather entropy for password: {err}"))?;
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let h = hex::encode(bytes);
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &h[..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..]
    ))
}

/// Create an enabled local account with the given password.
///
/// Fails if the account already exists; there is no rename or retry.
pub fn create_service_account(username: &str, password: &str) -> anyhow::Result<Credential> {
    let secure = ps::Variable::new("securePassword");
    let cmd = PowerShellBuilder::new()
        .env(PASSWORD_ENV, password)
        .cmdlet_to_var("ConvertTo-SecureString", &secure)
        .positional(ps::env_ref(PASSWORD_ENV))
        .flag("AsPlainText")
        .flag("Force")
        .next()
        .cmdlet("New-LocalUser")
        .arg("Name", username)
        .arg("Password", &secure)
        .flag("PasswordNeverExpires")
        .flag("AccountNeverExpires")
        .pipeline()
        .cmdlet("Out-Null")
        .finish()
        .build();

    cmd_builder::run(cmd).with_context(|| format!("failed to create local account {username}"))?;
    tracing::info!(username, "created service account");

    Ok(Credential {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

/// Resolve the SID of a local account.
pub fn account_sid(username: &str) -> anyhow::Result<String> {
    let account = ps::Variable::new("account");
    let cmd = PowerShellBuilder::new()
        .cmdlet_to_var("New-Object", &account)
        .positional(ps::RawVal::new("System.Security.Principal.NTAccount"))
        .positional(username)
        .next()
        .cmdlet("Write-Output")
        .positional(ps::Expression::new(
            "$account.Translate([System.Security.Principal.SecurityIdentifier]).Value",
        ))
        .finish()
        .build();

    let sid = cmd_builder::output_of(cmd, true)
        .with_context(|| format!("failed to resolve the SID of {username}"))?;
    if sid.is_empty() {
        anyhow::bail!("SID lookup for {username} produced no output");
    }
    Ok(sid)
}

/// Create the account's home directory (and the users directory itself, on a
/// host that does not have one yet). Returns the home directory path.
pub fn create_home_dir(users_dir: &Path, username: &str) -> anyhow::Result<PathBuf> {
    let home = users_dir.join(username);
    fs_err::create_dir_all(&home)?;
    Ok(home)
}

/// Persist the credential as JSON so an interrupted run does not strand the
/// account with an unknowable password.
pub fn save_credential(path: &Path, credential: &Credential) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(credential)?;
    fs_err::write(path, json)?;
    tracing::info!(path = %path.display(), "persisted service account credential");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_has_uuid_shape() {
        let password = generate_password().unwrap();
        assert_eq!(password.len(), 36);
        for (i, c) in password.chars().enumerate() {
            match i {
                8 | 13 | 18 | 23 => assert_eq!(c, '-'),
                14 => assert_eq!(c, '4'),
                _ => assert!(c.is_ascii_hexdigit()),
            }
        }
    }

    #[test]
    fn passwords_are_unique_per_run() {
        assert_ne!(generate_password().unwrap(), generate_password().unwrap());
    }

    #[test]
    fn debug_redacts_password() {
        let credential = Credential {
            username: "jenkins_master".into(),
            password: "secret".into(),
        };
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("jenkins_master"));
    }

    #[test]
    fn home_dir_under_users_dir() {
        let dir = tempfile::tempdir().unwrap();
        let home = create_home_dir(dir.path(), "jenkins_master").unwrap();
        assert!(home.is_dir());
        assert_eq!(home, dir.path().join("jenkins_master"));
    }
}
