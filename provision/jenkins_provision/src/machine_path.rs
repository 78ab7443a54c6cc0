// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Machine-scoped environment updates: the persistent PATH entry for Git,
//! and other machine-level variables.

use crate::hostenv::HostEnv;
use crate::hostenv::SearchPath;
use anyhow::Context;
use powershell_builder as ps;
use powershell_builder::PowerShellBuilder;
use std::path::Path;
use std::path::PathBuf;

const VALUE_ENV: &str = "PROVISION_ENV_VALUE";

/// The directory Git's command shims are installed to.
///
/// Git installs under the x86 program-files root on 64-bit hosts and under
/// the native root on 32-bit hosts.
pub fn git_cmd_dir(env: &HostEnv) -> PathBuf {
    env.program_files_x86().join("Git").join("Cmd")
}

/// Append `entry` to a PATH-style value unless an equal entry (ignoring
/// case and a trailing separator) is already present.
pub fn append_path_entry(current: &str, entry: &str) -> Option<String> {
    let normalize = |e: &str| e.trim().trim_end_matches(['\\', '/']).to_ascii_lowercase();
    let entry_norm = normalize(entry);
    if current
        .split(';')
        .any(|existing| normalize(existing) == entry_norm)
    {
        return None;
    }
    if current.is_empty() {
        Some(entry.to_owned())
    } else {
        Some(format!("{};{entry}", current.trim_end_matches(';')))
    }
}

/// Read a machine-scoped environment variable from the registry-backed
/// store.
pub fn machine_env_var(name: &str) -> anyhow::Result<String> {
    let cmd = PowerShellBuilder::new()
        .cmdlet("Write-Output")
        .positional(ps::Expression::new(format!(
            "[Environment]::GetEnvironmentVariable(\"{name}\", \"Machine\")"
        )))
        .finish()
        .build();
    cmd_builder::output_of(cmd, true)
        .with_context(|| format!("failed to read machine environment variable {name}"))
}

/// Persist a machine-scoped environment variable.
///
/// The value travels via the script's environment, sidestepping command-line
/// quoting of paths and separators.
pub fn set_machine_env_var(name: &str, value: &str) -> anyhow::Result<()> {
    let cmd = PowerShellBuilder::new()
        .env(VALUE_ENV, value)
        .cmdlet("Write-Output")
        .positional(ps::Expression::new(format!(
            "[Environment]::SetEnvironmentVariable(\"{name}\", $env:{VALUE_ENV}, \"Machine\")"
        )))
        .finish()
        .build();
    cmd_builder::run(cmd)
        .with_context(|| format!("failed to set machine environment variable {name}"))
}

/// Add `entry` to the persistent machine PATH, then, only once the change
/// is confirmed, extend this run's search path so later steps resolve the
/// newly installed tools.
///
/// Returns whether the machine PATH changed.
pub fn add_to_machine_path(entry: &Path, search_path: &mut SearchPath) -> anyhow::Result<bool> {
    let entry_str = entry.to_str().context("PATH entry is not valid unicode")?;
    let current = machine_env_var("Path")?;

    let Some(updated) = append_path_entry(&current, entry_str) else {
        tracing::info!(entry = entry_str, "machine PATH already contains entry");
        return Ok(false);
    };

    set_machine_env_var("Path", &updated)?;
    // the persistent change landed; now (and only now) mirror it into the
    // run's explicit search path
    search_path.push(entry);
    tracing::info!(entry = entry_str, "appended entry to machine PATH");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostenv::HostEnv;

    #[test]
    fn git_dir_follows_the_x86_root() {
        let env = HostEnv::from_vars([
            ("ProgramFiles".to_owned(), r"C:\Program Files".to_owned()),
            (
                "ProgramFiles(x86)".to_owned(),
                r"C:\Program Files (x86)".to_owned(),
            ),
        ]);
        assert_eq!(
            git_cmd_dir(&env),
            PathBuf::from(r"C:\Program Files (x86)\Git\Cmd")
        );
    }

    #[test]
    fn append_skips_existing_entry() {
        let current = r"C:\Windows\system32;C:\Program Files (x86)\Git\Cmd";
        assert_eq!(
            append_path_entry(current, r"c:\program files (x86)\git\cmd\"),
            None
        );
    }

    #[test]
    fn append_extends_with_separator() {
        assert_eq!(
            append_path_entry(r"C:\Windows\system32", r"C:\Program Files (x86)\Git\Cmd").unwrap(),
            r"C:\Windows\system32;C:\Program Files (x86)\Git\Cmd"
        );
        // a trailing separator in the stored value does not double up
        assert_eq!(
            append_path_entry(r"C:\Windows\system32;", r"C:\Git\Cmd").unwrap(),
            r"C:\Windows\system32;C:\Git\Cmd"
        );
    }

    #[test]
    fn append_to_empty_path() {
        assert_eq!(
            append_path_entry("", r"C:\Git\Cmd").unwrap(),
            r"C:\Git\Cmd"
        );
    }
}
