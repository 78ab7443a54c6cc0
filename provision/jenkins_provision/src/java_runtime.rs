// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Unpacks the pre-staged Java runtime archive into its install directory.
//!
//! The runtime ships as a compressed archive wrapping an inner archive; both
//! layers are extracted with 7-Zip. The outer archive must be staged on the
//! host before the run; it is deliberately not downloaded here.

use crate::config::JavaSettings;
use crate::hostenv::HostEnv;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

/// Path of the 7-Zip executable installed by the dependency step.
pub fn seven_zip_exe(env: &HostEnv) -> PathBuf {
    env.program_files().join("7-Zip").join("7z.exe")
}

/// Fail with an error naming the missing path.
pub fn require_exists(path: &Path, what: &str) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("could not locate {what} at {}", path.display());
    }
    Ok(())
}

fn extract(seven_zip: &Path, archive: &Path, dest: &Path) -> anyhow::Result<()> {
    let mut cmd = Command::new(seven_zip);
    cmd.arg("x")
        .arg("-y")
        .arg(format!("-o{}", dest.display()))
        .arg(archive);
    cmd_builder::run(cmd)
        .map_err(|err| anyhow::anyhow!("failed to extract {}: {err}", archive.display()))
}

/// Extract the staged runtime into its install directory, replacing any
/// previous install.
///
/// Not transactional: a failure partway can leave a partially extracted
/// install directory, and the whole run is expected to be re-invoked.
pub fn unpack(java: &JavaSettings, seven_zip: &Path) -> anyhow::Result<()> {
    let outer = java.staging_dir.join(&java.archive_name);
    require_exists(&outer, "staged java runtime archive")?;

    let extract_dir = java.staging_dir.join("extract");
    extract(seven_zip, &outer, &extract_dir)?;

    let inner = extract_dir.join(&java.inner_archive_name);
    require_exists(&inner, "inner java runtime archive")?;

    if java.install_dir.exists() {
        fs_err::remove_dir_all(&java.install_dir)?;
    }
    extract(seven_zip, &inner, &java.install_dir)?;

    tracing::info!(install_dir = %java.install_dir.display(), "unpacked java runtime");
    Ok(())
}
