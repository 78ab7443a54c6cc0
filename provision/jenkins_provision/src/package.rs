// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Silent installation of dependency packages from fixed download URLs.

use crate::download;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::process::Command;

/// How a package's installer expects to be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallerKind {
    /// Windows Installer package, driven through `msiexec.exe`
    Msi,
    /// Inno-style self-extracting installer executable
    Inno,
}

/// A dependency package: where to get it and how to install it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDescriptor {
    /// Human-readable package name, used in logs
    pub display_name: String,
    /// Installer download URL
    pub url: String,
    /// Expected SHA-256 of the installer, verified before install when set
    #[serde(default)]
    pub sha256: Option<String>,
    /// Installer flavor
    pub installer: InstallerKind,
}

/// Silent-install arguments for each installer flavor.
pub fn silent_install_args(kind: InstallerKind) -> &'static [&'static str] {
    match kind {
        InstallerKind::Msi => &["/qn", "/norestart"],
        InstallerKind::Inno => &["/VERYSILENT", "/NORESTART", "/SUPPRESSMSGBOXES"],
    }
}

/// Download and silently install a package.
///
/// When `sentinel` names a path that already exists the package is treated
/// as installed and the step is a no-op. A declared checksum is verified
/// before the installer is invoked; a mismatch fails the run without
/// installing anything. Returns whether an install actually ran.
pub fn install(
    pkg: &PackageDescriptor,
    download_dir: &Path,
    sentinel: Option<&Path>,
) -> anyhow::Result<bool> {
    if let Some(sentinel) = sentinel {
        if sentinel.exists() {
            tracing::info!(
                package = pkg.display_name,
                sentinel = %sentinel.display(),
                "package already installed, skipping"
            );
            return Ok(false);
        }
    }

    let file_name = download::file_name_from_url(&pkg.url)?;
    let installer = download_dir.join(file_name);
    download::fetch(&pkg.url, &installer, pkg.sha256.as_deref())?;

    let mut cmd = match pkg.installer {
        InstallerKind::Msi => {
            let mut cmd = Command::new("msiexec.exe");
            cmd.arg("/i").arg(&installer);
            cmd
        }
        InstallerKind::Inno => Command::new(&installer),
    };
    cmd.args(silent_install_args(pkg.installer));

    cmd_builder::run(cmd)
        .map_err(|err| anyhow::anyhow!("failed to install {}: {err}", pkg.display_name))?;
    tracing::info!(package = pkg.display_name, "installed package");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installer_kinds_run_silently() {
        assert_eq!(silent_install_args(InstallerKind::Msi), ["/qn", "/norestart"]);
        assert_eq!(
            silent_install_args(InstallerKind::Inno),
            ["/VERYSILENT", "/NORESTART", "/SUPPRESSMSGBOXES"]
        );
    }

    #[test]
    fn existing_sentinel_skips_the_install() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = dir.path().join("7z.exe");
        fs_err::write(&sentinel, b"").unwrap();

        let pkg = PackageDescriptor {
            display_name: "7-Zip 9.35 (x64 edition)".into(),
            url: "http://127.0.0.1:1/unreachable.msi".into(),
            sha256: None,
            installer: InstallerKind::Msi,
        };
        // never touches the network: the sentinel short-circuits
        let ran = install(&pkg, dir.path(), Some(&sentinel)).unwrap();
        assert!(!ran);
    }

    #[test]
    fn descriptor_round_trips_through_attributes() {
        let json = r#"{
            "display_name": "Git version 1.9.5-preview20141217",
            "url": "https://example.com/Git-1.9.5.exe",
            "sha256": "d7e78da2251a35acd14a932280689c57ff9499a474a448ae86e6c43b882692dd",
            "installer": "inno"
        }"#;
        let pkg: PackageDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(pkg.installer, InstallerKind::Inno);
        assert!(pkg.sha256.is_some());
    }
}
