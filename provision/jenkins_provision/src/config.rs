// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Static attribute data driving a convergence run.
//!
//! Built-in defaults cover a stock deployment; a JSON attribute file can
//! override any subset of them.

use crate::gitconfig::GitIdentity;
use crate::package::InstallerKind;
use crate::package::PackageDescriptor;
use crate::service::StartupMode;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;

/// Top-level attribute table for one host.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Service account settings
    pub account: AccountSettings,
    /// 7-Zip package
    pub seven_zip: PackageDescriptor,
    /// Git package and global configuration
    pub git: GitSettings,
    /// Java runtime staging and install locations
    pub java: JavaSettings,
    /// CI server artifacts and service settings
    pub server: ServerSettings,
    /// Scratch directory for security-policy temp files
    pub scratch_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            account: AccountSettings::default(),
            seven_zip: PackageDescriptor {
                display_name: "7-Zip 9.35 (x64 edition)".into(),
                url: "http://downloads.sourceforge.net/project/sevenzip/7-Zip/9.35/7z935.msi"
                    .into(),
                sha256: None,
                installer: InstallerKind::Msi,
            },
            git: GitSettings::default(),
            java: JavaSettings::default(),
            server: ServerSettings::default(),
            scratch_dir: "C:/logs".into(),
        }
    }
}

impl HostConfig {
    /// Load the attribute table, overlaying the JSON file at `path` (when
    /// given) over the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs_err::read_to_string(path)?;
        serde_json::from_str(&contents)
            .with_context(|| format!("invalid attribute file {}", path.display()))
    }
}

/// Dedicated service account for the CI server process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountSettings {
    /// Local account name
    pub username: String,
    /// Directory holding per-user home directories
    pub users_dir: PathBuf,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            username: "jenkins_master".into(),
            users_dir: "C:/Users".into(),
        }
    }
}

/// Git package plus the global configuration written for the service
/// account.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitSettings {
    /// Installed version, as reported by `git --version`
    pub version: String,
    /// Installer package
    pub package: PackageDescriptor,
    /// Identity written to the account's global git configuration
    pub identity: GitIdentity,
}

impl Default for GitSettings {
    fn default() -> Self {
        let version = "1.9.5-preview20141217";
        Self {
            version: version.into(),
            package: PackageDescriptor {
                display_name: format!("Git version {version}"),
                url: format!(
                    "https://github.com/msysgit/msysgit/releases/download/Git-{version}/Git-{version}.exe"
                ),
                sha256: Some(
                    "d7e78da2251a35acd14a932280689c57ff9499a474a448ae86e6c43b882692dd".into(),
                ),
                installer: InstallerKind::Inno,
            },
            identity: GitIdentity::default(),
        }
    }
}

/// Java runtime unpack settings.
///
/// The compressed runtime is expected to be staged on the host before the
/// run; it is not downloaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JavaSettings {
    /// Directory the runtime archive is staged in
    pub staging_dir: PathBuf,
    /// File name of the staged outer archive
    pub archive_name: String,
    /// Name of the archive nested inside the outer archive
    pub inner_archive_name: String,
    /// Final runtime install directory
    pub install_dir: PathBuf,
    /// Path of `java.exe` relative to the install directory
    pub java_exe_rel_path: PathBuf,
}

impl Default for JavaSettings {
    fn default() -> Self {
        Self {
            staging_dir: "C:/configuration".into(),
            archive_name: "server-jre-8u25-windows-x64.gz".into(),
            inner_archive_name: "server-jre-8u25-windows-x64".into(),
            install_dir: "C:/java".into(),
            java_exe_rel_path: "jdk1.8.0_25/bin/java.exe".into(),
        }
    }
}

/// CI server artifacts, service identity, and launch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Working directory; becomes the server's home directory
    pub work_dir: PathBuf,
    /// Server package download URL
    pub war_url: String,
    /// Expected SHA-256 of the server package, verified when set
    pub war_sha256: Option<String>,
    /// Service-wrapper executable download URL
    pub wrapper_url: String,
    /// Expected SHA-256 of the service wrapper, verified when set
    pub wrapper_sha256: Option<String>,
    /// Service name registered with the service manager
    pub service_name: String,
    /// Service display name
    pub display_name: String,
    /// Service description
    pub description: String,
    /// HTTP listening port
    pub http_port: u16,
    /// JVM maximum heap (`-Xmx` value)
    pub java_max_heap: String,
    /// Service startup mode
    pub startup_mode: StartupMode,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            work_dir: "C:/ci".into(),
            war_url: "http://mirrors.jenkins-ci.org/war/1.595/jenkins.war".into(),
            war_sha256: None,
            wrapper_url:
                "http://repo.jenkins-ci.org/releases/com/sun/winsw/winsw/1.16/winsw-1.16-bin.exe"
                    .into(),
            wrapper_sha256: None,
            service_name: "jenkins".into(),
            display_name: "Jenkins".into(),
            description: "This service runs the Jenkins continuous integration system.".into(),
            http_port: 8080,
            java_max_heap: "512m".into(),
            startup_mode: StartupMode::Automatic,
        }
    }
}

impl ServerSettings {
    /// Path the server package is downloaded to.
    pub fn war_file(&self) -> PathBuf {
        self.work_dir.join("jenkins.war")
    }

    /// Path the service wrapper is downloaded to.
    ///
    /// The wrapper is renamed after the service so the service manager and
    /// event log show a recognizable binary.
    pub fn wrapper_file(&self) -> PathBuf {
        self.work_dir.join(format!("{}.exe", self.service_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_consistent() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.server.http_port, 8080);
        assert_eq!(cfg.server.wrapper_file(), PathBuf::from("C:/ci/jenkins.exe"));
        assert!(cfg.git.package.sha256.is_some());
        assert!(cfg.server.war_sha256.is_none());
    }

    #[test]
    fn attribute_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{ "server": { "http_port": 9090, "startup_mode": "manual" } }"#,
        )
        .unwrap();

        let cfg = HostConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.server.http_port, 9090);
        assert_eq!(cfg.server.startup_mode, StartupMode::Manual);
        // untouched fields keep their defaults
        assert_eq!(cfg.account.username, "jenkins_master");
        assert_eq!(cfg.server.work_dir, PathBuf::from("C:/ci"));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "srever": {} }"#).unwrap();
        assert!(HostConfig::load(Some(file.path())).is_err());
    }
}
