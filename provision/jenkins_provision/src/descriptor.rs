// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Renders the configuration documents consumed by the service wrapper: the
//! service descriptor and the runtime-compatibility config.
//!
//! Rendering is pure so the output can be golden-tested; writing the files
//! is a separate, thin step.

use crate::config::JavaSettings;
use crate::config::ServerSettings;
use std::path::Path;
use std::path::PathBuf;

/// Environment variable the server reads its home directory from.
pub const HOME_ENV_VAR: &str = "JENKINS_HOME";

/// Everything the service-descriptor document is rendered from.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Service id; also the base name of the wrapper executable
    pub id: String,
    /// Service display name
    pub name: String,
    /// Service description
    pub description: String,
    /// Launched executable (the Java runtime)
    pub executable: String,
    /// JVM maximum heap
    pub max_heap: String,
    /// Server package file name, resolved against the service base directory
    pub war_file_name: String,
    /// HTTP listening port
    pub http_port: u16,
}

impl ServiceDescriptor {
    /// Build the descriptor from the attribute data.
    pub fn from_config(server: &ServerSettings, java: &JavaSettings) -> Self {
        Self {
            id: server.service_name.clone(),
            name: server.display_name.clone(),
            description: server.description.clone(),
            executable: forward_slashes(&java.install_dir.join(&java.java_exe_rel_path)),
            max_heap: server.java_max_heap.clone(),
            war_file_name: "jenkins.war".into(),
            http_port: server.http_port,
        }
    }

    /// The launch argument string.
    pub fn arguments(&self) -> String {
        format!(
            "-Xrs -Xmx{heap} -Dhudson.lifecycle=hudson.lifecycle.WindowsServiceLifecycle -jar \"%BASE%/{war}\" --httpPort={port}",
            heap = self.max_heap,
            war = self.war_file_name,
            port = self.http_port,
        )
    }

    /// Render the service-descriptor document.
    pub fn render_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0"?>
<!--
    Windows service definition for {name}. To uninstall, run "{id}.exe stop" to stop the
    service, then "{id}.exe uninstall" to uninstall it. Neither command produces output
    when it succeeds.
-->
<service>
    <id>{id}</id>
    <name>{name}</name>
    <description>{description}</description>
    <env name="{home_var}" value="%BASE%"/>

    <executable>{executable}</executable>
    <arguments>{arguments}</arguments>

    <logmode>rotate</logmode>
    <onfailure action="restart"/>
</service>
"#,
            id = self.id,
            name = self.name,
            description = self.description,
            home_var = HOME_ENV_VAR,
            executable = self.executable,
            arguments = self.arguments(),
        )
    }
}

/// Render the wrapper's runtime-compatibility config. No variable content.
pub fn render_runtime_config() -> String {
    r#"<configuration>
    <runtime>
        <generatePublisherEvidence enabled="false"/>
    </runtime>
    <startup>
        <supportedRuntime version="v4.0" />
        <supportedRuntime version="v2.0.50727" />
    </startup>
</configuration>
"#
    .to_owned()
}

/// Write the two documents next to the wrapper executable: `<id>.xml` and
/// `<id>.exe.config`.
pub fn write_into(
    dir: &Path,
    server: &ServerSettings,
    java: &JavaSettings,
) -> anyhow::Result<Vec<PathBuf>> {
    fs_err::create_dir_all(dir)?;
    let descriptor = ServiceDescriptor::from_config(server, java);

    let xml = dir.join(format!("{}.xml", descriptor.id));
    fs_err::write(&xml, descriptor.render_xml())?;

    let config = dir.join(format!("{}.exe.config", descriptor.id));
    fs_err::write(&config, render_runtime_config())?;

    tracing::info!(dir = %dir.display(), "wrote service configuration documents");
    Ok(vec![xml, config])
}

/// Render a path with forward slashes regardless of host platform, keeping
/// generated documents byte-stable.
pub(crate) fn forward_slashes(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use expect_test::expect;

    #[test]
    fn descriptor_document_at_port_8080() {
        let cfg = HostConfig::default();
        let descriptor = ServiceDescriptor::from_config(&cfg.server, &cfg.java);
        let rendered = descriptor.render_xml();
        expect![[r#"
            <?xml version="1.0"?>
            <!--
                Windows service definition for Jenkins. To uninstall, run "jenkins.exe stop" to stop the
                service, then "jenkins.exe uninstall" to uninstall it. Neither command produces output
                when it succeeds.
            -->
            <service>
                <id>jenkins</id>
                <name>Jenkins</name>
                <description>This service runs the Jenkins continuous integration system.</description>
                <env name="JENKINS_HOME" value="%BASE%"/>

                <executable>C:/java/jdk1.8.0_25/bin/java.exe</executable>
                <arguments>-Xrs -Xmx512m -Dhudson.lifecycle=hudson.lifecycle.WindowsServiceLifecycle -jar "%BASE%/jenkins.war" --httpPort=8080</arguments>

                <logmode>rotate</logmode>
                <onfailure action="restart"/>
            </service>
        "#]]
        .assert_eq(&rendered);

        // the TLS variant stays inert: no keystore arguments leak into the
        // rendered document
        assert!(!rendered.contains("https"));
        assert!(!rendered.contains("KeyStore"));
    }

    #[test]
    fn port_is_interpolated() {
        let mut cfg = HostConfig::default();
        cfg.server.http_port = 9090;
        let descriptor = ServiceDescriptor::from_config(&cfg.server, &cfg.java);
        assert!(descriptor.arguments().ends_with("--httpPort=9090"));
    }

    #[test]
    fn runtime_config_document() {
        expect![[r#"
            <configuration>
                <runtime>
                    <generatePublisherEvidence enabled="false"/>
                </runtime>
                <startup>
                    <supportedRuntime version="v4.0" />
                    <supportedRuntime version="v2.0.50727" />
                </startup>
            </configuration>
        "#]]
        .assert_eq(&render_runtime_config());
    }

    #[test]
    fn documents_are_written_next_to_the_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HostConfig::default();
        let written = write_into(dir.path(), &cfg.server, &cfg.java).unwrap();
        assert_eq!(
            written,
            [
                dir.path().join("jenkins.xml"),
                dir.path().join("jenkins.exe.config")
            ]
        );
        for path in written {
            assert!(path.is_file());
        }
    }
}
