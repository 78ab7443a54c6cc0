// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Grants an account the right to log on as a service.
//!
//! The local security policy database has no command-line API for editing a
//! single privilege in place, so the grant goes through an export/patch/
//! import cycle: export the current policy with `secedit.exe`, extract the
//! principal list for `SeServiceLogonRight` from the exported text, and
//! import a minimal template that re-declares the right with the new SID
//! appended. The brittle text handling is confined to this module; callers
//! see only [`grant_service_logon_right`].

use anyhow::Context;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

/// The privilege an account needs to back a registered service.
pub const SERVICE_LOGON_RIGHT: &str = "SeServiceLogonRight";

/// Temp files used by one export/patch/import cycle.
struct PolicyScratch {
    export: PathBuf,
    import: PathBuf,
    db: PathBuf,
}

impl PolicyScratch {
    fn new(dir: &Path) -> Self {
        Self {
            export: dir.join("export.inf"),
            import: dir.join("import.inf"),
            db: dir.join("secedt.sdb"),
        }
    }

    /// Remove leftovers of a prior failed run.
    fn clear_stale(&self) -> anyhow::Result<()> {
        for path in [&self.export, &self.import, &self.db] {
            if path.exists() {
                fs_err::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Grant `SeServiceLogonRight` to the account with the given SID.
///
/// Idempotent: a SID that already holds the right is left alone rather than
/// duplicated, and the policy database is not touched.
pub fn grant_service_logon_right(scratch_dir: &Path, sid: &str) -> anyhow::Result<()> {
    fs_err::create_dir_all(scratch_dir)?;
    let scratch = PolicyScratch::new(scratch_dir);
    scratch.clear_stale()?;

    let mut export = Command::new("secedit.exe");
    export.arg("/export").arg("/cfg").arg(&scratch.export);
    cmd_builder::run(export).context("failed to export the local security policy")?;

    let text = decode_policy_text(&fs_err::read(&scratch.export)?);
    let principals = principals_for_right(&text, SERVICE_LOGON_RIGHT).with_context(|| {
        format!("{SERVICE_LOGON_RIGHT} not found in the exported security policy")
    })?;

    let Some(extended) = with_principal(&principals, sid) else {
        tracing::info!(sid, "service logon right already granted");
        return Ok(());
    };

    let template = render_policy_template(SERVICE_LOGON_RIGHT, &extended);
    write_utf16le(&scratch.import, &template)?;

    let mut import = Command::new("secedit.exe");
    import
        .arg("/import")
        .arg("/db")
        .arg(&scratch.db)
        .arg("/cfg")
        .arg(&scratch.import);
    cmd_builder::run(import).context("failed to import the patched security template")?;

    let mut configure = Command::new("secedit.exe");
    configure.arg("/configure").arg("/db").arg(&scratch.db);
    cmd_builder::run(configure).context("failed to apply the patched security template")?;

    let mut refresh = Command::new("gpupdate.exe");
    refresh.arg("/force");
    cmd_builder::run(refresh).context("failed to refresh the local policy")?;

    tracing::info!(sid, "granted service logon right");
    Ok(())
}

/// Decode a policy export. `secedit /export` writes UTF-16LE with a BOM;
/// fall back to lossy UTF-8 for exports produced differently.
pub fn decode_policy_text(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Extract the principal list declared for `right` in exported policy text.
///
/// Returns `None` when the export carries no line for the right.
pub fn principals_for_right(export: &str, right: &str) -> Option<Vec<String>> {
    export.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if key.trim() != right {
            return None;
        }
        Some(
            value
                .split(',')
                .map(|principal| principal.trim().to_owned())
                .filter(|principal| !principal.is_empty())
                .collect(),
        )
    })
}

/// Extend the principal list with `*<sid>`.
///
/// Returns `None` when the SID is already present, so a repeated grant never
/// duplicates the entry.
pub fn with_principal(principals: &[String], sid: &str) -> Option<Vec<String>> {
    let entry = format!("*{sid}");
    if principals
        .iter()
        .any(|principal| principal.eq_ignore_ascii_case(&entry))
    {
        return None;
    }
    let mut extended = principals.to_vec();
    extended.push(entry);
    Some(extended)
}

/// Render the minimal security template declaring `right` for `principals`.
pub fn render_policy_template(right: &str, principals: &[String]) -> String {
    let lines = [
        "[Unicode]".to_owned(),
        "Unicode=yes".to_owned(),
        "[System Access]".to_owned(),
        "[Event Audit]".to_owned(),
        "[Registry Values]".to_owned(),
        "[Version]".to_owned(),
        "signature=\"$CHICAGO$\"".to_owned(),
        "Revision=1".to_owned(),
        "[Profile Description]".to_owned(),
        "Description=GrantLogOnAsAService security template".to_owned(),
        "[Privilege Rights]".to_owned(),
        format!("{right} = {}", principals.join(",")),
    ];
    let mut template = lines.join("\r\n");
    template.push_str("\r\n");
    template
}

/// The template declares `Unicode=yes`, so write it as it says: UTF-16LE
/// with a BOM.
fn write_utf16le(path: &Path, contents: &str) -> anyhow::Result<()> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in contents.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs_err::write(path, bytes)?;
    Ok(())
}
