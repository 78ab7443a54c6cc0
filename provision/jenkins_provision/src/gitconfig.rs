// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Writes the service account's global git configuration.

use crate::descriptor::forward_slashes;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Identity and policy written to the account's `.gitconfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitIdentity {
    /// `user.name`
    pub user_name: String,
    /// `user.email`
    pub user_email: String,
    /// `color.ui`
    pub color_ui: String,
    /// `pack.packSizeLimit`
    pub pack_size_limit: String,
    /// `sendemail.smtpserver`
    pub smtp_server: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self {
            user_name: "jenkins_master".into(),
            user_email: "jenkins_master@example.com".into(),
            color_ui: "auto".into(),
            pack_size_limit: "2g".into(),
            smtp_server: "smtp.example.com".into(),
        }
    }
}

/// The credential-helper invocation for the wincred helper shipped with the
/// Git install under `git_root`.
pub fn credential_helper(git_root: &Path) -> String {
    format!(
        "!\"{}/libexec/git-core/git-credential-wincred.exe\"",
        forward_slashes(git_root)
    )
}

/// Render the global git configuration document.
///
/// Build machines check out with fixed line endings, so `core.autocrlf` is
/// always off.
pub fn render_gitconfig(identity: &GitIdentity, credential_helper: &str) -> String {
    format!(
        "[user]\n\
         \tname = {name}\n\
         \temail = {email}\n\
         [core]\n\
         \tautocrlf = false\n\
         [credential]\n\
         \thelper = {helper}\n\
         [color]\n\
         \tui = {color}\n\
         [pack]\n\
         \tpackSizeLimit = {pack}\n\
         [sendemail]\n\
         \tsmtpserver = {smtp}\n",
        name = identity.user_name,
        email = identity.user_email,
        helper = credential_helper,
        color = identity.color_ui,
        pack = identity.pack_size_limit,
        smtp = identity.smtp_server,
    )
}

/// Write `.gitconfig` into the account's home directory.
pub fn write_gitconfig(
    home_dir: &Path,
    identity: &GitIdentity,
    credential_helper: &str,
) -> anyhow::Result<PathBuf> {
    let path = home_dir.join(".gitconfig");
    fs_err::write(&path, render_gitconfig(identity, credential_helper))?;
    tracing::info!(path = %path.display(), "wrote global git configuration");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gitconfig_document() {
        let helper = credential_helper(Path::new(r"C:\Program Files (x86)\Git"));
        let rendered = render_gitconfig(&GitIdentity::default(), &helper);
        let expected = concat!(
            "[user]\n",
            "\tname = jenkins_master\n",
            "\temail = jenkins_master@example.com\n",
            "[core]\n",
            "\tautocrlf = false\n",
            "[credential]\n",
            "\thelper = !\"C:/Program Files (x86)/Git/libexec/git-core/git-credential-wincred.exe\"\n",
            "[color]\n",
            "\tui = auto\n",
            "[pack]\n",
            "\tpackSizeLimit = 2g\n",
            "[sendemail]\n",
            "\tsmtpserver = smtp.example.com\n",
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn written_into_the_account_home() {
        let home = tempfile::tempdir().unwrap();
        let path = write_gitconfig(
            home.path(),
            &GitIdentity::default(),
            &credential_helper(Path::new("C:/Program Files (x86)/Git")),
        )
        .unwrap();
        assert_eq!(path, home.path().join(".gitconfig"));
        let contents = fs_err::read_to_string(path).unwrap();
        assert!(contents.contains("autocrlf = false"));
    }
}
