// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Helpers for running host administration commands
//! (`powershell.exe`, `secedit.exe`, `reg.exe`, installers) and capturing
//! their output.

#![forbid(unsafe_code)]

use std::ffi::OsStr;
use std::process::Command;
use std::process::Stdio;
use thiserror::Error;

/// Error running a host command
#[derive(Error, Debug)]
pub enum CommandError {
    /// failed to launch the command
    #[error("failed to launch {0}")]
    Launch(String, #[source] std::io::Error),
    /// command exited with non-zero status
    #[error("{0} exited with non-zero status ({1}): {2}")]
    Exit(String, std::process::ExitStatus, String),
    /// command output is not utf-8
    #[error("{0} produced non-utf-8 output")]
    Utf8(String, #[source] std::string::FromUtf8Error),
}

/// Run the command and return its trimmed stdout.
///
/// stdout is only logged when `log_stdout` is set (or on failure), so callers
/// can suppress output that embeds secrets.
pub fn output_of(mut cmd: Command, log_stdout: bool) -> Result<String, CommandError> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());

    let cmd_str = cmd_to_string(&cmd);
    tracing::debug!(cmd_str, "executing command");

    let start = jiff::Timestamp::now();
    let output = cmd
        .output()
        .map_err(|err| CommandError::Launch(program_of(&cmd), err))?;
    let time_elapsed = jiff::Timestamp::now() - start;

    let stderr_str = String::from_utf8_lossy(&output.stderr).to_string();
    let stdout_str = (log_stdout || !output.status.success())
        .then(|| String::from_utf8_lossy(&output.stdout).to_string());
    tracing::debug!(
        cmd_str,
        stdout_str,
        stderr_str,
        "command exited in {:.3}s with status {}",
        time_elapsed.total(jiff::Unit::Second).unwrap_or(-1.0),
        output.status
    );

    if !output.status.success() {
        return Err(CommandError::Exit(
            program_of(&cmd),
            output.status,
            stderr_str,
        ));
    }

    String::from_utf8(output.stdout)
        .map(|stdout| stdout.trim().to_owned())
        .map_err(|err| CommandError::Utf8(program_of(&cmd), err))
}

/// Run the command for its side effect alone.
pub fn run(cmd: Command) -> Result<(), CommandError> {
    output_of(cmd, true).map(|_| ())
}

/// Render the program and arguments of a command for logging.
pub fn cmd_to_string(cmd: &Command) -> String {
    format!(
        "{} {}",
        cmd.get_program().to_string_lossy(),
        cmd.get_args()
            .collect::<Vec<_>>()
            .join(OsStr::new(" "))
            .to_string_lossy()
    )
}

fn program_of(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}
