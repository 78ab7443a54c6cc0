// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Process environment snapshot and the explicit search path threaded
//! through a convergence run.
//!
//! A persistent machine PATH change is not visible to the current process,
//! so steps that need a freshly installed tool receive an explicitly updated
//! [`SearchPath`] from the runner instead of consulting ambient global state.

use anyhow::Context;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

/// Immutable snapshot of the process environment, captured once at the start
/// of a convergence run.
///
/// Variable names are case-insensitive, matching Windows semantics.
#[derive(Debug, Clone)]
pub struct HostEnv {
    vars: BTreeMap<String, String>,
}

impl HostEnv {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build a snapshot from explicit name/value pairs.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .map(|(name, value)| (name.to_ascii_uppercase(), value))
                .collect(),
        }
    }

    /// Look up a variable by (case-insensitive) name.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// The native program-files root.
    pub fn program_files(&self) -> PathBuf {
        self.var("ProgramFiles")
            .unwrap_or(r"C:\Program Files")
            .into()
    }

    /// The program-files root 32-bit installers target: `ProgramFiles(x86)`
    /// when the host has one, the native root otherwise.
    pub fn program_files_x86(&self) -> PathBuf {
        self.var("ProgramFiles(x86)")
            .map(Into::into)
            .unwrap_or_else(|| self.program_files())
    }
}

/// An explicit executable search path.
///
/// Later steps resolve tools through this value rather than through the
/// process PATH, so a change made mid-run is observed without mutating
/// global state.
#[derive(Debug, Clone)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Initialize from the PATH entry of an environment snapshot.
    pub fn from_env(env: &HostEnv) -> Self {
        Self {
            entries: std::env::split_paths(&env.var("Path").unwrap_or("").to_owned())
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Whether the path already contains `entry` (case-insensitive).
    pub fn contains(&self, entry: &Path) -> bool {
        let entry = entry.as_os_str().to_ascii_lowercase();
        self.entries
            .iter()
            .any(|e| e.as_os_str().to_ascii_lowercase() == entry)
    }

    /// Append `entry` unless already present. Returns whether the path
    /// changed.
    pub fn push(&mut self, entry: &Path) -> bool {
        if self.contains(entry) {
            return false;
        }
        self.entries.push(entry.to_owned());
        true
    }

    /// Render as a PATH-style joined value.
    pub fn to_os_string(&self) -> OsString {
        std::env::join_paths(&self.entries).unwrap_or_default()
    }

    /// Resolve an executable by bare name through this search path.
    pub fn locate(&self, binary: &str) -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir().context("failed to read current dir")?;
        which::which_in(binary, Some(self.to_os_string()), cwd)
            .with_context(|| format!("could not resolve {binary} through the updated search path"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HostEnv {
        HostEnv::from_vars(
            pairs
                .iter()
                .map(|&(n, v)| (n.to_owned(), v.to_owned())),
        )
    }

    #[test]
    fn var_lookup_is_case_insensitive() {
        let env = env(&[("ProgramFiles", r"C:\Program Files")]);
        assert_eq!(env.var("PROGRAMFILES"), Some(r"C:\Program Files"));
        assert_eq!(env.var("programfiles"), Some(r"C:\Program Files"));
    }

    #[test]
    fn program_files_prefers_x86_root() {
        let both = env(&[
            ("ProgramFiles", r"C:\Program Files"),
            ("ProgramFiles(x86)", r"C:\Program Files (x86)"),
        ]);
        assert_eq!(
            both.program_files_x86(),
            PathBuf::from(r"C:\Program Files (x86)")
        );

        let native_only = env(&[("ProgramFiles", r"C:\Program Files")]);
        assert_eq!(
            native_only.program_files_x86(),
            PathBuf::from(r"C:\Program Files")
        );
    }

    #[test]
    fn search_path_push_is_idempotent() {
        let mut path = SearchPath { entries: vec![] };
        assert!(path.push(Path::new(r"C:\Program Files (x86)\Git\Cmd")));
        assert!(!path.push(Path::new(r"c:\program files (x86)\git\cmd")));
        assert_eq!(path.entries.len(), 1);
    }
}
