// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Downloading remote payloads into the working directory, with optional
//! digest verification.
//!
//! One routine serves both the dependency installers and the server
//! artifacts; whether a download is verified depends only on whether the
//! attribute data declares a digest for it.

use anyhow::Context;
use sha2::Digest;
use sha2::Sha256;
use std::io::Read;
use std::path::Path;

/// Download `url` to `dest`, overwriting any existing file, then verify the
/// payload against `sha256` when one is declared.
///
/// Verification failure leaves the file on disk for inspection but fails the
/// run before the payload is used.
pub fn fetch(url: &str, dest: &Path, sha256: Option<&str>) -> anyhow::Result<()> {
    if let Some(parent) = dest.parent() {
        fs_err::create_dir_all(parent)?;
    }

    let sh = xshell::Shell::new()?;
    xshell::cmd!(sh, "curl --fail -L {url} -o {dest}")
        .run()
        .with_context(|| format!("failed to download {url}"))?;

    if let Some(expected) = sha256 {
        verify_sha256(dest, expected)?;
    }

    Ok(())
}

/// Compute the SHA-256 digest of a file, hex-encoded.
pub fn sha256_digest(path: &Path) -> anyhow::Result<String> {
    let mut file = fs_err::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Check a file against an expected hex-encoded SHA-256 digest.
pub fn verify_sha256(path: &Path, expected: &str) -> anyhow::Result<()> {
    let actual = sha256_digest(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        anyhow::bail!(
            "checksum mismatch for {}: expected {expected}, got {actual}",
            path.display()
        );
    }
    Ok(())
}

/// The trailing file-name component of a download URL.
pub fn file_name_from_url(url: &str) -> anyhow::Result<&str> {
    let rest = url.split_once("//").map_or(url, |(_, rest)| rest);
    rest.rsplit_once('/')
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
        .with_context(|| format!("cannot derive a file name from {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_of_known_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        assert_eq!(
            sha256_digest(file.path()).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn digest_comparison_ignores_case() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        verify_sha256(
            file.path(),
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9",
        )
        .unwrap();
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"corrupted payload").unwrap();
        let err = verify_sha256(
            file.path(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("checksum mismatch"), "{msg}");
        assert!(msg.contains("expected b94d27b9"), "{msg}");
    }

    #[test]
    fn file_name_from_download_url() {
        assert_eq!(
            file_name_from_url("https://example.com/dir/7z935.msi").unwrap(),
            "7z935.msi"
        );
        assert!(file_name_from_url("https://example.com/").is_err());
    }
}
