// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fetches the CI server package and its service-wrapper executable into
//! the working directory.

use crate::config::ServerSettings;
use crate::download;

/// Download the server package and the service wrapper, overwriting any
/// previous copies.
///
/// Both go through the shared verified-download routine; digests are checked
/// when the attribute data declares them.
pub fn fetch_server_artifacts(server: &ServerSettings) -> anyhow::Result<()> {
    fs_err::create_dir_all(&server.work_dir)?;

    download::fetch(
        &server.war_url,
        &server.war_file(),
        server.war_sha256.as_deref(),
    )?;
    download::fetch(
        &server.wrapper_url,
        &server.wrapper_file(),
        server.wrapper_sha256.as_deref(),
    )?;

    tracing::info!(work_dir = %server.work_dir.display(), "fetched server artifacts");
    Ok(())
}
