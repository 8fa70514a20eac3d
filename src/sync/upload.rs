// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local file uploading.
//!
//! Every file is registered under every requested injection key. Scripts go
//! under the key itself, anything else is treated as a stylesheet and goes
//! under the key's CSS variant.

use crate::{
    client::CustomizeApi,
    resource::{InjectionKey, UploadResult},
    sync::{Result, SyncError},
};

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Single file upload waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub path: PathBuf,
    pub name: String,
    pub key: InjectionKey,
}

/// Pair every file with every key.
///
/// Uploads are ordered key first: all files for the first key, then all
/// files for the second key, and so on.
///
/// # Errors
///
/// - Return [`SyncError::NoFileName`] if a path does not end in a file name.
pub fn plan_uploads(files: &[PathBuf], keys: &[InjectionKey]) -> Result<Vec<PendingUpload>> {
    let mut plan = Vec::with_capacity(files.len() * keys.len());
    for key in keys {
        for path in files {
            plan.push(PendingUpload {
                path: path.clone(),
                name: file_name(path)?,
                key: upload_key(path, key),
            });
        }
    }

    Ok(plan)
}

/// Injection key a file is registered under for target key.
pub fn upload_key(path: &Path, key: &InjectionKey) -> InjectionKey {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("js") => key.clone(),
        _ => key.css_variant(),
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| SyncError::NoFileName { path: path.into() })
}

/// Send all pending uploads at once.
///
/// Results keep the order of the plan. The first failure fails everything,
/// no partial results are handed back.
///
/// # Errors
///
/// - Return [`SyncError::ReadFile`] if a file cannot be read.
/// - Return [`SyncError::Client`] if the remote rejects an upload.
#[instrument(skip(api, plan), level = "debug")]
pub async fn upload_all<A>(api: &A, plan: Vec<PendingUpload>) -> Result<Vec<UploadResult>>
where
    A: CustomizeApi + ?Sized,
{
    info!("upload {} files", plan.len());
    let uploads = plan.into_iter().map(|pending| async move {
        let contents = tokio::fs::read(&pending.path)
            .await
            .map_err(|source| SyncError::ReadFile {
                source,
                path: pending.path.clone(),
            })?;
        let content_id = api.upload_file(&pending.name, contents).await?;

        Ok::<_, SyncError>(UploadResult {
            key: pending.key,
            name: pending.name,
            content_id,
        })
    });

    try_join_all(uploads).await
}
