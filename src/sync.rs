// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Customization synchronization.
//!
//! Synchronization always flows one way: local files or links are pushed onto
//! exactly one remote app.
//!
//! # Synchronization Sequence
//!
//! 1. Upload local files, if any, to the app's blob store.
//! 2. Fetch the app's current resources.
//! 3. Merge the requested resources into the current ones, see [`merge`].
//! 4. If the merge produced anything new, rewrite the app's customization
//!    and deploy the app.
//!
//! Every remote call after the uploads runs strictly one after the other. No
//! check is made that the remote resources stay untouched between fetch and
//! update, so the last writer wins.

pub mod merge;
pub mod upload;

use crate::{
    client::{ClientError, CustomizeApi},
    resource::{
        AppId, Customization, CustomizationUpdate, InjectionKey, LinkRequest, ResourceEntry,
        Template, UploadResult,
    },
    sync::{
        merge::{merge_files, merge_links},
        upload::{plan_uploads, upload_all},
    },
};

use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// What a synchronization ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was requested, so the remote was never contacted.
    Skipped,

    /// Remote already had everything that was requested.
    UpToDate,

    /// Customization was rewritten and the app deployed.
    Deployed { app_name: String },

    /// Customization was rewritten, but the remote did not confirm the
    /// deployment.
    DeployUnconfirmed { app_name: String },
}

/// Customization synchronizer for a single app.
#[derive(Debug)]
pub struct Synchronizer<A>
where
    A: CustomizeApi,
{
    api: A,
    app: AppId,
}

impl<A> Synchronizer<A>
where
    A: CustomizeApi,
{
    /// Construct new synchronizer targeting app.
    pub fn new(api: A, app: AppId) -> Self {
        Self { api, app }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload files under every key.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::NoFileName`] if a path does not end in a file
    ///   name.
    /// - Return [`SyncError::ReadFile`] if a file cannot be read.
    /// - Return [`SyncError::Client`] if the remote rejects an upload.
    pub async fn upload(
        &self,
        files: &[PathBuf],
        keys: &[InjectionKey],
    ) -> Result<Vec<UploadResult>> {
        upload_all(&self.api, plan_uploads(files, keys)?).await
    }

    /// Register links on the app.
    ///
    /// Links already registered under a requested key are left alone. If all
    /// of them are already registered, the app is neither updated nor
    /// deployed.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Client`] if any remote call fails.
    #[instrument(skip(self, requests), fields(app = self.app), level = "debug")]
    pub async fn customize_links(&self, requests: Vec<LinkRequest>) -> Result<SyncOutcome> {
        if requests.is_empty() {
            warn!("URL not found");
            return Ok(SyncOutcome::Skipped);
        }

        self.customize(|scripts| merge_links(scripts, requests)).await
    }

    /// Upload files and register them on the app.
    ///
    /// Uploaded files replace current blob resources with the same name and
    /// key. The app is always updated and deployed once the uploads succeed.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::NoFileName`] if a path does not end in a file
    ///   name.
    /// - Return [`SyncError::ReadFile`] if a file cannot be read.
    /// - Return [`SyncError::Client`] if any remote call fails.
    #[instrument(skip(self, files, keys), fields(app = self.app), level = "debug")]
    pub async fn customize_files(
        &self,
        files: &[PathBuf],
        keys: &[InjectionKey],
    ) -> Result<SyncOutcome> {
        if files.is_empty() {
            warn!("File not found");
            return Ok(SyncOutcome::Skipped);
        }

        let uploads = self.upload(files, keys).await?;
        self.customize(|scripts| Some(merge_files(scripts, uploads)))
            .await
    }

    /// Fetch current customization of the app.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Client`] if the remote call fails.
    pub async fn status(&self) -> Result<Customization> {
        Ok(self.api.get_customization(self.app).await?)
    }

    async fn customize<F>(&self, merge: F) -> Result<SyncOutcome>
    where
        F: FnOnce(&[ResourceEntry]) -> Option<Template>,
    {
        let customization = self.api.get_customization(self.app).await?;
        debug!("app has {} resources", customization.scripts.len());

        let Some(template) = merge(&customization.scripts) else {
            info!("No need to update!");
            return Ok(SyncOutcome::UpToDate);
        };

        let app_name = self.api.get_app_name(self.app).await?;
        let update = CustomizationUpdate {
            js_scope: customization.scope,
            id: self.app,
            name: app_name.clone(),
            js_files: template.into_files(),
        };
        self.api.update_customization(&update).await?;

        if self.api.deploy(self.app).await? {
            info!("The configuration has been updated to {app_name}");
            Ok(SyncOutcome::Deployed { app_name })
        } else {
            warn!("deployment of {app_name} was not confirmed by the remote");
            Ok(SyncOutcome::DeployUnconfirmed { app_name })
        }
    }
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote call fails.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Local file cannot be read for uploading.
    #[error("failed to read {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Path does not name a file.
    #[error("cannot determine file name of {:?}", path.display())]
    NoFileName { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
