// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote kintone API access.
//!
//! Synchronization only needs five remote operations: upload a file to the
//! blob store, read the current customization of an app, read the app's
//! display name, rewrite the customization, and deploy the app. These are
//! gathered behind the [`CustomizeApi`] trait so the synchronization logic
//! never deals with HTTP directly.
//!
//! # Authentication
//!
//! Requests are authenticated through password authentication. The username
//! and password are encoded once when the client is constructed, and attached
//! to every request through the "X-Cybozu-Authorization" header.

use crate::resource::{AppId, Customization, CustomizationUpdate};

use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use reqwest::{
    header::{HeaderMap, HeaderValue, InvalidHeaderValue},
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Header carrying encoded credentials.
pub const AUTH_HEADER: &str = "x-cybozu-authorization";

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Layer of indirection for remote customization access.
#[async_trait]
pub trait CustomizeApi: Send + Sync {
    /// Upload file contents to blob store, returning its content handle.
    async fn upload_file(&self, name: &str, contents: Vec<u8>) -> Result<String>;

    /// Read current customization of app.
    async fn get_customization(&self, app: AppId) -> Result<Customization>;

    /// Read display name of app.
    async fn get_app_name(&self, app: AppId) -> Result<String>;

    /// Rewrite customization of app.
    async fn update_customization(&self, update: &CustomizationUpdate) -> Result<()>;

    /// Deploy app, returning whether the remote reported success.
    async fn deploy(&self, app: AppId) -> Result<bool>;
}

/// Username and password pair used for password authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Encode credentials into value of [`AUTH_HEADER`].
    pub fn encode(&self) -> String {
        BASE64_STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Customization access through kintone's REST API.
#[derive(Debug, Clone)]
pub struct KintoneClient {
    http: reqwest::Client,
    base_url: String,
}

impl KintoneClient {
    /// Construct new client for target host.
    ///
    /// A bare host like "example.cybozu.com" is reached over HTTPS. A host
    /// that already names its scheme is used as is.
    ///
    /// # Errors
    ///
    /// - Return [`ClientError::InvalidHeader`] if encoded credentials cannot
    ///   be used as a header value.
    /// - Return [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(host: &str, credentials: &Credentials, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&credentials.encode())?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url(host),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self.http.post(self.url(endpoint)).json(body).send().await?;
        decode(endpoint, check(response).await?)
    }
}

#[async_trait]
impl CustomizeApi for KintoneClient {
    #[instrument(skip(self, contents), level = "debug")]
    async fn upload_file(&self, name: &str, contents: Vec<u8>) -> Result<String> {
        const ENDPOINT: &str = "/k/v1/file.json";

        debug!("upload {} bytes", contents.len());
        let part = Part::bytes(contents).file_name(name.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(self.url(ENDPOINT))
            .multipart(form)
            .send()
            .await?;
        let uploaded: FileUploaded = decode(ENDPOINT, check(response).await?)?;

        Ok(uploaded.file_key)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_customization(&self, app: AppId) -> Result<Customization> {
        let settings: CustomizationSettings =
            self.post_json("/k/api/js/get.json", &json!({ "app": app })).await?;

        Ok(settings.result)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_app_name(&self, app: AppId) -> Result<String> {
        const ENDPOINT: &str = "/k/v1/app.json";

        let response = self
            .http
            .get(self.url(ENDPOINT))
            .query(&[("id", app)])
            .send()
            .await?;
        let info: AppInfo = decode(ENDPOINT, check(response).await?)?;

        Ok(info.name)
    }

    #[instrument(skip(self, update), fields(app = update.id), level = "debug")]
    async fn update_customization(&self, update: &CustomizationUpdate) -> Result<()> {
        let response = self
            .http
            .post(self.url("/k/api/dev/app/update.json"))
            .json(update)
            .send()
            .await?;
        check(response).await?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn deploy(&self, app: AppId) -> Result<bool> {
        let outcome: DeployOutcome = self
            .post_json("/k/api/dev/app/deploy.json", &json!({ "app": app }))
            .await?;

        Ok(outcome.success)
    }
}

fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Read response body, turning non-success statuses into errors.
///
/// The remote usually explains failures through a JSON body with a "message"
/// field. That message becomes the error when present.
async fn check(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    match serde_json::from_str::<RemoteMessage>(&body) {
        Ok(remote) => Err(ClientError::Remote {
            status,
            message: remote.message,
        }),
        Err(_) => Err(ClientError::Status { status, body }),
    }
}

fn decode<T: DeserializeOwned>(endpoint: &'static str, body: String) -> Result<T> {
    serde_json::from_str(&body).map_err(|source| ClientError::Decode { source, endpoint })
}

#[derive(Debug, Deserialize)]
struct RemoteMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileUploaded {
    file_key: String,
}

#[derive(Debug, Deserialize)]
struct CustomizationSettings {
    result: Customization,
}

#[derive(Debug, Deserialize)]
struct AppInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeployOutcome {
    #[serde(default)]
    success: bool,
}

/// Remote access error types.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Remote rejected request and explained why.
    #[error("{message}")]
    Remote { status: StatusCode, message: String },

    /// Remote rejected request without explanation.
    #[error("request failed with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Request could not be sent or its response could not be read.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Response body does not have the expected layout.
    #[error("unexpected response from {endpoint}")]
    Decode {
        #[source]
        source: serde_json::Error,
        endpoint: &'static str,
    },

    /// Credentials cannot be sent as a header.
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// Friendly result alias :3
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
