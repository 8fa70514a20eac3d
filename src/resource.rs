// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Customization resource layout.
//!
//! A kintone app carries a list of JavaScript and CSS __resources__. Each
//! resource is inserted at an __injection point__ identified by a key, e.g.,
//! "DESKTOP" or "MOBILE_CSS". A resource either lives in the app's blob store
//! as an uploaded file, or points at an external URL.
//!
//! The remote list is always read and rewritten wholesale. The shape we send
//! back is a [`Template`]: every injection key mapped to the ordered list of
//! resource references that should live there.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::{
    borrow::Borrow,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Numeric identifier of a kintone app.
pub type AppId = u64;

/// Identifier of the place a resource is injected into an app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct InjectionKey(String);

impl InjectionKey {
    /// Construct new injection key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for desktop scripts, used when nothing else is configured.
    pub fn desktop() -> Self {
        Self::new("DESKTOP")
    }

    /// Stylesheet counterpart of this key.
    ///
    /// Stylesheets are registered under the key with a "_CSS" suffix.
    pub fn css_variant(&self) -> Self {
        Self(format!("{}_CSS", self.0))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for InjectionKey {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl Borrow<str> for InjectionKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for InjectionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for InjectionKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Where a resource is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LocationKind {
    /// File uploaded to the app's blob store.
    Blob,

    /// External link.
    Url,
}

impl Display for LocationKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Blob => fmt.write_str("BLOB"),
            Self::Url => fmt.write_str("URL"),
        }
    }
}

/// Resource currently registered on the remote app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Injection point of the resource.
    #[serde(rename = "type")]
    pub key: InjectionKey,

    pub location_type: LocationKind,

    /// File name of blob resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Content handle of blob resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,

    /// Link of URL resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

impl ResourceEntry {
    /// Construct new blob resource.
    pub fn blob(
        key: impl Into<InjectionKey>,
        name: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            location_type: LocationKind::Blob,
            name: Some(name.into()),
            content_id: Some(content_id.into()),
            content_url: None,
        }
    }

    /// Construct new URL resource.
    pub fn url(key: impl Into<InjectionKey>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location_type: LocationKind::Url,
            name: None,
            content_id: None,
            content_url: Some(url.into()),
        }
    }

    /// Reference to put into a [`Template`] for this resource.
    ///
    /// Content handle for blobs, link for URLs. Returns `None` if the remote
    /// left out the field matching the location kind.
    pub fn reference(&self) -> Option<&str> {
        match self.location_type {
            LocationKind::Blob => self.content_id.as_deref(),
            LocationKind::Url => self.content_url.as_deref(),
        }
    }
}

/// Current customization of an app.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Customization {
    /// Scope the customization applies to. Never interpreted, only sent back.
    #[serde(default)]
    pub scope: serde_json::Value,

    /// Registered resources in remote order.
    #[serde(default)]
    pub scripts: Vec<ResourceEntry>,
}

/// Local file uploaded to the app's blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Injection point the upload is meant for.
    pub key: InjectionKey,

    /// Base name of the uploaded file.
    pub name: String,

    /// Content handle handed back by the blob store.
    pub content_id: String,
}

/// External link to register under a set of injection keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub url: String,
    pub keys: IndexSet<InjectionKey>,
}

impl LinkRequest {
    /// Construct new link request.
    ///
    /// Duplicate keys collapse into one, first occurrence decides order.
    pub fn new(
        url: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<InjectionKey>>,
    ) -> Self {
        Self {
            url: url.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Merged resource listing of an app.
///
/// Maps injection keys to resource references. Keys keep the order they were
/// first seen in, and so do the references inside each key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Template {
    files: IndexMap<InjectionKey, Vec<String>>,
}

impl Template {
    /// Construct new empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get references of key, creating an empty listing on first access.
    pub fn bucket(&mut self, key: &InjectionKey) -> &mut Vec<String> {
        self.files.entry(key.clone()).or_default()
    }

    /// Append reference to listing of key.
    pub fn push(&mut self, key: &InjectionKey, reference: impl Into<String>) {
        self.bucket(key).push(reference.into());
    }

    /// References listed under key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.files.get(key).map(Vec::as_slice)
    }

    /// Injection keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &InjectionKey> {
        self.files.keys()
    }

    /// Convert into the record layout the remote expects.
    pub fn into_files(self) -> Vec<TemplateFile> {
        self.files
            .into_iter()
            .map(|(js_type, file_keys)| TemplateFile { js_type, file_keys })
            .collect()
    }
}

/// One injection key of a [`Template`] in wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFile {
    pub js_type: InjectionKey,
    pub file_keys: Vec<String>,
}

/// Request body that rewrites the customization of an app.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationUpdate {
    pub js_scope: serde_json::Value,
    pub id: AppId,
    pub name: String,
    pub js_files: Vec<TemplateFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn css_variant_appends_suffix() {
        assert_eq!(InjectionKey::new("K1").css_variant(), InjectionKey::new("K1_CSS"));
        assert_eq!(InjectionKey::desktop().css_variant().as_str(), "DESKTOP_CSS");
    }

    #[test]
    fn deserialize_customization() -> anyhow::Result<()> {
        let result: Customization = serde_json::from_str(indoc! {r#"
            {
                "scope": "ALL",
                "scripts": [
                    {
                        "type": "DESKTOP",
                        "locationType": "BLOB",
                        "name": "app.js",
                        "contentId": "blob-1"
                    },
                    {
                        "type": "MOBILE",
                        "locationType": "URL",
                        "contentUrl": "https://cdn.example.com/lib.js"
                    }
                ]
            }
        "#})?;

        let expect = Customization {
            scope: json!("ALL"),
            scripts: vec![
                ResourceEntry::blob("DESKTOP", "app.js", "blob-1"),
                ResourceEntry::url("MOBILE", "https://cdn.example.com/lib.js"),
            ],
        };
        assert_eq!(result, expect);
        assert_eq!(result.scripts[0].reference(), Some("blob-1"));
        assert_eq!(result.scripts[1].reference(), Some("https://cdn.example.com/lib.js"));

        Ok(())
    }

    #[test]
    fn reference_follows_location_kind() {
        let mut entry = ResourceEntry::blob("DESKTOP", "app.js", "blob-1");
        entry.content_url = Some("https://ignored.example.com".into());
        assert_eq!(entry.reference(), Some("blob-1"));

        entry.location_type = LocationKind::Url;
        entry.content_url = None;
        assert_eq!(entry.reference(), None);
    }

    #[test]
    fn link_request_collapses_duplicate_keys() {
        let request = LinkRequest::new("https://a", ["K2", "K1", "K2"]);
        let keys = request.keys.iter().map(InjectionKey::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["K2", "K1"]);
    }

    #[test]
    fn template_keeps_first_seen_order() {
        let mut template = Template::new();
        template.push(&"MOBILE".into(), "m1");
        template.push(&"DESKTOP".into(), "d1");
        template.push(&"MOBILE".into(), "m2");
        template.bucket(&"DESKTOP_CSS".into());

        assert_eq!(template.get("MOBILE").unwrap(), ["m1", "m2"]);
        assert!(template.get("DESKTOP_CSS").unwrap().is_empty());
        assert!(template.get("PORTAL").is_none());

        let result = template.into_files();
        let expect = vec![
            TemplateFile {
                js_type: "MOBILE".into(),
                file_keys: vec!["m1".into(), "m2".into()],
            },
            TemplateFile {
                js_type: "DESKTOP".into(),
                file_keys: vec!["d1".into()],
            },
            TemplateFile {
                js_type: "DESKTOP_CSS".into(),
                file_keys: vec![],
            },
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn serialize_customization_update() -> anyhow::Result<()> {
        let mut template = Template::new();
        template.push(&"DESKTOP".into(), "blob-1");
        let update = CustomizationUpdate {
            js_scope: json!("ALL"),
            id: 7,
            name: "Orders".into(),
            js_files: template.into_files(),
        };

        let result = serde_json::to_value(&update)?;
        let expect = json!({
            "jsScope": "ALL",
            "id": 7,
            "name": "Orders",
            "jsFiles": [{ "jsType": "DESKTOP", "fileKeys": ["blob-1"] }],
        });
        assert_eq!(result, expect);

        Ok(())
    }
}
