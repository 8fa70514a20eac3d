// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the settings file that kinsync uses to simplify the
//! process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::resource::{AppId, InjectionKey, LinkRequest};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Synchronization definition layout.
///
/// A synchronization definition tells kinsync which app to talk to, how to
/// authenticate, and what to register on the app by default.
///
/// # General Layout
///
/// A definition is composed of two basic parts: settings and links. The
/// settings section describes the target app and its credentials. The links
/// section lists external URLs that should be registered on the app when no
/// URLs are given on the command line.
///
/// Values of "host", "username", and "password" go through shell expansion,
/// so credentials can be pulled out of the environment instead of being
/// written down in plain text.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncDefinition {
    /// Settings for the target app.
    #[serde(default)]
    pub settings: SyncSettings,

    /// External links to register.
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkDefinition>,
}

impl SyncDefinition {
    /// Link requests for every listed link.
    ///
    /// Links without their own "cover" list fall back to `fallback`, which is
    /// usually [`SyncSettings::cover_keys`] unless keys were given explicitly.
    pub fn link_requests_with(&self, fallback: &[InjectionKey]) -> Vec<LinkRequest> {
        self.links
            .iter()
            .map(|link| match &link.cover {
                Some(cover) => LinkRequest::new(link.url.clone(), cover.iter().cloned()),
                None => LinkRequest::new(link.url.clone(), fallback.iter().cloned()),
            })
            .collect()
    }
}

impl FromStr for SyncDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: SyncDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on host and credential fields.
        let settings = &mut definition.settings;
        for field in [
            &mut settings.host,
            &mut settings.username,
            &mut settings.password,
        ] {
            if let Some(value) = field {
                *value = shellexpand::full(value.as_str())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned();
            }
        }

        Ok(definition)
    }
}

impl Display for SyncDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Target app settings.
///
/// Every field is optional, because command line options and environment
/// variables can fill in whatever the settings file leaves out.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Host of the kintone domain, e.g., "example.cybozu.com".
    pub host: Option<String>,

    /// Identifier of the target app.
    pub app: Option<AppId>,

    /// Login name used for password authentication.
    pub username: Option<String>,

    /// Password used for password authentication.
    pub password: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout: Option<u64>,

    /// Default injection keys to register resources under.
    pub cover: Option<Vec<InjectionKey>>,
}

impl SyncSettings {
    /// Fill in settings from another set of settings.
    ///
    /// Values present in `overrides` win over values present in `self`.
    pub fn overlay(self, overrides: SyncSettings) -> Self {
        Self {
            host: overrides.host.or(self.host),
            app: overrides.app.or(self.app),
            username: overrides.username.or(self.username),
            password: overrides.password.or(self.password),
            timeout: overrides.timeout.or(self.timeout),
            cover: overrides.cover.or(self.cover),
        }
    }

    /// Injection keys to use when none are requested explicitly.
    ///
    /// Falls back to the desktop key if "cover" is missing or empty.
    pub fn cover_keys(&self) -> Vec<InjectionKey> {
        match &self.cover {
            Some(cover) if !cover.is_empty() => cover.clone(),
            _ => vec![InjectionKey::desktop()],
        }
    }
}

/// External link listing.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkDefinition {
    /// URL to register.
    pub url: String,

    /// Injection keys to register URL under instead of the default keys.
    pub cover: Option<Vec<InjectionKey>>,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("KINTONE_USER", "alice"), ("KINTONE_PASS", "s3cret")])]
    fn deserialize_sync_definition() -> anyhow::Result<()> {
        let result: SyncDefinition = r#"
            [settings]
            host = "example.cybozu.com"
            app = 42
            username = "$KINTONE_USER"
            password = "${KINTONE_PASS}"
            timeout = 30
            cover = ["DESKTOP", "MOBILE"]

            [[link]]
            url = "https://cdn.example.com/lib.js"

            [[link]]
            url = "https://cdn.example.com/mobile.js"
            cover = ["MOBILE"]
        "#
        .parse()?;

        let expect = SyncDefinition {
            settings: SyncSettings {
                host: Some("example.cybozu.com".into()),
                app: Some(42),
                username: Some("alice".into()),
                password: Some("s3cret".into()),
                timeout: Some(30),
                cover: Some(vec!["DESKTOP".into(), "MOBILE".into()]),
            },
            links: vec![
                LinkDefinition {
                    url: "https://cdn.example.com/lib.js".into(),
                    cover: None,
                },
                LinkDefinition {
                    url: "https://cdn.example.com/mobile.js".into(),
                    cover: Some(vec!["MOBILE".into()]),
                },
            ],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_rejects_undefined_variable() {
        let result = r#"
            [settings]
            password = "$KINSYNC_UNDEFINED_VARIABLE_FOR_TEST"
        "#
        .parse::<SyncDefinition>();

        assert!(matches!(result, Err(ConfigError::ShellExpansion(_))));
    }

    #[test]
    fn deserialize_empty_definition() -> anyhow::Result<()> {
        let result: SyncDefinition = "".parse()?;
        assert_eq!(result, SyncDefinition::default());

        Ok(())
    }

    #[test]
    fn serialize_sync_definition() {
        let result = SyncDefinition {
            settings: SyncSettings {
                host: Some("example.cybozu.com".into()),
                app: Some(42),
                username: Some("$KINTONE_USERNAME".into()),
                password: None,
                timeout: None,
                cover: Some(vec!["DESKTOP".into(), "MOBILE".into()]),
            },
            links: vec![LinkDefinition {
                url: "https://cdn.example.com/lib.js".into(),
                cover: Some(vec!["DESKTOP".into(), "MOBILE".into()]),
            }],
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            host = "example.cybozu.com"
            app = 42
            username = "$KINTONE_USERNAME"
            cover = [
                "DESKTOP",
                "MOBILE",
            ]

            [[link]]
            url = "https://cdn.example.com/lib.js"
            cover = [
                "DESKTOP",
                "MOBILE",
            ]
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn overlay_prefers_overrides() {
        let file = SyncSettings {
            host: Some("file.cybozu.com".into()),
            app: Some(1),
            username: Some("file-user".into()),
            password: Some("file-pass".into()),
            timeout: Some(5),
            cover: None,
        };
        let overrides = SyncSettings {
            app: Some(2),
            password: Some("cli-pass".into()),
            ..Default::default()
        };

        let result = file.overlay(overrides);
        let expect = SyncSettings {
            host: Some("file.cybozu.com".into()),
            app: Some(2),
            username: Some("file-user".into()),
            password: Some("cli-pass".into()),
            timeout: Some(5),
            cover: None,
        };
        assert_eq!(result, expect);
    }

    #[test]
    fn link_requests_fall_back_to_default_cover() {
        let definition = SyncDefinition {
            settings: SyncSettings::default(),
            links: vec![
                LinkDefinition {
                    url: "https://a".into(),
                    cover: None,
                },
                LinkDefinition {
                    url: "https://b".into(),
                    cover: Some(vec!["MOBILE".into()]),
                },
            ],
        };

        let result = definition.link_requests_with(&definition.settings.cover_keys());
        let expect = vec![
            LinkRequest::new("https://a", ["DESKTOP"]),
            LinkRequest::new("https://b", ["MOBILE"]),
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn link_requests_with_explicit_fallback() {
        let definition = SyncDefinition {
            settings: SyncSettings {
                cover: Some(vec!["DESKTOP".into()]),
                ..Default::default()
            },
            links: vec![
                LinkDefinition {
                    url: "https://a".into(),
                    cover: None,
                },
                LinkDefinition {
                    url: "https://b".into(),
                    cover: Some(vec!["PORTAL".into()]),
                },
            ],
        };

        let fallback = vec![InjectionKey::new("MOBILE"), InjectionKey::new("MOBILE_CSS")];
        let result = definition.link_requests_with(&fallback);
        let expect = vec![
            LinkRequest::new("https://a", ["MOBILE", "MOBILE_CSS"]),
            LinkRequest::new("https://b", ["PORTAL"]),
        ];
        assert_eq!(result, expect);
    }
}
