// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronize local JavaScript and CSS customization files with a kintone
//! app.
//!
//! Local files are uploaded (or external URLs registered) as the app's custom
//! resources, merged into the resource lists the app already has for each
//! injection point, and then deployed.

pub mod client;
pub mod config;
pub mod path;
pub mod resource;
pub mod sync;

pub use client::{CustomizeApi, Credentials, KintoneClient};
pub use config::{LinkDefinition, SyncDefinition, SyncSettings};
pub use resource::{InjectionKey, LinkRequest, LocationKind, ResourceEntry, Template};
pub use sync::{SyncOutcome, Synchronizer};
