// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Resource list merging.
//!
//! Merging always walks the current remote resources first, so existing
//! resources keep their key and their position. New resources are appended
//! after them.

use crate::resource::{LinkRequest, LocationKind, ResourceEntry, Template, UploadResult};

use tracing::debug;

/// Merge link requests into current resources.
///
/// A current URL resource satisfies the request with the same URL for the
/// resource's key, so that key is dropped from the request. Requests left
/// without keys are dropped entirely. Whatever is still pending afterwards is
/// appended to the template.
///
/// Returns `None` if every request was already satisfied, i.e., the remote
/// does not need to be updated at all.
pub fn merge_links(scripts: &[ResourceEntry], requests: Vec<LinkRequest>) -> Option<Template> {
    let mut pending = requests;
    let mut template = Template::new();

    for entry in scripts {
        let bucket = template.bucket(&entry.key);
        if let Some(reference) = entry.reference() {
            bucket.push(reference.to_string());
        }

        if entry.location_type != LocationKind::Url {
            continue;
        }

        let Some(url) = entry.content_url.as_deref() else {
            continue;
        };

        if let Some(index) = pending.iter().position(|request| request.url == url) {
            debug!("{url} already registered under {}", entry.key);
            pending[index].keys.shift_remove(&entry.key);
            if pending[index].keys.is_empty() {
                pending.remove(index);
            }
        }
    }

    if pending.is_empty() {
        return None;
    }

    for request in pending {
        for key in &request.keys {
            template.push(key, request.url.as_str());
        }
    }

    Some(template)
}

/// Merge uploaded files into current resources.
///
/// A current blob resource whose name and key match an upload is replaced by
/// that upload. Each upload replaces at most one resource, the first one that
/// matches. Uploads that replaced nothing are appended to the template as new
/// resources.
pub fn merge_files(scripts: &[ResourceEntry], uploads: Vec<UploadResult>) -> Template {
    let mut pool = uploads;
    let mut template = Template::new();

    for entry in scripts {
        let mut reference = entry.reference().map(str::to_owned);
        if entry.location_type == LocationKind::Blob {
            let matched = pool.iter().position(|upload| {
                upload.key == entry.key && Some(upload.name.as_str()) == entry.name.as_deref()
            });
            if let Some(index) = matched {
                let upload = pool.remove(index);
                debug!("replace {} under {}", upload.name, upload.key);
                reference = Some(upload.content_id);
            }
        }

        let bucket = template.bucket(&entry.key);
        if let Some(reference) = reference {
            bucket.push(reference);
        }
    }

    for upload in pool {
        debug!("add {} under {}", upload.name, upload.key);
        template.push(&upload.key, upload.content_id);
    }

    template
}
