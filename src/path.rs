// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the settings file, and expand the
//! file patterns the user hands us into concrete files to upload.

use std::path::PathBuf;
use tracing::debug;

/// Determine default absolute path to settings file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/kinsync/config.toml` as the
/// default absolute path. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if configuration directory cannot be
///   determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("kinsync").join("config.toml"))
        .ok_or(PathError::NoWayHome)
}

/// Expand file patterns into list of files.
///
/// Each pattern is treated as a glob. Plain paths are just globs without any
/// special characters, so they expand to themselves when they exist. Matches
/// keep the order of the patterns that produced them, and a file matched by
/// more than one pattern is only listed once.
///
/// # Errors
///
/// - Return [`PathError::Pattern`] if pattern is not a valid glob.
/// - Return [`PathError::Glob`] if a matched path cannot be read.
/// - Return [`PathError::NoMatch`] if pattern matches nothing.
pub fn expand_patterns(
    patterns: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let mut matched = false;
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }

            matched = true;
            if !files.contains(&path) {
                debug!("{pattern} matched {}", path.display());
                files.push(path);
            }
        }

        if !matched {
            return Err(PathError::NoMatch {
                pattern: pattern.into(),
            });
        }
    }

    Ok(files)
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's configuration directory.
    ///
    /// # See Also
    ///
    /// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
    #[error("cannot determine absolute path to user's configuration directory")]
    NoWayHome,

    /// File pattern is not a valid glob.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Matched path cannot be accessed.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// File pattern did not match any file.
    #[error("no file matches {pattern:?}")]
    NoMatch { pattern: String },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
