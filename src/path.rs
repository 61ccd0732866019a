// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, e.g., the manifest file, or the shared configuration
//! repository itself.

use std::path::{Path, PathBuf};

/// Environment variable that can record the shared configuration root.
///
/// Purely a convenience for shell profiles. The root can always be given
/// explicitly instead.
pub const SHARED_ROOT_ENV: &str = "AGENTLINK_ROOT";

/// Determine default absolute path to manifest file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/agentlink/manifest.toml` as
/// the default absolute path for the manifest. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_manifest_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("agentlink").join("manifest.toml"))
        .ok_or(NoWayHome)
}

/// Check that a name can be used as exactly one path component.
///
/// Names of agents, resource categories, and items all end up joined onto
/// some root directory. Anything that could walk out of that root, or that
/// spans several components, is rejected.
pub fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some()
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
