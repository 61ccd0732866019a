// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Observed state of target paths.
//!
//! State is never stored. It is read fresh from the filesystem every time a
//! caller asks for it.

use crate::sync::{
    place::{count_files, fs_error, lstat},
    Result,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

/// Observed state of a target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing at target path.
    Missing,

    /// Target is a symbolic link with the given destination.
    Symlink(PathBuf),

    /// Target is an independent directory, e.g., a copy.
    Directory { files: usize },

    /// Target is an independent regular file.
    File { size: u64 },

    /// Item reached through its category path, which is itself a link.
    ViaCategoryLink(PathBuf),
}

impl LinkState {
    /// Read state of path.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Filesystem`](crate::sync::SyncError::Filesystem)
    ///   if path cannot be inspected.
    pub fn probe(path: &Path) -> Result<Self> {
        let Some(meta) = lstat(path)? else {
            return Ok(Self::Missing);
        };

        if meta.file_type().is_symlink() {
            Ok(Self::Symlink(fs::read_link(path).map_err(fs_error(path))?))
        } else if meta.is_dir() {
            Ok(Self::Directory {
                files: count_files(path)?,
            })
        } else {
            Ok(Self::File { size: meta.len() })
        }
    }

    /// Target is a symbolic link.
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Symlink(_) | Self::ViaCategoryLink(_))
    }
}

impl Display for LinkState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Missing => fmt.write_str("missing"),
            Self::Symlink(path) => write!(fmt, "linked -> {}", path.display()),
            Self::Directory { files } => write!(fmt, "independent directory ({files} files)"),
            Self::File { size } => write!(fmt, "independent file ({size} bytes)"),
            Self::ViaCategoryLink(path) => {
                write!(fmt, "linked through category -> {}", path.display())
            }
        }
    }
}

/// Count backups that sit next to target path.
pub(crate) fn count_backups(path: &Path) -> Result<usize> {
    let pattern = format!(
        "{}.backup.*",
        glob::Pattern::escape(path.to_string_lossy().as_ref())
    );

    Ok(glob::glob(&pattern)?.filter_map(|entry| entry.ok()).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::place::symlink;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn probe_each_state() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let shared = dir.path().join("shared");
        fs::create_dir(&shared)?;
        fs::write(shared.join("a.md"), "a")?;
        fs::write(shared.join("b.md"), "bb")?;

        assert_eq!(LinkState::probe(&dir.path().join("nope"))?, LinkState::Missing);
        assert_eq!(LinkState::probe(&shared)?, LinkState::Directory { files: 2 });
        assert_eq!(LinkState::probe(&shared.join("b.md"))?, LinkState::File { size: 2 });

        let link = dir.path().join("link");
        symlink(&shared, &link)?;
        assert_eq!(LinkState::probe(&link)?, LinkState::Symlink(shared));

        Ok(())
    }

    #[test]
    fn count_sibling_backups() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("skills");
        fs::create_dir(&target)?;
        assert_eq!(count_backups(&target)?, 0);

        fs::create_dir(dir.path().join("skills.backup.20250101_120000"))?;
        fs::create_dir(dir.path().join("skills.backup.20250101_120000.1"))?;
        fs::create_dir(dir.path().join("skillset"))?;
        assert_eq!(count_backups(&target)?, 2);

        Ok(())
    }
}
