// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem placement primitives.
//!
//! Everything the sync engine does to the filesystem goes through here:
//! backing up whatever occupies a target path, creating and removing
//! symbolic links, and copying trees. None of these roll back on failure.

use crate::sync::{Result, SyncError};

use chrono::Local;
use ignore::WalkBuilder;
use std::{
    fs::{self, Metadata},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Timestamp layout of backup suffixes, e.g., "20250101_120000".
pub(crate) const BACKUP_STAMP: &str = "%Y%m%d_%H%M%S";

/// Stat path without following a final symbolic link.
///
/// Yields `None` for a missing path. Dangling links count as present.
pub(crate) fn lstat(path: &Path) -> Result<Option<Metadata>> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(fs_error(path)(error)),
    }
}

/// Move path out of the way to a timestamped sibling.
///
/// Returns the path of the backup.
pub(crate) fn backup(path: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format(BACKUP_STAMP).to_string();
    let backup = backup_path(path, &stamp);
    fs::rename(path, &backup).map_err(fs_error(path))?;
    info!("backup {} -> {}", path.display(), backup.display());

    Ok(backup)
}

/// Determine free backup path for target path at given timestamp.
///
/// Backups follow `<name>.backup.<stamp>`. If that is already taken, a
/// counter is appended so an existing backup is never clobbered.
pub(crate) fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = path.with_file_name(format!("{name}.backup.{stamp}"));
    let mut counter = 1;
    while candidate.symlink_metadata().is_ok() {
        candidate = path.with_file_name(format!("{name}.backup.{stamp}.{counter}"));
        counter += 1;
    }

    candidate
}

/// Create symbolic link at target pointing to source.
pub(crate) fn symlink(source: &Path, target: &Path) -> Result<()> {
    make_link(source, target).map_err(fs_error(target))?;
    debug!("symlink {} -> {}", target.display(), source.display());

    Ok(())
}

/// Remove symbolic link itself, never what it points to.
pub(crate) fn remove_link(path: &Path) -> Result<()> {
    unlink(path).map_err(fs_error(path))?;
    debug!("unlink {}", path.display());

    Ok(())
}

/// Recursively copy source to target.
///
/// Symbolic links inside of source are followed, so the copy holds their
/// contents. Hidden and ignored files are copied too. Returns number of files
/// copied.
///
/// An entry that cannot be read or copied is skipped so the rest still gets
/// copied. The first such error is returned once the walk is done.
pub(crate) fn copy_tree(source: &Path, target: &Path) -> Result<usize> {
    if !source.is_dir() {
        fs::copy(source, target).map_err(fs_error(target))?;
        return Ok(1);
    }

    let mut files = 0;
    let mut failure = None;
    for entry in WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .build()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!("skip unreadable entry: {error}");
                if failure.is_none() {
                    failure = Some(SyncError::Walk(error));
                }
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);

        let result = match entry.file_type() {
            Some(kind) if kind.is_dir() => fs::create_dir_all(&destination),
            Some(_) => fs::copy(entry.path(), &destination).map(|_| files += 1),
            None => continue,
        };
        if let Err(error) = result {
            warn!("skip {}: {error}", entry.path().display());
            if failure.is_none() {
                failure = Some(fs_error(&destination)(error));
            }
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(files),
    }
}

/// Count regular files below path without following links.
pub(crate) fn count_files(path: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkBuilder::new(path).standard_filters(false).build() {
        if entry?.file_type().is_some_and(|kind| kind.is_file()) {
            files += 1;
        }
    }

    Ok(files)
}

pub(crate) fn fs_error(path: &Path) -> impl FnOnce(io::Error) -> SyncError + '_ {
    move |error| SyncError::Filesystem {
        path: path.to_path_buf(),
        error,
    }
}

#[cfg(unix)]
fn make_link(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}
#[cfg(windows)]
fn make_link(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(unix)]
fn unlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}
#[cfg(windows)]
fn unlink(path: &Path) -> io::Result<()> {
    fs::remove_dir(path).or_else(|_| fs::remove_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn backup_path_avoids_collisions() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("skills");

        let first = backup_path(&target, "20250101_120000");
        assert_eq!(first, dir.path().join("skills.backup.20250101_120000"));

        fs::create_dir(&first)?;
        let second = backup_path(&target, "20250101_120000");
        assert_eq!(second, dir.path().join("skills.backup.20250101_120000.1"));

        fs::create_dir(&second)?;
        let third = backup_path(&target, "20250101_120000");
        assert_eq!(third, dir.path().join("skills.backup.20250101_120000.2"));

        Ok(())
    }

    #[test]
    fn backup_moves_contents() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("agents");
        fs::create_dir(&target)?;
        fs::write(target.join("reviewer.md"), "review things")?;

        let backup = backup(&target)?;

        assert!(lstat(&target)?.is_none());
        assert_eq!(fs::read_to_string(backup.join("reviewer.md"))?, "review things");

        Ok(())
    }

    #[test]
    fn copy_tree_includes_hidden_and_nested() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("nested/deeper"))?;
        fs::write(source.join("SKILL.md"), "skill")?;
        fs::write(source.join(".hidden"), "hidden")?;
        fs::write(source.join("nested/deeper/notes.txt"), "notes")?;

        let target = dir.path().join("target");
        let files = copy_tree(&source, &target)?;

        assert_eq!(files, 3);
        assert_eq!(fs::read_to_string(target.join(".hidden"))?, "hidden");
        assert_eq!(fs::read_to_string(target.join("nested/deeper/notes.txt"))?, "notes");
        assert_eq!(count_files(&target)?, 3);

        Ok(())
    }

    #[test]
    fn copy_tree_single_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("reviewer.md");
        fs::write(&source, "review")?;

        let target = dir.path().join("copy.md");
        assert_eq!(copy_tree(&source, &target)?, 1);
        assert_eq!(fs::read_to_string(&target)?, "review");

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_copies_what_it_can() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("nested"))?;
        fs::write(source.join("deploy.md"), "ship it")?;
        fs::write(source.join("nested/notes.txt"), "notes")?;
        symlink(&dir.path().join("gone"), &source.join("broken"))?;

        let target = dir.path().join("target");
        assert!(copy_tree(&source, &target).is_err());
        assert_eq!(fs::read_to_string(target.join("deploy.md"))?, "ship it");
        assert_eq!(fs::read_to_string(target.join("nested/notes.txt"))?, "notes");

        Ok(())
    }

    #[test]
    fn lstat_sees_dangling_link() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let link = dir.path().join("dangling");
        symlink(&dir.path().join("gone"), &link)?;

        assert!(lstat(&link)?.is_some_and(|meta| meta.file_type().is_symlink()));
        remove_link(&link)?;
        assert!(lstat(&link)?.is_none());

        Ok(())
    }
}
