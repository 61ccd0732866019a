// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use agentlink::{config::Manifest, sync::SyncEngine};

use anyhow::Result;
use indoc::formatdoc;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Shared repository plus simulated agent roots inside of a temporary
/// directory.
///
/// Claude Code and Codex are installed. OpenCode is known, but not installed,
/// and only accepts skills.
pub(crate) struct Fixture {
    dir: TempDir,
    pub(crate) shared: PathBuf,
    pub(crate) home: PathBuf,
}

impl Fixture {
    pub(crate) fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let shared = dir.path().join("shared");
        let home = dir.path().join("home");

        let fixture = Self {
            dir,
            shared,
            home,
        };

        fixture.write_shared("agents/code-reviewer.md", "review all the things")?;
        fixture.write_shared("agents/.draft.md", "not ready")?;
        fixture.write_shared("commands/deploy.md", "ship it")?;
        fixture.write_shared("skills/seo-optimizer/SKILL.md", "optimize")?;
        fixture.write_shared("skills/seo-optimizer/notes/keywords.txt", "rust, cli")?;
        fixture.write_shared("skills/frontend-design/SKILL.md", "design")?;
        fs::create_dir_all(fixture.claude())?;
        fs::create_dir_all(fixture.codex())?;

        Ok(fixture)
    }

    /// Temporary directory holding everything else.
    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn claude(&self) -> PathBuf {
        self.home.join(".claude")
    }

    pub(crate) fn codex(&self) -> PathBuf {
        self.home.join(".codex")
    }

    pub(crate) fn opencode(&self) -> PathBuf {
        self.home.join(".config/opencode")
    }

    pub(crate) fn write_shared(&self, path: impl AsRef<Path>, contents: &str) -> Result<()> {
        write(&self.shared.join(path), contents)
    }

    pub(crate) fn manifest(&self) -> Result<Manifest> {
        Ok(formatdoc! {r#"
            [settings]
            shared_root = "{shared}"

            [[resource]]
            name = "agents"
            description = "Sub-agent definitions"

            [[resource]]
            name = "commands"
            description = "Slash command definitions"

            [[resource]]
            name = "skills"
            description = "Reusable skills"
            marker = "SKILL.md"

            [[resource.nested]]
            name = "vendor"
            base_path = "vendor-skills"
            items = ["pdf"]

            [[agent]]
            name = "claude-code"
            config_dir = "{claude}"
            layout_dir = ".claude"

            [[agent]]
            name = "opencode"
            config_dir = "{opencode}"
            layout_dir = ".opencode"
            resources = ["skills"]

            [[agent]]
            name = "codex"
            config_dir = "{codex}"
            layout_dir = ".codex"
        "#,
            shared = self.shared.display(),
            claude = self.claude().display(),
            opencode = self.opencode().display(),
            codex = self.codex().display(),
        }
        .parse()?)
    }

    pub(crate) fn manifest_file(&self) -> Result<PathBuf> {
        let path = self.home.join("manifest.toml");
        fs::write(&path, self.manifest()?.to_string())?;
        Ok(path)
    }

    pub(crate) fn engine(&self) -> Result<SyncEngine> {
        Ok(SyncEngine::from_manifest(&self.shared, &self.manifest()?)?)
    }

    /// Backups sitting next to target path, sorted by name.
    pub(crate) fn backups(&self, target: &Path) -> Result<Vec<PathBuf>> {
        let prefix = match target.file_name() {
            Some(name) => format!("{}.backup.", name.to_string_lossy()),
            None => return Ok(Vec::new()),
        };
        let Some(parent) = target.parent() else {
            return Ok(Vec::new());
        };

        let mut backups = Vec::new();
        for entry in fs::read_dir(parent)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                backups.push(entry.path());
            }
        }
        backups.sort();

        Ok(backups)
    }
}

pub(crate) fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;

    Ok(())
}

pub(crate) fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}
