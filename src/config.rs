// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the manifest file that agentlink uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.

use crate::path::is_single_component;

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Manifest used when the user has not written one.
const BUILTIN_MANIFEST: &str = r#"
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

[[agent]]
name = "claude-code"
config_dir = "~/.claude"
layout_dir = ".claude"

[[agent]]
name = "opencode"
config_dir = "~/.config/opencode"
layout_dir = ".opencode"

[[agent]]
name = "codex"
config_dir = "~/.codex"
layout_dir = ".codex"
"#;

/// Manifest layout.
///
/// The __manifest__ is the static table that maps every known agent to its
/// configuration root, and lists the resource categories that can be shared
/// with those agents. It is loaded once at start up, and never changes during
/// a run.
///
/// # General Layout
///
/// A manifest is composed of three parts: settings, resources, and agents.
/// The settings section holds defaults for the whole run. Each resource entry
/// names a category directory inside the shared repository. Each agent entry
/// names an installed coding assistant, and the configuration root that
/// categories get placed into.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Settings for the whole run.
    #[serde(default)]
    pub settings: ManifestSettings,

    /// Shareable resource categories.
    #[serde(rename = "resource", default)]
    pub resources: Vec<ResourceEntry>,

    /// Known agent installations.
    #[serde(rename = "agent", default)]
    pub agents: Vec<AgentEntry>,
}

impl Manifest {
    /// Construct the built-in manifest.
    ///
    /// Covers Claude Code, OpenCode, and Codex with the agents, commands, and
    /// skills categories.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ShellExpansion`] if home directory cannot be
    ///   expanded.
    pub fn builtin() -> Result<Self> {
        BUILTIN_MANIFEST.parse()
    }

    /// Look up resource entry by name.
    pub fn resource(&self, name: &str) -> Option<&ResourceEntry> {
        self.resources.iter().find(|entry| entry.name == name)
    }

    /// Look up agent entry by name.
    pub fn agent(&self, name: &str) -> Option<&AgentEntry> {
        self.agents.iter().find(|entry| entry.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            check_name("resource", &resource.name)?;
            if !seen.insert(resource.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "resource",
                    name: resource.name.clone(),
                });
            }

            for group in resource.nested.iter().flatten() {
                for item in &group.items {
                    check_name("nested item", item)?;
                }
            }
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            check_name("agent", &agent.name)?;
            if !seen.insert(agent.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "agent",
                    name: agent.name.clone(),
                });
            }

            // INVARIANT: Agents may only opt into declared resources.
            for resource in agent.resources.iter().flatten() {
                if self.resource(resource).is_none() {
                    return Err(ConfigError::UnknownResource {
                        agent: agent.name.clone(),
                        resource: resource.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut manifest: Manifest = toml::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(root) = manifest.settings.shared_root.take() {
            manifest.settings.shared_root = Some(expand(&root)?);
        }
        for agent in &mut manifest.agents {
            agent.config_dir = ConfigDir::new(expand(agent.config_dir.as_path())?);
        }

        manifest.validate()?;

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Manifest-wide settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManifestSettings {
    /// Path to shared configuration repository.
    pub shared_root: Option<PathBuf>,
}

/// Shareable resource category entry.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ResourceEntry {
    /// Name of category, also the name of its directory on both sides.
    pub name: String,

    /// Brief description of what the category holds.
    #[serde(default)]
    pub description: String,

    /// File that marks the root of a single item, e.g., "SKILL.md".
    pub marker: Option<String>,

    /// Groups of items kept in a sub-directory of the category.
    pub nested: Option<Vec<NestedGroup>>,
}

/// Group of items nested below a category directory.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct NestedGroup {
    /// Display name of the group.
    pub name: String,

    /// Directory of the group relative to the category directory.
    pub base_path: PathBuf,

    /// Items the group provides.
    #[serde(default)]
    pub items: Vec<String>,
}

/// Agent installation entry.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct AgentEntry {
    /// Identifier of agent.
    pub name: String,

    /// Configuration root of agent.
    pub config_dir: ConfigDir,

    /// Directory name an item may use to ship an agent-specific layout.
    pub layout_dir: Option<String>,

    /// Supported resource categories. All categories when omitted.
    pub resources: Option<Vec<String>>,
}

/// Path acting as the configuration root of an agent.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ConfigDir(PathBuf);

impl ConfigDir {
    /// Construct new configuration root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat configuration root as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for ConfigDir {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

fn check_name(kind: &'static str, name: &str) -> Result<()> {
    if !is_single_component(name) {
        return Err(ConfigError::InvalidName {
            kind,
            name: name.into(),
        });
    }

    Ok(())
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

    /// Name cannot be used as a single path component.
    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },

    /// Name declared more than once.
    #[error("{kind} {name:?} declared more than once")]
    Duplicate { kind: &'static str, name: String },

    /// Agent refers to a resource that was never declared.
    #[error("agent {agent:?} refers to undeclared resource {resource:?}")]
    UnknownResource { agent: String, resource: String },
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

    #[sealed_test(env = [("BLAH", "/home/blah")])]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            [settings]
            shared_root = "$BLAH/shared"

            [[resource]]
            name = "skills"
            description = "blah blah blah"
            marker = "SKILL.md"

            [[resource.nested]]
            name = "anthropic"
            base_path = "anthropic-skills"
            items = ["pdf", "docx"]

            [[agent]]
            name = "claude-code"
            config_dir = "$BLAH/.claude"
            layout_dir = ".claude"
            resources = ["skills"]
        "#}
        .parse()?;

        let expect = Manifest {
            settings: ManifestSettings {
                shared_root: Some("/home/blah/shared".into()),
            },
            resources: vec![ResourceEntry {
                name: "skills".into(),
                description: "blah blah blah".into(),
                marker: Some("SKILL.md".into()),
                nested: Some(vec![NestedGroup {
                    name: "anthropic".into(),
                    base_path: "anthropic-skills".into(),
                    items: vec!["pdf".into(), "docx".into()],
                }]),
            }],
            agents: vec![AgentEntry {
                name: "claude-code".into(),
                config_dir: ConfigDir::new("/home/blah/.claude"),
                layout_dir: Some(".claude".into()),
                resources: Some(vec!["skills".into()]),
            }],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialized_manifest_parses_back() -> anyhow::Result<()> {
        let manifest = Manifest {
            settings: ManifestSettings {
                shared_root: Some("/srv/shared".into()),
            },
            resources: vec![ResourceEntry {
                name: "agents".into(),
                description: "blah".into(),
                marker: None,
                nested: None,
            }],
            agents: vec![AgentEntry {
                name: "codex".into(),
                config_dir: ConfigDir::new("/home/blah/.codex"),
                layout_dir: None,
                resources: None,
            }],
        };

        let result: Manifest = manifest.to_string().parse()?;
        assert_eq!(result, manifest);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn builtin_manifest_covers_known_agents() -> anyhow::Result<()> {
        let manifest = Manifest::builtin()?;

        let agents: Vec<_> = manifest.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(agents, vec!["claude-code", "opencode", "codex"]);

        let resources: Vec<_> = manifest.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(resources, vec!["agents", "commands", "skills"]);

        let claude = manifest.agent("claude-code").map(|a| a.config_dir.as_path());
        assert_eq!(claude, Some(Path::new("/home/blah/.claude")));

        Ok(())
    }

    #[test]
    fn reject_path_like_resource_name() {
        let result = indoc! {r#"
            [[resource]]
            name = "../escape"
        "#}
        .parse::<Manifest>();

        assert!(matches!(result, Err(ConfigError::InvalidName { kind: "resource", .. })));
    }

    #[test]
    fn reject_duplicate_agent() {
        let result = indoc! {r#"
            [[agent]]
            name = "codex"
            config_dir = "/a"

            [[agent]]
            name = "codex"
            config_dir = "/b"
        "#}
        .parse::<Manifest>();

        assert!(matches!(result, Err(ConfigError::Duplicate { kind: "agent", .. })));
    }

    #[test]
    fn reject_undeclared_agent_resource() {
        let result = indoc! {r#"
            [[resource]]
            name = "skills"

            [[agent]]
            name = "codex"
            config_dir = "/a"
            resources = ["commands"]
        "#}
        .parse::<Manifest>();

        assert!(matches!(result, Err(ConfigError::UnknownResource { .. })));
    }
}
