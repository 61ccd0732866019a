// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Agent registry and resource categories.
//!
//! The manifest is a serialization format. The registry is what the sync
//! engine actually works with: an ordered, immutable table of agents and the
//! categories they accept, built once per run.

use crate::config::{Manifest, NestedGroup};

use std::path::{Path, PathBuf};

/// An installed, or installable, coding assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    name: String,
    root: PathBuf,
    layout_dir: Option<String>,
    resources: Option<Vec<String>>,
}

impl Agent {
    /// Construct new agent that accepts every category.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            layout_dir: None,
            resources: None,
        }
    }

    /// Identifier of agent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration root of agent.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name items may use to ship an agent-specific layout.
    pub fn layout_dir(&self) -> Option<&str> {
        self.layout_dir.as_deref()
    }

    /// Agent is installed when its configuration root is a directory.
    pub fn is_installed(&self) -> bool {
        self.root.is_dir()
    }

    /// Check if agent accepts given category.
    pub fn supports(&self, category: &ResourceCategory) -> bool {
        match &self.resources {
            Some(resources) => resources.iter().any(|name| name == category.name()),
            None => true,
        }
    }
}

/// Shareable class of configuration, e.g., "skills".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCategory {
    name: String,
    description: String,
    marker: Option<String>,
    nested: Vec<NestedGroup>,
}

impl ResourceCategory {
    /// Construct new category without a marker file or nested groups.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            marker: None,
            nested: Vec::new(),
        }
    }

    /// Name of category, and of its directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Brief description of category.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// File that marks the root of an item.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Groups of items nested below the category directory.
    pub fn nested(&self) -> &[NestedGroup] {
        &self.nested
    }
}

/// Ordered table of agents and categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    categories: Vec<ResourceCategory>,
}

impl AgentRegistry {
    /// Construct registry from explicit agents and categories.
    pub fn new(agents: Vec<Agent>, categories: Vec<ResourceCategory>) -> Self {
        Self { agents, categories }
    }

    /// Find agent by identifier.
    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.name == name)
    }

    /// Find category by name.
    pub fn category(&self, name: &str) -> Option<&ResourceCategory> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// Iterate through agents in manifest order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Iterate through categories in manifest order.
    pub fn categories(&self) -> impl Iterator<Item = &ResourceCategory> {
        self.categories.iter()
    }
}

impl From<&Manifest> for AgentRegistry {
    fn from(manifest: &Manifest) -> Self {
        let agents = manifest
            .agents
            .iter()
            .map(|entry| Agent {
                name: entry.name.clone(),
                root: entry.config_dir.as_path().to_path_buf(),
                layout_dir: entry.layout_dir.clone(),
                resources: entry.resources.clone(),
            })
            .collect();

        let categories = manifest
            .resources
            .iter()
            .map(|entry| ResourceCategory {
                name: entry.name.clone(),
                description: entry.description.clone(),
                marker: entry.marker.clone(),
                nested: entry.nested.clone().unwrap_or_default(),
            })
            .collect();

        Self { agents, categories }
    }
}
