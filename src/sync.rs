// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Sync engine.
//!
//! The __sync engine__ places shared resource categories into the
//! configuration roots of every known agent. The shared repository holds one
//! directory per category, and every category directory holds zero or more
//! named items. For each (agent, category) pair the engine derives two paths:
//!
//! - `source`: `<shared-root>/<category>`
//! - `target`: `<agent-root>/<category>`
//!
//! Narrowing a run to a single item appends the item name to both paths.
//!
//! # Operations
//!
//! - __Link__: replace target with a symbolic link to source. Edits made in
//!   the shared repository show up in every agent right away.
//! - __Copy__: replace target with an independent recursive copy of source.
//! - __Status__: report what currently sits at target.
//! - __Clean__: remove target if, and only if, it is a symbolic link.
//!
//! Anything that is not a link gets moved to `<target>.backup.<timestamp>`
//! before Link or Copy replace it, so nothing is ever deleted outright.
//!
//! # Failure Model
//!
//! Invalid filters are rejected before the filesystem is touched. After that,
//! every pair is evaluated on its own. A pair that fails is recorded in the
//! [`Report`], and the run moves on to the next pair. Completed pairs are
//! never rolled back.

pub mod report;
pub mod state;

mod place;
mod resolve;

pub use report::{Entry, Outcome, Report, SkipReason};
pub use state::LinkState;

use crate::{
    config::Manifest,
    path::is_single_component,
    registry::{Agent, AgentRegistry, ResourceCategory},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{info, instrument, warn};

/// Operation applied to every selected pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Link,
    Copy,
    Status,
    Clean,
}

impl Display for Operation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Link => "link",
            Self::Copy => "copy",
            Self::Status => "status",
            Self::Clean => "clean",
        })
    }
}

/// How shared resources get placed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Symbolic link, edits propagate.
    #[default]
    Link,

    /// One-time recursive copy, independent afterwards.
    Copy,
}

impl From<Strategy> for Operation {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Link => Self::Link,
            Strategy::Copy => Self::Copy,
        }
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "link" | "symlink" => Ok(Self::Link),
            "copy" => Ok(Self::Copy),
            _ => Err(ParseStrategyError(data.into())),
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&Operation::from(*self), fmt)
    }
}

/// Strategy name is neither "link", "symlink", nor "copy".
#[derive(Clone, Debug, thiserror::Error)]
#[error("unknown strategy {0:?}, expected link or copy")]
pub struct ParseStrategyError(String);

/// Narrow a run to one agent, one category, or one item.
///
/// Every unset field matches everything. An item is only meaningful inside
/// of a category, so setting an item without a category is rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filter {
    pub agent: Option<String>,
    pub category: Option<String>,
    pub item: Option<String>,
}

impl Filter {
    /// Match every agent and category.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    fn matches_agent(&self, agent: &Agent) -> bool {
        self.agent.as_deref().is_none_or(|name| name == agent.name())
    }

    fn matches_category(&self, category: &ResourceCategory) -> bool {
        self.category
            .as_deref()
            .is_none_or(|name| name == category.name())
    }
}

/// Paths derived for a single (agent, category) pair.
///
/// Computed on demand and never persisted.
#[derive(Debug, Clone)]
pub struct SyncTarget<'a> {
    agent: &'a Agent,
    category: &'a ResourceCategory,
    item: Option<&'a str>,
    source: PathBuf,
    target: PathBuf,
}

impl<'a> SyncTarget<'a> {
    /// Derive source and target paths of pair.
    pub fn new(
        shared_root: &Path,
        agent: &'a Agent,
        category: &'a ResourceCategory,
        item: Option<&'a str>,
    ) -> Self {
        let mut source = shared_root.join(category.name());
        let mut target = agent.root().join(category.name());
        if let Some(item) = item {
            source.push(item);
            target.push(item);
        }

        Self {
            agent,
            category,
            item,
            source,
            target,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Category path under agent root that holds the target.
    fn category_target(&self) -> PathBuf {
        self.agent.root().join(self.category.name())
    }

    fn entry(&self, outcome: Outcome) -> Entry {
        Entry {
            agent: self.agent.name().into(),
            category: Some(self.category.name().into()),
            item: self.item.map(Into::into),
            outcome,
        }
    }
}

/// Item listing of a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListing {
    pub category: String,
    pub items: Vec<String>,
    pub nested: Vec<(String, Vec<String>)>,
}

impl Display for ItemListing {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{}:", self.category)?;
        if self.items.is_empty() && self.nested.is_empty() {
            return writeln!(fmt, "  (empty)");
        }

        for item in &self.items {
            writeln!(fmt, "  - {item}")?;
        }

        for (group, items) in &self.nested {
            writeln!(fmt, "  [{group}]")?;
            for item in items {
                writeln!(fmt, "    - {item}")?;
            }
        }

        Ok(())
    }
}

/// Summary of a single category in the shared repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    pub files: Option<usize>,
    pub agents: Vec<String>,
}

impl Display for ResourceSummary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{}:", self.name)?;
        writeln!(fmt, "  description: {}", self.description)?;
        writeln!(fmt, "  path: {}", self.path.display())?;
        if let Some(files) = self.files {
            writeln!(fmt, "  files: {files}")?;
        }
        writeln!(fmt, "  agents: {}", self.agents.join(", "))
    }
}

/// Engine that places shared categories into agent configuration roots.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    shared_root: PathBuf,
    registry: AgentRegistry,
}

impl SyncEngine {
    /// Construct new sync engine.
    ///
    /// Shared root is made absolute, so links never depend on the current
    /// directory.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Filesystem`] if shared root cannot be made
    ///   absolute.
    pub fn new(shared_root: impl AsRef<Path>, registry: AgentRegistry) -> Result<Self> {
        let shared_root = std::path::absolute(shared_root.as_ref())
            .map_err(place::fs_error(shared_root.as_ref()))?;

        Ok(Self {
            shared_root,
            registry,
        })
    }

    /// Construct new sync engine from manifest.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Filesystem`] if shared root cannot be made
    ///   absolute.
    pub fn from_manifest(shared_root: impl AsRef<Path>, manifest: &Manifest) -> Result<Self> {
        Self::new(shared_root, AgentRegistry::from(manifest))
    }

    pub fn shared_root(&self) -> &Path {
        &self.shared_root
    }

    /// Link shared categories into agent roots.
    pub fn link(&self, filter: &Filter) -> Result<Report> {
        self.run(Operation::Link, filter)
    }

    /// Copy shared categories into agent roots.
    pub fn copy(&self, filter: &Filter) -> Result<Report> {
        self.run(Operation::Copy, filter)
    }

    /// Report state of categories in agent roots.
    pub fn status(&self, filter: &Filter) -> Result<Report> {
        self.run(Operation::Status, filter)
    }

    /// Remove links from agent roots.
    pub fn clean(&self, filter: &Filter) -> Result<Report> {
        self.run(Operation::Clean, filter)
    }

    /// Apply operation to every pair selected by filter.
    ///
    /// Agents whose configuration root does not exist are skipped. Failure of
    /// one pair does not stop the others. Check the returned [`Report`] for
    /// per-pair results.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::InvalidArguments`] if an item is given without a
    ///   category.
    /// - Return [`SyncError::UnknownAgent`], [`SyncError::UnknownCategory`],
    ///   or [`SyncError::InvalidItem`] if filter names something that cannot
    ///   be addressed.
    #[instrument(skip(self, filter), level = "debug")]
    pub fn run(&self, operation: Operation, filter: &Filter) -> Result<Report> {
        self.check(filter)?;

        let mut report = Report::new(operation);
        for agent in self.registry.agents().filter(|agent| filter.matches_agent(agent)) {
            if !agent.is_installed() {
                info!(
                    "skip {}: not installed ({})",
                    agent.name(),
                    agent.root().display()
                );
                report.push(Entry {
                    agent: agent.name().into(),
                    category: None,
                    item: None,
                    outcome: Outcome::Skipped(SkipReason::AgentNotInstalled {
                        root: agent.root().to_path_buf(),
                    }),
                });
                continue;
            }

            for category in self
                .registry
                .categories()
                .filter(|category| filter.matches_category(category))
            {
                let target =
                    SyncTarget::new(&self.shared_root, agent, category, filter.item.as_deref());
                if !agent.supports(category) {
                    report.push(target.entry(Outcome::Skipped(SkipReason::Unsupported)));
                    continue;
                }

                let outcome = match operation {
                    Operation::Link => self.apply_link(&target),
                    Operation::Copy => self.apply_copy(&target),
                    Operation::Status => self.apply_status(&target),
                    Operation::Clean => self.apply_clean(&target),
                }
                .unwrap_or_else(Outcome::Failed);

                let entry = target.entry(outcome);
                if let Outcome::Failed(error) = &entry.outcome {
                    warn!("{}: {error}", entry.label());
                }
                report.push(entry);
            }
        }

        Ok(report)
    }

    /// List items of categories in shared repository.
    ///
    /// Hidden entries are skipped, and items are sorted by name. Items of
    /// nested groups are listed by group.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::UnknownCategory`] if category is not known.
    /// - Return [`SyncError::Filesystem`] if category directory cannot be read.
    pub fn list_items(&self, only: Option<&str>) -> Result<Vec<ItemListing>> {
        if let Some(name) = only {
            self.known_category(name)?;
        }

        let mut listings = Vec::new();
        for category in self
            .registry
            .categories()
            .filter(|category| only.is_none_or(|name| name == category.name()))
        {
            let path = self.shared_root.join(category.name());
            let mut items = Vec::new();
            match fs::read_dir(&path) {
                Ok(entries) => {
                    for entry in entries {
                        let name = entry
                            .map_err(place::fs_error(&path))?
                            .file_name()
                            .to_string_lossy()
                            .into_owned();
                        if !name.starts_with('.') {
                            items.push(name);
                        }
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(place::fs_error(&path)(error)),
            }
            items.sort();

            let nested = category
                .nested()
                .iter()
                .map(|group| {
                    let mut items = group.items.clone();
                    items.sort();
                    (group.name.clone(), items)
                })
                .collect();

            listings.push(ItemListing {
                category: category.name().into(),
                items,
                nested,
            });
        }

        Ok(listings)
    }

    /// Summarize every category of shared repository.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Walk`] if category directory cannot be walked.
    pub fn list_resources(&self) -> Result<Vec<ResourceSummary>> {
        self.registry
            .categories()
            .map(|category| -> Result<ResourceSummary> {
                let path = self.shared_root.join(category.name());
                let files = if path.is_dir() {
                    Some(place::count_files(&path)?)
                } else {
                    None
                };
                let agents = self
                    .registry
                    .agents()
                    .filter(|agent| agent.supports(category))
                    .map(|agent| agent.name().to_string())
                    .collect();

                Ok(ResourceSummary {
                    name: category.name().into(),
                    description: category.description().into(),
                    path,
                    files,
                    agents,
                })
            })
            .collect()
    }

    fn check(&self, filter: &Filter) -> Result<()> {
        if filter.item.is_some() && filter.category.is_none() {
            return Err(SyncError::InvalidArguments(
                "an item can only be selected together with its category".into(),
            ));
        }

        if let Some(agent) = &filter.agent {
            if self.registry.agent(agent).is_none() {
                return Err(SyncError::UnknownAgent(agent.clone()));
            }
        }

        if let Some(category) = &filter.category {
            self.known_category(category)?;
        }

        if let Some(item) = &filter.item {
            if !is_single_component(item) {
                return Err(SyncError::InvalidItem(item.clone()));
            }
        }

        Ok(())
    }

    fn known_category(&self, name: &str) -> Result<&ResourceCategory> {
        self.registry
            .category(name)
            .ok_or_else(|| SyncError::UnknownCategory(name.into()))
    }

    fn placement_source(&self, target: &SyncTarget<'_>) -> Result<PathBuf> {
        let source = match target.item {
            Some(item) => {
                resolve::item_source(&self.shared_root, target.agent, target.category, item)
            }
            None => target.source.clone(),
        };

        if !source.exists() {
            return Err(SyncError::MissingSource { path: source });
        }

        Ok(source)
    }

    // INVARIANT: Never create item paths through a linked category path.
    //   - Doing so would write into the shared repository itself.
    fn prepare_category(&self, target: &SyncTarget<'_>) -> Result<()> {
        if target.item.is_none() {
            return Ok(());
        }

        let path = target.category_target();
        if place::lstat(&path)?.is_some_and(|meta| meta.file_type().is_symlink()) {
            return Err(SyncError::CategoryIsLink { path });
        }

        fs::create_dir_all(&path).map_err(place::fs_error(&path))
    }

    /// State of item decided by its category path alone.
    ///
    /// An item cannot be probed on its own when its category path is a link,
    /// or when it is a regular file that nothing can live below.
    fn category_state(&self, target: &SyncTarget<'_>) -> Result<Option<LinkState>> {
        if target.item.is_none() {
            return Ok(None);
        }

        let path = target.category_target();
        match place::lstat(&path)? {
            Some(meta) if meta.file_type().is_symlink() => {
                let destination = fs::read_link(&path).map_err(place::fs_error(&path))?;
                Ok(Some(LinkState::ViaCategoryLink(destination)))
            }
            Some(meta) if !meta.is_dir() => Ok(Some(LinkState::Missing)),
            _ => Ok(None),
        }
    }

    fn apply_link(&self, target: &SyncTarget<'_>) -> Result<Outcome> {
        let source = self.placement_source(target)?;
        self.prepare_category(target)?;

        let path = target.target();
        let backup = match place::lstat(path)? {
            Some(meta) if meta.file_type().is_symlink() => {
                place::remove_link(path)?;
                None
            }
            Some(_) => Some(place::backup(path)?),
            None => None,
        };

        place::symlink(&source, path)?;
        info!("link {} -> {}", path.display(), source.display());

        Ok(Outcome::Linked {
            target: path.to_path_buf(),
            source,
            backup,
        })
    }

    fn apply_copy(&self, target: &SyncTarget<'_>) -> Result<Outcome> {
        let source = self.placement_source(target)?;
        self.prepare_category(target)?;

        let path = target.target();
        let backup = match place::lstat(path)? {
            Some(meta) => {
                if meta.file_type().is_symlink() {
                    warn!(
                        "{} is a symbolic link, its backup keeps the link, not its contents",
                        path.display()
                    );
                }
                Some(place::backup(path)?)
            }
            None => None,
        };

        let files = place::copy_tree(&source, path)?;
        info!(
            "copy {} -> {} ({files} files)",
            source.display(),
            path.display()
        );

        Ok(Outcome::Copied {
            target: path.to_path_buf(),
            source,
            files,
            backup,
        })
    }

    fn apply_status(&self, target: &SyncTarget<'_>) -> Result<Outcome> {
        let state = match self.category_state(target)? {
            Some(state) => state,
            None => LinkState::probe(target.target())?,
        };

        Ok(Outcome::State {
            target: target.target().to_path_buf(),
            backups: state::count_backups(target.target())?,
            state,
        })
    }

    fn apply_clean(&self, target: &SyncTarget<'_>) -> Result<Outcome> {
        let path = target.target();
        if let Some(state) = self.category_state(target)? {
            return Ok(Outcome::Untouched {
                target: path.to_path_buf(),
                state,
            });
        }

        match LinkState::probe(path)? {
            LinkState::Symlink(_) => {
                place::remove_link(path)?;
                info!("remove link {}", path.display());
                Ok(Outcome::Removed {
                    target: path.to_path_buf(),
                })
            }
            state => Ok(Outcome::Untouched {
                target: path.to_path_buf(),
                state,
            }),
        }
    }
}

/// All possible error types for syncing.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Combination of options cannot be applied.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Agent is not listed in the registry.
    #[error("unknown agent {0:?}")]
    UnknownAgent(String),

    /// Category is not listed in the registry.
    #[error("unknown resource category {0:?}")]
    UnknownCategory(String),

    /// Item name is not a single path component.
    #[error("invalid item name {0:?}")]
    InvalidItem(String),

    /// Category or item does not exist in shared repository.
    #[error("source does not exist: {}", path.display())]
    MissingSource { path: PathBuf },

    /// Item requested below a category path that is a link.
    #[error("{} is a symbolic link, clean it before syncing single items", path.display())]
    CategoryIsLink { path: PathBuf },

    /// Filesystem operation failed.
    #[error("{}: {error}", path.display())]
    Filesystem { path: PathBuf, error: io::Error },

    /// Directory walk failed.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Backup pattern could not be built.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// Friendly result alias :3
pub(crate) type Result<T, E = SyncError> = std::result::Result<T, E>;
