// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Outcome reporting.
//!
//! Every (agent, category) pair visited by the sync engine leaves exactly one
//! entry in the report, so partial completion is always legible.

use crate::sync::{state::LinkState, Operation, SyncError};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

/// Outcome of an entire run.
#[derive(Debug)]
pub struct Report {
    operation: Operation,
    entries: Vec<Entry>,
}

impl Report {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Entries in visiting order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Find entry for given agent and category.
    pub fn entry(&self, agent: &str, category: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.agent == agent && entry.category.as_deref() == Some(category))
    }

    pub fn succeeded(&self) -> usize {
        self.count(Outcome::is_success)
    }

    pub fn skipped(&self) -> usize {
        self.count(Outcome::is_skip)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    /// Number of links removed by clean.
    pub fn removed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Removed { .. }))
    }

    /// No pair failed. Skips do not count against a run.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, check: impl Fn(&Outcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| check(&entry.outcome))
            .count()
    }
}

impl Display for Report {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        for entry in &self.entries {
            writeln!(fmt, "{entry}")?;
        }

        write!(
            fmt,
            "{}: {} succeeded, {} skipped, {} failed",
            self.operation,
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Outcome of a single pair.
#[derive(Debug)]
pub struct Entry {
    /// Identifier of agent.
    pub agent: String,

    /// Category, absent when the whole agent was skipped.
    pub category: Option<String>,

    /// Single item inside of category.
    pub item: Option<String>,

    /// What happened.
    pub outcome: Outcome,
}

impl Entry {
    /// Label pair as "agent/category/item".
    pub fn label(&self) -> String {
        let mut label = self.agent.clone();
        for part in [&self.category, &self.item].into_iter().flatten() {
            label.push('/');
            label.push_str(part);
        }

        label
    }
}

impl Display for Entry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}: {}", self.label(), self.outcome)
    }
}

/// What happened to a single pair.
#[derive(Debug)]
pub enum Outcome {
    /// Target now links to source.
    Linked {
        target: PathBuf,
        source: PathBuf,
        backup: Option<PathBuf>,
    },

    /// Source copied to target.
    Copied {
        target: PathBuf,
        source: PathBuf,
        files: usize,
        backup: Option<PathBuf>,
    },

    /// Link at target removed.
    Removed { target: PathBuf },

    /// Clean left a target that is not a link alone.
    Untouched { target: PathBuf, state: LinkState },

    /// Observed state of target.
    State {
        target: PathBuf,
        state: LinkState,
        backups: usize,
    },

    /// Pair was not processed.
    Skipped(SkipReason),

    /// Pair failed. Other pairs are unaffected.
    Failed(SyncError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Linked { .. } | Self::Copied { .. } | Self::Removed { .. } | Self::State { .. }
        )
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Untouched { .. } | Self::Skipped(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl Display for Outcome {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Linked {
                target,
                source,
                backup,
            } => {
                write!(fmt, "linked {} -> {}", target.display(), source.display())?;
                write_backup(fmt, backup.as_ref())
            }
            Self::Copied {
                target,
                source,
                files,
                backup,
            } => {
                write!(
                    fmt,
                    "copied {} -> {} ({files} files)",
                    source.display(),
                    target.display()
                )?;
                write_backup(fmt, backup.as_ref())
            }
            Self::Removed { target } => write!(fmt, "removed link {}", target.display()),
            Self::Untouched { target, state } => {
                write!(fmt, "left {} alone, {state}", target.display())
            }
            Self::State {
                target,
                state,
                backups,
            } => {
                write!(fmt, "{state} at {}", target.display())?;
                if *backups > 0 {
                    write!(fmt, " [{backups} backups]")?;
                }
                Ok(())
            }
            Self::Skipped(reason) => write!(fmt, "skipped, {reason}"),
            Self::Failed(error) => write!(fmt, "failed, {error}"),
        }
    }
}

fn write_backup(fmt: &mut Formatter<'_>, backup: Option<&PathBuf>) -> FmtResult {
    match backup {
        Some(backup) => write!(fmt, " (backup at {})", backup.display()),
        None => Ok(()),
    }
}

/// Why a pair was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Configuration root of agent does not exist.
    AgentNotInstalled { root: PathBuf },

    /// Agent does not accept category.
    Unsupported,
}

impl Display for SkipReason {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::AgentNotInstalled { root } => {
                write!(fmt, "agent not installed ({})", root.display())
            }
            Self::Unsupported => fmt.write_str("category not supported by agent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_counts() {
        let mut report = Report::new(Operation::Clean);
        report.push(Entry {
            agent: "claude-code".into(),
            category: Some("skills".into()),
            item: None,
            outcome: Outcome::Removed {
                target: "/home/blah/.claude/skills".into(),
            },
        });
        report.push(Entry {
            agent: "codex".into(),
            category: Some("agents".into()),
            item: None,
            outcome: Outcome::Untouched {
                target: "/home/blah/.codex/agents".into(),
                state: LinkState::Directory { files: 2 },
            },
        });
        report.push(Entry {
            agent: "opencode".into(),
            category: None,
            item: None,
            outcome: Outcome::Skipped(SkipReason::AgentNotInstalled {
                root: "/home/blah/.opencode".into(),
            }),
        });

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.removed(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 0);
        assert!(report.is_success());

        let expect = [
            "claude-code/skills: removed link /home/blah/.claude/skills",
            "codex/agents: left /home/blah/.codex/agents alone, independent directory (2 files)",
            "opencode: skipped, agent not installed (/home/blah/.opencode)",
            "clean: 1 succeeded, 2 skipped, 0 failed",
        ]
        .join("\n");
        assert_eq!(report.to_string(), expect);
    }

    #[test]
    fn failure_marks_run_unsuccessful() {
        let mut report = Report::new(Operation::Link);
        report.push(Entry {
            agent: "opencode".into(),
            category: Some("skills".into()),
            item: Some("seo-optimizer".into()),
            outcome: Outcome::Failed(SyncError::MissingSource {
                path: "/srv/shared/skills/seo-optimizer".into(),
            }),
        });

        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(
            report.entries()[0].label(),
            "opencode/skills/seo-optimizer"
        );
    }
}
