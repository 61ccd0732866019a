// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Share configuration across AI coding assistants.
//!
//! Coding assistants like Claude Code, OpenCode, and Codex each keep their
//! own configuration root full of sub-agent definitions, slash commands, and
//! skills. Agentlink keeps one __shared repository__ of those resources, and
//! places each resource category into every installed assistant, either as a
//! symbolic link or as an independent copy.
//!
//! # Layout
//!
//! ```text
//! <shared-root>/
//!     agents/
//!     commands/
//!     skills/
//!         seo-optimizer/
//!             SKILL.md
//! ~/.claude/
//!     skills -> <shared-root>/skills
//! ```
//!
//! # See Also
//!
//! 1. [`Manifest`](crate::config::Manifest)
//! 2. [`SyncEngine`](crate::sync::SyncEngine)

pub mod config;
pub mod path;
pub mod registry;
pub mod sync;

pub use config::Manifest;
pub use registry::{Agent, AgentRegistry, ResourceCategory};
pub use sync::{Filter, LinkState, Operation, Report, Strategy, SyncEngine, SyncError};
