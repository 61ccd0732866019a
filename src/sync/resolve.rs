// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Item source resolution.
//!
//! A single item does not always sit at `<shared>/<category>/<item>`. Items
//! may live in a nested group directory, may ship a layout dedicated to one
//! agent, or may wrap the real item root a few directories down. The real
//! root is recognized by the category's marker file, e.g., "SKILL.md".

use crate::registry::{Agent, ResourceCategory};

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Deepest level searched for a marker file.
const MARKER_DEPTH: usize = 3;

/// Determine source path of an item for given agent.
///
/// Does not check that the path returned exists.
pub(crate) fn item_source(
    shared_root: &Path,
    agent: &Agent,
    category: &ResourceCategory,
    item: &str,
) -> PathBuf {
    let base = shared_root.join(category.name());
    let mut source = base.join(item);

    if !source.exists() {
        if let Some(group) = category
            .nested()
            .iter()
            .find(|group| group.items.iter().any(|name| name == item))
        {
            debug!("found {item} in nested group {}", group.name);
            source = base.join(&group.base_path).join(item);
        }
    }

    let Some(marker) = category.marker() else {
        return source;
    };
    if !source.is_dir() {
        return source;
    }

    if let Some(layout) = agent.layout_dir() {
        let dedicated = source.join(layout).join(category.name()).join(item);
        if dedicated.is_dir() {
            debug!("use {} layout at {}", agent.name(), dedicated.display());
            return dedicated;
        }
    }

    if source.join(marker).exists() {
        return source;
    }

    match find_marker(&source, marker) {
        Some(root) => {
            debug!("use nested item root {}", root.display());
            root
        }
        None => {
            warn!("no {marker} found in {}", source.display());
            source
        }
    }
}

fn find_marker(start: &Path, marker: &str) -> Option<PathBuf> {
    WalkBuilder::new(start)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(MARKER_DEPTH))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_name() == marker && entry.file_type().is_some_and(|kind| kind.is_file())
        })
        .and_then(|entry| entry.path().parent().map(Path::to_path_buf))
}
