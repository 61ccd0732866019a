// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use agentlink::{
    config::Manifest,
    path::{default_manifest_path, SHARED_ROOT_ENV},
    sync::{Filter, Operation, Report, Strategy, SyncEngine},
};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::{
    env, fs,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "agentlink [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to shared configuration repository.
    #[arg(short, long, global = true, env = SHARED_ROOT_ENV, value_name = "path")]
    pub root: Option<PathBuf>,

    /// Path to manifest file instead of the default one.
    #[arg(short, long, global = true, value_name = "path")]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let manifest = load_manifest(self.manifest.as_deref())?;
        let shared_root = match self.root.or_else(|| manifest.settings.shared_root.clone()) {
            Some(root) => root,
            None => env::current_dir().context("cannot determine current directory")?,
        };
        let engine = SyncEngine::from_manifest(shared_root, &manifest)?;
        debug!("shared root {}", engine.shared_root().display());

        match self.command {
            Command::Sync(opts) => run_sync(&engine, opts),
            Command::SyncResource(opts) => run_sync_resource(&engine, opts),
            Command::SyncSingle(opts) => run_sync_single(&engine, opts),
            Command::Clean(opts) => run_clean(&engine, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Sync every resource category at once.
    #[command(override_usage = "agentlink sync --sync-all | --agent <id> | --status | --cleanup")]
    Sync(SyncOptions),

    /// Sync one resource category to one agent.
    #[command(override_usage = "agentlink sync-resource --agent <id> --resource <category>")]
    SyncResource(SyncResourceOptions),

    /// Sync one item of a resource category to one agent.
    #[command(override_usage = "agentlink sync-single --agent <id> --type <type> --item <item>")]
    SyncSingle(SyncSingleOptions),

    /// Remove symbolic links from agent configuration roots.
    #[command(override_usage = "agentlink clean [options]")]
    Clean(CleanOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
#[command(group(ArgGroup::new("mode").required(true).multiple(true)))]
struct SyncOptions {
    /// Sync all installed agents.
    #[arg(long, group = "mode")]
    pub sync_all: bool,

    /// Sync only target agent.
    #[arg(long, group = "mode", value_name = "agent")]
    pub agent: Option<String>,

    /// Show status of every agent.
    #[arg(long, group = "mode")]
    pub status: bool,

    /// Remove symbolic links, optionally only from target agent.
    #[arg(long, group = "mode")]
    pub cleanup: bool,

    /// Place resources by link or by copy.
    #[arg(long, default_value = "link", value_name = "link|copy")]
    pub strategy: Strategy,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncResourceOptions {
    /// Target agent.
    #[arg(long, value_name = "agent", required_unless_present = "list_resources")]
    pub agent: Option<String>,

    /// Resource category to sync.
    #[arg(long, value_name = "category", required_unless_present = "list_resources")]
    pub resource: Option<String>,

    /// Show status of resource category instead of syncing it.
    #[arg(long)]
    pub status: bool,

    /// Place resource by link or by copy.
    #[arg(long, default_value = "link", value_name = "link|copy")]
    pub strategy: Strategy,

    /// List every resource category of shared repository.
    #[arg(long, conflicts_with_all = ["agent", "resource", "status"])]
    pub list_resources: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncSingleOptions {
    /// Target agent.
    #[arg(long, value_name = "agent", required_unless_present = "list")]
    pub agent: Option<String>,

    /// Resource category holding the item, or the only one to list.
    #[arg(long = "type", value_name = "category", required_unless_present = "list")]
    pub category: Option<String>,

    /// Name of item, e.g., "seo-optimizer" or "code-reviewer.md".
    #[arg(long, value_name = "name", required_unless_present = "list")]
    pub item: Option<String>,

    /// Show status of item instead of syncing it.
    #[arg(long)]
    pub status: bool,

    /// Place item by link or by copy.
    #[arg(long, default_value = "link", value_name = "link|copy")]
    pub strategy: Strategy,

    /// List items of shared repository.
    #[arg(long, conflicts_with_all = ["agent", "item", "status"])]
    pub list: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CleanOptions {
    /// Only clean target agent.
    #[arg(long, value_name = "agent")]
    pub agent: Option<String>,

    /// Only clean target resource category.
    #[arg(long, value_name = "category")]
    pub resource: Option<String>,

    /// Only clean single item of resource category.
    #[arg(long, value_name = "name", requires = "resource")]
    pub item: Option<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_manifest(path: Option<&Path>) -> Result<Manifest> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_manifest_path()?;
            if !path.exists() {
                debug!("no manifest at {}, use built-in manifest", path.display());
                return Ok(Manifest::builtin()?);
            }
            path
        }
    };

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest = data
        .parse::<Manifest>()
        .with_context(|| format!("invalid manifest {}", path.display()))?;

    Ok(manifest)
}

fn run_sync(engine: &SyncEngine, opts: SyncOptions) -> Result<()> {
    let mut filter = Filter::all();
    if let Some(agent) = opts.agent {
        filter = filter.with_agent(agent);
    }

    let operation = if opts.status {
        Operation::Status
    } else if opts.cleanup {
        Operation::Clean
    } else {
        opts.strategy.into()
    };

    finish(engine.run(operation, &filter)?)
}

fn run_sync_resource(engine: &SyncEngine, opts: SyncResourceOptions) -> Result<()> {
    if opts.list_resources {
        for summary in engine.list_resources()? {
            info!("{summary}");
        }
        return Ok(());
    }

    let filter = Filter {
        agent: opts.agent,
        category: opts.resource,
        item: None,
    };
    let operation = if opts.status {
        Operation::Status
    } else {
        opts.strategy.into()
    };

    finish(engine.run(operation, &filter)?)
}

fn run_sync_single(engine: &SyncEngine, opts: SyncSingleOptions) -> Result<()> {
    if opts.list {
        for listing in engine.list_items(opts.category.as_deref())? {
            info!("{listing}");
        }
        return Ok(());
    }

    let filter = Filter {
        agent: opts.agent,
        category: opts.category,
        item: opts.item,
    };
    let operation = if opts.status {
        Operation::Status
    } else {
        opts.strategy.into()
    };

    finish(engine.run(operation, &filter)?)
}

fn run_clean(engine: &SyncEngine, opts: CleanOptions) -> Result<()> {
    let filter = Filter {
        agent: opts.agent,
        category: opts.resource,
        item: opts.item,
    };

    let report = engine.clean(&filter)?;
    info!("removed {} links", report.removed());
    finish(report)
}

fn finish(report: Report) -> Result<()> {
    info!("{report}");
    if !report.is_success() {
        bail!(
            "{} of {} targets failed",
            report.failed(),
            report.entries().len()
        );
    }

    Ok(())
}
