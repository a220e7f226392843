//! `boxsetctl`: run catalog reconciliation tasks from the command line.

mod loader;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use boxset_core::{
    HttpLookupClient, InMemoryCatalog, RunOutcome, SingleRunGuard, SyncConfig,
    SyncContext, SyncTask, build_tasks,
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::loader::{ConfigLoader, LoadedConfig};

#[derive(Parser)]
#[command(
    name = "boxsetctl",
    version,
    about = "Reconcile a media catalog with a remote metadata source"
)]
struct Cli {
    /// Config file (TOML or JSON). Overrides BOXSET_CONFIG_PATH.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Env file loaded before anything else
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the task kinds the configuration defines
    Tasks,
    /// Run one or more tasks against a catalog snapshot
    Run {
        /// Task kinds to run, e.g. fill-primary-ids or collection:top
        kinds: Vec<String>,
        /// Run every configured task
        #[arg(long, conflicts_with = "kinds")]
        all: bool,
        /// Catalog snapshot (JSON); written back after the run
        #[arg(long)]
        catalog: PathBuf,
        /// Override batch_size from the config
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let env_file_loaded = match dotenvy::from_path(&cli.env_file) {
        Ok(()) => true,
        Err(err) if err.not_found() => false,
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to load {}", cli.env_file.display())
            });
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxset::guard=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_file_loaded {
        info!(path = %cli.env_file.display(), "loaded env file");
    }

    let loaded = ConfigLoader::from_env()
        .load(cli.config.as_deref())
        .context("failed to load configuration")?;
    info!(source = %loaded.source, "configuration loaded");

    match cli.command {
        Command::Tasks => {
            for kind in loaded.config.task_kinds() {
                println!("{kind}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckConfig => check_config(&loaded),
        Command::Run {
            kinds,
            all,
            catalog,
            batch_size,
        } => {
            let mut config = loaded.config;
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
                config.validate()?;
            }
            run(config, &kinds, all, &catalog).await
        }
    }
}

fn check_config(loaded: &LoadedConfig) -> Result<ExitCode> {
    let mut shown = loaded.config.clone();
    if shown.lookup.api_key.is_some() {
        shown.lookup.api_key = Some("<redacted>".into());
    }
    println!("# source: {}", loaded.source);
    if loaded.api_key_from_env {
        println!("# lookup.api_key taken from {}", loader::API_KEY_VAR);
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(ExitCode::SUCCESS)
}

fn select_tasks(
    tasks: Vec<SyncTask>,
    kinds: &[String],
    all: bool,
) -> Result<Vec<SyncTask>> {
    if all {
        return Ok(tasks);
    }
    if kinds.is_empty() {
        bail!("name at least one task kind or pass --all");
    }
    let mut selected = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let Some(task) = tasks.iter().find(|task| task.kind().as_str() == kind)
        else {
            let known: Vec<_> =
                tasks.iter().map(|task| task.kind().to_string()).collect();
            bail!("unknown task '{kind}' (configured: {})", known.join(", "));
        };
        selected.push(task.clone());
    }
    Ok(selected)
}

async fn run(
    config: SyncConfig,
    kinds: &[String],
    all: bool,
    catalog_path: &Path,
) -> Result<ExitCode> {
    let catalog = Arc::new(
        InMemoryCatalog::load(catalog_path).await.with_context(|| {
            format!("failed to load catalog {}", catalog_path.display())
        })?,
    );
    let lookup = Arc::new(
        HttpLookupClient::new(&config.lookup)
            .context("failed to build lookup client")?,
    );
    let context = SyncContext::new(lookup, catalog.clone())
        .with_batch_size(config.batch_size);
    let guard = Arc::new(SingleRunGuard::with_kinds(config.task_kinds()));
    let tasks =
        select_tasks(build_tasks(&config, &context, &guard), kinds, all)?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping at the next checkpoint");
            signal.cancel();
        }
    });

    let mut failed = 0;
    for task in &tasks {
        if cancel.is_cancelled() {
            warn!(task = %task.kind(), "not started: run was cancelled");
            continue;
        }
        let kind = task.kind().clone();
        let progress = move |percent: f64| {
            info!(task = %kind, progress = percent, "progress");
        };
        let outcome = task.run(cancel.clone(), &progress).await;
        println!("{}: {outcome}", task.kind());
        if let RunOutcome::Failed(_) = outcome {
            failed += 1;
        }
    }

    catalog.save(catalog_path).await.with_context(|| {
        format!("failed to save catalog {}", catalog_path.display())
    })?;
    info!(path = %catalog_path.display(), "catalog saved");

    if failed > 0 {
        warn!(failed, total = tasks.len(), "some tasks failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
