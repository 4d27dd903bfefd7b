//! querystash command-line entry point.
//!
//! Exposes manual cache flushing over the configured backend. Logging
//! goes to stderr so the command output stays scriptable.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use querystash_core::store::open_store;
use querystash_core::{AppConfig, EntityRegistry, InvalidationRouter};

#[derive(Parser)]
#[command(name = "querystash", version, about = "Query-result cache maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flush cached query results.
    ///
    /// Without an entity this flushes every scope. An unknown entity
    /// is reported but still exits 0, so scripted flushes stay
    /// non-fatal.
    Flush {
        /// Entity type whose scope should be flushed.
        entity: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Flush { entity } => flush(entity),
    }
}

fn flush(entity: Option<String>) -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    let registry = Arc::new(EntityRegistry::from_config(&config));
    let store = open_store(&config).context("failed to open cache backend")?;
    let backend = store.backend_name();
    tracing::debug!(backend, entities = registry.entity_names().len(), "cache backend ready");
    let router = InvalidationRouter::new(store, registry.clone());

    let (label, outcome) = match entity {
        Some(name) => match router.invalidate_reporting(&name) {
            Ok(outcome) => (format!("scope `{name}`"), outcome),
            Err(e) => {
                // Deliberately exits 0: see the flush subcommand help.
                eprintln!("error: {e}");
                let mut known = registry.entity_names();
                known.sort_unstable();
                eprintln!("known entities: {}", known.join(", "));
                return Ok(());
            }
        },
        None => ("all scopes".to_string(), router.flush_everything()),
    };

    println!("flushed {label} using {} strategy on {backend} backend", outcome.strategy);
    if !outcome.flushed {
        eprintln!("warning: flush reported failure; cache may be stale until TTL expiry");
    }

    Ok(())
}
