//! Development Feed Tail
//!
//! Opens a task store, seeds a demo user when it is empty, and prints both
//! change feeds to stdout as JSON lines. Intents typed on stdin (one JSON
//! object per line) are applied as the demo user, so the feeds can be
//! watched reacting to every mutation.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin dev-feed
//!
//! # Persistent libsql store
//! TASKLISTS_DB_PATH=./data/tasklists.db cargo run --bin dev-feed
//!
//! # Then type, for example:
//! {"kind":"createList","title":"Errands"}
//! ```
//!
//! # Configuration
//!
//! - `TASKLISTS_DB_PATH`: libsql database file; in-memory store when unset
//! - `TASKLISTS_CONFIG`: engine config JSON, defaults to `tasklists.json`
//! - `TASKLISTS_USER`: user to seed and watch, defaults to `dev`
//! - `RUST_LOG`: log filter, defaults to `info`

use anyhow::Context;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tasklists_core::db::{EntityStore, MemoryStore, TursoStore};
use tasklists_core::models::{Intent, UserId};
use tasklists_core::services::{Outcome, Session, TaskService};
use tasklists_core::EngineConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

async fn open_store(config: &EngineConfig) -> anyhow::Result<Arc<dyn EntityStore>> {
    match std::env::var("TASKLISTS_DB_PATH") {
        Ok(path) => {
            let store =
                TursoStore::with_channel_capacity(PathBuf::from(path), config.feed_channel_capacity)
                    .await?;
            eprintln!("📂 Opened libsql store at {}", store.db_path().display());
            Ok(Arc::new(store))
        }
        Err(_) => {
            eprintln!("🧪 Using in-memory store (set TASKLISTS_DB_PATH to persist)");
            Ok(Arc::new(MemoryStore::with_channel_capacity(
                config.feed_channel_capacity,
            )))
        }
    }
}

/// Create a small demo tree unless the user already has lists
async fn seed(service: &TaskService, user: &UserId) -> anyhow::Result<()> {
    if !service.lists(user).await?.is_empty() {
        return Ok(());
    }

    let work = service.create_list(user, "Work", None).await?;
    service.create_list(user, "Home", None).await?;

    let report = service
        .create_root_task(user, &work.id, "Quarterly report", None)
        .await?
        .applied()
        .context("seed list disappeared")?;
    for title in ["Collect numbers", "Draft summary"] {
        service
            .create_child_task(user, &report.id, title, None)
            .await?
            .applied()
            .context("seed parent disappeared")?;
    }
    service
        .create_root_task(user, &work.id, "Book travel", None)
        .await?
        .applied()
        .context("seed list disappeared")?;

    eprintln!("🌱 Seeded demo lists for '{}'", user);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("TASKLISTS_CONFIG").unwrap_or_else(|_| "tasklists.json".to_string());
    let config = match EngineConfig::load(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", config_path, e);
            return Err(e.into());
        }
    };
    tracing::info!("Engine config: {:?}", config);

    let store = open_store(&config).await?;
    let service = TaskService::with_config(store, &config)?;
    let user = UserId::new(std::env::var("TASKLISTS_USER").unwrap_or_else(|_| "dev".to_string()));
    seed(&service, &user).await?;

    let mut session = Session::new(service);
    session.sign_in(user);

    session
        .watch_lists(|lists| match serde_json::to_string(&json!({ "lists": lists })) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to encode list snapshot: {}", e),
        })
        .applied()
        .context("session is not signed in")?;
    session
        .watch_tasks(|tasks| match serde_json::to_string(&json!({ "tasks": tasks })) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to encode task snapshot: {}", e),
        })
        .applied()
        .context("session is not signed in")?;

    eprintln!("👀 Watching feeds; type intents as JSON lines, Ctrl-C to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let intent: Intent = match serde_json::from_str(&line) {
                    Ok(intent) => intent,
                    Err(e) => {
                        eprintln!("❌ Not an intent: {}", e);
                        continue;
                    }
                };
                match session.apply(intent).await {
                    Ok(Outcome::Applied(result)) => println!("{}", json!({ "applied": result })),
                    Ok(Outcome::Rejected(rejection)) => {
                        println!("{}", json!({ "rejected": rejection.to_string() }))
                    }
                    Err(e) => eprintln!("❌ Intent failed: {}", e),
                }
            }
        }
    }

    session.sign_out();
    eprintln!("👋 Bye");
    Ok(())
}
