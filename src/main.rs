//! memories - note store server with a best-effort remote mirror
//!
//! Stores memories in a local SQLite slot and, when `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY` are set, mirrors every change to the remote
//! `memories` table.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use memorycore::local_storage::SqliteKeyValueStore;
use memorycore::remote::SupabaseMirror;
use memorycore::server::{start_server, stop_server};
use memorycore::{Config, NoteStore};

#[derive(Parser)]
#[command(name = "memories")]
#[command(about = "Memories note store with local persistence and a remote mirror")]
struct Args {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, env = "MEMORIES_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// HTTP server port (overrides config.json)
    #[arg(long, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the current directory, if any
    let _ = dotenv::dotenv();

    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = Config::new(args.config_dir).context("failed to load configuration")?;
    let port = args.port.unwrap_or_else(|| config.server_port());

    let slot = SqliteKeyValueStore::new(config.database_file())
        .with_context(|| format!("failed to open {}", config.database_file()))?;

    let mirror = SupabaseMirror::from_env();
    let mut store = NoteStore::open(slot, config.storage_key(), mirror);
    store.check_mirror_connection();
    tracing::info!(count = store.len(), "Memories ready");

    let store = Arc::new(Mutex::new(store));

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
            stop_server();
        }
    });

    start_server(Arc::clone(&store), port).await?;

    let pending = match store.lock() {
        Ok(mut store) => store.take_pending_mirrors(),
        Err(poisoned) => poisoned.into_inner().take_pending_mirrors(),
    };
    for handle in pending {
        let _ = handle.await;
    }

    Ok(())
}
