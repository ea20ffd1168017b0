//! `burnerbox` - terminal watcher for disposable-email inboxes
//!
//! Pins throwaway addresses and keeps their messages cached locally while
//! the process runs. Addresses are taken from the command line; with none
//! given, a fresh one is generated through the API.
//!
//! ```text
//! BURNERBOX_API=https://mail.example.com burnerbox temp123@example.com
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burnerbox_api::ApiClient;
use burnerbox_core::{Error, Lookup, LookupConfig, Scheduler, SqliteStore, refresh_all};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burnerbox=info,burnerbox_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url =
        std::env::var("BURNERBOX_API").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let api = ApiClient::new(base_url);

    let store = SqliteStore::new(&database_path()?.to_string_lossy()).await?;
    let config = LookupConfig::default();
    let interval = config.refresh_interval;
    let mut lookup = Lookup::open(Arc::new(store), config).await;

    for address in std::env::args().skip(1) {
        match lookup.add(&address).await {
            Ok(()) | Err(Error::DuplicateAddress(_)) => {}
            Err(e) => return Err(e).context(format!("cannot monitor {address}")),
        }
    }

    if lookup.is_empty() {
        let address = api
            .generate_address()
            .await
            .context("no addresses given and address generation failed")?;
        info!(%address, "generated a fresh address");
        lookup.add(&address).await?;
    }

    let lookup = Arc::new(Mutex::new(lookup));
    let fetcher: Arc<ApiClient> = Arc::new(api);

    let views = refresh_all(Arc::clone(&lookup), fetcher.clone()).await;
    for view in &views {
        info!(
            address = %view.inbox.address,
            messages = view.messages.len(),
            unread = view.unread,
            "inbox"
        );
        for message in &view.messages {
            info!(
                from = %message.sender,
                subject = %message.subject,
                at = %message.timestamp,
                "  message"
            );
        }
    }

    info!(
        addresses = views.len(),
        "watching inboxes, Ctrl-C to stop"
    );
    Scheduler::new(lookup, fetcher, interval).run().await;
    Ok(())
}

/// Database location under the platform data directory.
fn database_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("no data directory on this platform")?
        .join("burnerbox");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("burnerbox.db"))
}
