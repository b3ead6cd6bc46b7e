//! Certificate Registry Server
//!
//! Wires the configured document store and pinning collaborator into the
//! registry protocol and serves the JSON API plus static front-end files.
//! Pass `--seed` to load the sample data set on startup.

use anyhow::{Context, Result};
use cert_registry::configs::{AppConfig, PinningProvider, StoreBackend};
use cert_registry::document_store::{DocumentStore, MemoryStore};
use cert_registry::firestore::FirestoreStore;
use cert_registry::pinning::{ContentPinner, LocalPinner, PinataClient};
use cert_registry::protocol::Protocol;
use cert_registry::seed::seed_registry;
use cert_registry::statistics::{collect_registry_stats, print_registry_statistics};
use cert_registry::webserver;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Certificate Registry ===\n");

    let config = AppConfig::load().context("Failed to load configuration")?;

    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => {
            println!("✓ Document store: in-memory");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Firestore => {
            println!("✓ Document store: Firestore project {}", config.store.project_id);
            Arc::new(
                FirestoreStore::new(&config.store)
                    .context("Failed to initialize Firestore store")?,
            )
        }
    };

    let pinner: Arc<dyn ContentPinner> = match config.pinning.provider {
        PinningProvider::Local => {
            println!("✓ Content anchoring: local addresses");
            Arc::new(LocalPinner::new())
        }
        PinningProvider::Pinata => {
            println!("✓ Content anchoring: Pinata at {}", config.pinning.base_url);
            Arc::new(PinataClient::new(&config.pinning))
        }
    };

    println!("✓ Contract owner: {}", config.registry.owner_account);

    let protocol = Arc::new(Protocol::new(
        store.clone(),
        pinner,
        config.registry.owner_account.clone(),
    ));

    if std::env::args().any(|arg| arg == "--seed") {
        seed_registry(&protocol)
            .await
            .context("Failed to seed sample data")?;
    }

    let stats = collect_registry_stats(store.as_ref())
        .await
        .context("Failed to collect registry statistics")?;
    print_registry_statistics(&stats);

    webserver::serve(&config.server, protocol).await
}
