//! Cartela ledger server binary.

use cartela::account::Account;
use cartela::config::LedgerConfig;
use cartela::store::AccountStore;
use cartela::token::SessionTokenCodec;
use cartela::ApiServer;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cartela")]
#[command(about = "Cartela balance ledger API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cartela=info,tower_http=info".into()),
        )
        .init();

    let mut config = LedgerConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(origins) = args.cors_origins {
        config.server.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    config.validate()?;

    let codec = match &config.auth.signing_key_seed {
        Some(seed_hex) => {
            let seed: [u8; 32] = hex::decode(seed_hex)?
                .try_into()
                .map_err(|_| "signing_key_seed must decode to 32 bytes")?;
            SessionTokenCodec::from_seed(seed)
        }
        None => {
            warn!("no signing_key_seed configured; sessions will not survive a restart");
            SessionTokenCodec::generate()
        }
    };

    let store = Arc::new(AccountStore::new());
    bootstrap_admin(&store, &config)?;

    ApiServer::new(config, store, codec).run().await
}

/// Seed the first admin when the store starts empty, so there is always a
/// way in.
fn bootstrap_admin(
    store: &AccountStore,
    config: &LedgerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if !store.is_empty() {
        return Ok(());
    }
    let admin = Account::admin(
        config.auth.bootstrap_name.clone(),
        config.auth.bootstrap_username.clone(),
        cartela::password::hash_password(&config.auth.bootstrap_password),
        None,
        Utc::now(),
    );
    info!(username = %admin.username, "seeding bootstrap admin");
    let mut txn = store.begin();
    txn.insert(admin);
    txn.commit()?;
    Ok(())
}
