//! grouptree-admin - maintain a nested-set usergroup hierarchy
//!
//! Opens (or creates) the SQLite database, runs one subcommand and prints its
//! result. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use grouptree_common::config::{resolve_database_path, TomlConfig, DATABASE_ENV_VAR};
use grouptree_common::db::init::init_database;
use grouptree_admin::{execute, Args};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging level comes from the config file, so any problem loading it is
    // reported after the subscriber is installed
    let loaded = TomlConfig::load_from_default_location();
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => TomlConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = &loaded {
        warn!("{}; using defaults", e);
    }

    info!(
        "Starting grouptree-admin v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_path = resolve_database_path(args.database.as_deref(), DATABASE_ENV_VAR, &config);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = execute(&pool, args.command).await;
    pool.close().await;

    match result {
        Ok(output) => {
            print!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
