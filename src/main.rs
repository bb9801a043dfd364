//! playmart - song-play warehouse pipeline
//!
//! Loads raw event and catalog JSON from object storage into staging
//! relations, then resolves the star schema. Exit status is binary: zero on
//! success, non-zero with the failing stage named on error.

use anyhow::Result;
use clap::Parser;
use playmart::config::Config;
use playmart::db::{init, schema};
use playmart::pipeline::Pipeline;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "playmart",
    about = "Load song-play events and catalog data into a star-schema warehouse"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "playmart.toml")]
    config: PathBuf,

    /// Create any missing relations before running
    #[arg(long)]
    init_schema: bool,

    /// Drop and recreate all relations before running
    #[arg(long, conflicts_with = "init_schema")]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting playmart v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config)?;
    let pool = init::init_pool(&config.warehouse).await?;

    if cli.fresh {
        schema::drop_all(&pool).await?;
    }
    if cli.fresh || cli.init_schema {
        schema::create_all(&pool).await?;
    }

    let summary = Pipeline::new(&pool, &config).run().await?;
    for dimension in &summary.dimensions {
        info!(
            dimension = dimension.dimension,
            keys_inserted = dimension.keys_inserted,
            rows_reconciled = dimension.rows_reconciled,
            "Dimension summary"
        );
    }

    Ok(())
}
