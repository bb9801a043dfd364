//! Warehouse connection pool initialization

use crate::config::WarehouseConfig;
use crate::Result;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

/// Pool is sized so the four dimension resolutions can each hold a
/// connection concurrently with headroom for the orchestrator.
const MAX_CONNECTIONS: u32 = 8;

/// Open a connection pool to the warehouse.
pub async fn init_pool(warehouse: &WarehouseConfig) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&warehouse.host)
        .port(warehouse.port)
        .database(&warehouse.database)
        .username(&warehouse.user)
        .password(&warehouse.password);

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    info!(
        "Connected to warehouse {}:{}/{}",
        warehouse.host, warehouse.port, warehouse.database
    );
    Ok(pool)
}
