//! Artist dimension resolution and queries

use crate::db::upsert::{self, DimensionOutcome, DimensionSpec};
use crate::Result;
use sqlx::PgPool;

pub fn spec() -> DimensionSpec {
    DimensionSpec {
        name: "artists",
        target: "artists",
        key_column: "artist_id",
        key_expr: "ss.artist_id".into(),
        source: "staging_songs ss",
        filter: None,
        sentinels: vec![("name", "''")],
        attributes: vec![
            ("name", "ss.artist_name".into()),
            ("location", "ss.artist_location".into()),
            ("latitude", "ss.artist_latitude".into()),
            ("longitude", "ss.artist_longitude".into()),
        ],
        // No ordering key in the catalog; ordering by every projected
        // attribute keeps the choice stable across runs.
        conflict_order: "ss.artist_name, ss.artist_location, ss.artist_latitude, ss.artist_longitude",
    }
}

pub async fn resolve(pool: &PgPool) -> Result<DimensionOutcome> {
    upsert::resolve(pool, &spec()).await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Artist {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Load a resolved artist by id.
pub async fn fetch_artist(pool: &PgPool, artist_id: &str) -> Result<Option<Artist>> {
    let artist = sqlx::query_as::<_, Artist>(
        "SELECT artist_id, name, location, latitude, longitude FROM artists WHERE artist_id = $1",
    )
    .bind(artist_id)
    .fetch_optional(pool)
    .await?;
    Ok(artist)
}

/// Count resolved artists; used to verify key uniqueness after a run.
pub async fn count(pool: &PgPool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM artists")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
