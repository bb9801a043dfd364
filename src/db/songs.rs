//! Song dimension resolution and queries
//!
//! Catalog records are expected-unique per `song_id` but nothing enforces
//! that. With no ordering key in the source, the winning row for a duplicated
//! key is chosen by a content-derived order, which is arbitrary but stable
//! across runs.

use crate::db::upsert::{self, DimensionOutcome, DimensionSpec};
use crate::Result;
use sqlx::PgPool;

pub fn spec() -> DimensionSpec {
    DimensionSpec {
        name: "songs",
        target: "songs",
        key_column: "song_id",
        key_expr: "ss.song_id".into(),
        source: "staging_songs ss",
        filter: None,
        sentinels: vec![("title", "''"), ("artist_id", "''")],
        attributes: vec![
            ("title", "ss.title".into()),
            ("artist_id", "ss.artist_id".into()),
            ("year", "ss.year".into()),
            ("duration", "ss.duration".into()),
        ],
        // Covers every projected attribute, so rows that differ at all
        // resolve the same way on every run.
        conflict_order: "ss.title, ss.artist_id, ss.year, ss.duration",
    }
}

pub async fn resolve(pool: &PgPool) -> Result<DimensionOutcome> {
    upsert::resolve(pool, &spec()).await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,
    pub duration: Option<f64>,
}

/// Load a resolved song by id.
pub async fn fetch_song(pool: &PgPool, song_id: &str) -> Result<Option<Song>> {
    let song = sqlx::query_as::<_, Song>(
        "SELECT song_id, title, artist_id, year, duration FROM songs WHERE song_id = $1",
    )
    .bind(song_id)
    .fetch_optional(pool)
    .await?;
    Ok(song)
}

/// Count resolved songs; used to verify key uniqueness after a run.
pub async fn count(pool: &PgPool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
