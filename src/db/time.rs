//! Time dimension resolution and queries
//!
//! One row per distinct timestamp appearing in qualifying events. Every
//! attribute is derived from the key itself, so the conflict order is
//! immaterial; it is still stated explicitly rather than left to engine row
//! order.

use crate::db::upsert::{self, DimensionOutcome, DimensionSpec};
use crate::Result;
use chrono::NaiveDateTime;
use sqlx::PgPool;

/// Event timestamps are epoch milliseconds; the warehouse stores seconds
/// precision timestamps.
pub const START_TIME_EXPR: &str = "TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second'";

fn extract(field: &str) -> String {
    format!("CAST(EXTRACT({field} FROM {START_TIME_EXPR}) AS INT)")
}

pub fn spec() -> DimensionSpec {
    DimensionSpec {
        name: "time",
        target: "time",
        key_column: "start_time",
        key_expr: START_TIME_EXPR.into(),
        source: "staging_events se",
        filter: Some("se.page = 'NextSong'"),
        sentinels: vec![],
        attributes: vec![
            ("hour", extract("HOUR")),
            ("day", extract("DAY")),
            ("week", extract("WEEK")),
            ("month", extract("MONTH")),
            ("year", extract("YEAR")),
            ("weekday", extract("DOW")),
        ],
        conflict_order: "se.ts",
    }
}

pub async fn resolve(pool: &PgPool) -> Result<DimensionOutcome> {
    upsert::resolve(pool, &spec()).await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimeRow {
    pub start_time: NaiveDateTime,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

/// Load a resolved time row by its timestamp key.
pub async fn fetch_row(pool: &PgPool, start_time: NaiveDateTime) -> Result<Option<TimeRow>> {
    let row = sqlx::query_as::<_, TimeRow>(
        "SELECT start_time, hour, day, week, month, year, weekday FROM time WHERE start_time = $1",
    )
    .bind(start_time)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
