//! Fact assembly: songplay rows from qualifying staging events
//!
//! Every event with `page = 'NextSong'` yields exactly one fact row. The
//! song/artist foreign keys come from a best-effort natural-key lookup
//! against the staged catalog (title + artist name + duration within an
//! epsilon); a lookup miss leaves them NULL rather than dropping the row.
//! Rows are deduplicated on the event's composite natural key
//! `(start_time, user_id, session_id)`, both within the staging batch and
//! against fact rows inserted by a prior run, so re-running the pipeline
//! never duplicates facts. The key uses the stored seconds-precision
//! `start_time`, not the raw millisecond timestamp, and `user_id` may be
//! NULL, so the re-run guard compares it NULL-safely.

use crate::db::time::START_TIME_EXPR;
use crate::Result;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::{debug, info};

/// Tolerance for matching the event's playback length against the catalog
/// duration, absorbing storage rounding of the numeric field.
pub const DURATION_EPSILON: f64 = 0.005;

pub fn assemble_sql() -> String {
    format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) \
         SELECT start_time, user_id, level, song_id, artist_id, session_id, location, user_agent \
         FROM (SELECT {ts_expr} AS start_time, \
                      se.user_id, se.level, ss.song_id, ss.artist_id, \
                      se.session_id, se.location, se.user_agent, \
                      ROW_NUMBER() OVER (PARTITION BY {ts_expr}, se.user_id, se.session_id \
                                         ORDER BY ss.song_id) AS pick \
               FROM staging_events se \
               LEFT OUTER JOIN staging_songs ss \
                 ON se.song = ss.title \
                AND se.artist = ss.artist_name \
                AND ABS(se.length - ss.duration) < {epsilon} \
               WHERE se.page = 'NextSong') plays \
         WHERE plays.pick = 1 \
           AND NOT EXISTS (SELECT 1 FROM songplays existing \
                           WHERE existing.start_time = plays.start_time \
                             AND (existing.user_id = plays.user_id \
                                  OR (existing.user_id IS NULL AND plays.user_id IS NULL)) \
                             AND existing.session_id = plays.session_id)",
        ts_expr = START_TIME_EXPR,
        epsilon = DURATION_EPSILON,
    )
}

/// Insert fact rows for all qualifying staging events. Returns the number of
/// rows inserted (zero when every natural key already exists).
pub async fn assemble(pool: &PgPool) -> Result<u64> {
    let sql = assemble_sql();
    debug!(sql = %sql, "assembling fact rows");
    let inserted = sqlx::query(&sql).execute(pool).await?.rows_affected();
    info!(inserted, "Fact rows assembled");
    Ok(inserted)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SongPlay {
    pub songplay_id: i64,
    pub start_time: NaiveDateTime,
    pub user_id: Option<i32>,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i32,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Load all fact rows in natural-key order.
pub async fn fetch_all(pool: &PgPool) -> Result<Vec<SongPlay>> {
    let rows = sqlx::query_as::<_, SongPlay>(
        "SELECT songplay_id, start_time, user_id, level, song_id, artist_id, \
                session_id, location, user_agent \
         FROM songplays ORDER BY start_time, user_id, session_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_tolerant_on_duration() {
        let sql = assemble_sql();
        assert!(sql.contains("ABS(se.length - ss.duration) < 0.005"));
    }

    #[test]
    fn lookup_misses_are_kept_as_null_keys() {
        // LEFT OUTER JOIN: a fact row survives an unresolved catalog lookup.
        assert!(assemble_sql().contains("LEFT OUTER JOIN staging_songs ss"));
    }

    #[test]
    fn facts_dedup_on_composite_natural_key() {
        let sql = assemble_sql();
        // Within-batch dedup must partition on the stored seconds-precision
        // key, not the raw millisecond timestamp.
        assert!(sql.contains(&format!(
            "PARTITION BY {START_TIME_EXPR}, se.user_id, se.session_id"
        )));
        assert!(!sql.contains("PARTITION BY se.ts,"));
        assert!(sql.contains("NOT EXISTS (SELECT 1 FROM songplays existing"));
    }

    #[test]
    fn rerun_guard_is_null_safe_on_user_id() {
        let sql = assemble_sql();
        assert!(sql.contains("existing.user_id IS NULL AND plays.user_id IS NULL"));
    }

    #[test]
    fn only_song_play_pages_qualify() {
        assert!(assemble_sql().contains("WHERE se.page = 'NextSong'"));
    }
}
