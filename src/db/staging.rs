//! Staging load: bulk COPY from object storage into the staging relations
//!
//! Records are loaded verbatim with no deduplication or validation. Each run
//! starts from clean staging relations (TRUNCATE first), and any transport or
//! statement error aborts the run.

use crate::config::SourceConfig;
use crate::Result;
use sqlx::PgPool;
use tracing::{debug, info};

/// Row counts after a staging load.
#[derive(Debug, Clone, Copy, Default)]
pub struct StagingCounts {
    pub events: i64,
    pub songs: i64,
}

/// Bulk-copy statement for the event log files. The JSONPath descriptor maps
/// the source field names onto the staging columns.
pub fn copy_events_sql(source: &SourceConfig) -> String {
    format!(
        "COPY staging_events FROM '{}' IAM_ROLE '{}' REGION '{}' JSON '{}'",
        source.log_data, source.iam_role_arn, source.region, source.log_jsonpath
    )
}

/// Bulk-copy statement for the song catalog files, which already use the
/// staging column names ('auto' field mapping).
pub fn copy_songs_sql(source: &SourceConfig) -> String {
    format!(
        "COPY staging_songs FROM '{}' IAM_ROLE '{}' REGION '{}' JSON 'auto'",
        source.song_data, source.iam_role_arn, source.region
    )
}

/// Truncate and repopulate both staging relations from object storage.
pub async fn load_all(pool: &PgPool, source: &SourceConfig) -> Result<StagingCounts> {
    sqlx::query("TRUNCATE TABLE staging_events")
        .execute(pool)
        .await?;
    sqlx::query("TRUNCATE TABLE staging_songs")
        .execute(pool)
        .await?;

    let events_copy = copy_events_sql(source);
    debug!(sql = %events_copy, "copying event records");
    sqlx::query(&events_copy).execute(pool).await?;

    let songs_copy = copy_songs_sql(source);
    debug!(sql = %songs_copy, "copying catalog records");
    sqlx::query(&songs_copy).execute(pool).await?;

    let counts = StagingCounts {
        events: count(pool, "staging_events").await?,
        songs: count(pool, "staging_songs").await?,
    };
    info!(
        events = counts.events,
        songs = counts.songs,
        "Staging relations loaded"
    );
    Ok(counts)
}

async fn count(pool: &PgPool, table: &str) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Raw user-activity record as it appears in the event log.
#[derive(Debug, Clone, Default)]
pub struct StagingEvent {
    pub artist: Option<String>,
    pub auth: Option<String>,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub item_in_session: Option<i32>,
    pub last_name: Option<String>,
    pub length: Option<f64>,
    pub level: Option<String>,
    pub location: Option<String>,
    pub method: Option<String>,
    pub page: Option<String>,
    pub registration: Option<i64>,
    pub session_id: Option<i32>,
    pub song: Option<String>,
    pub status: Option<i32>,
    pub ts: Option<i64>,
    pub user_agent: Option<String>,
    pub user_id: Option<i32>,
}

/// Raw song-catalog record.
#[derive(Debug, Clone, Default)]
pub struct StagingSong {
    pub artist_id: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_location: Option<String>,
    pub artist_longitude: Option<f64>,
    pub artist_name: Option<String>,
    pub duration: Option<f64>,
    pub num_songs: Option<i32>,
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

/// Insert a single event row. The bulk COPY path is the production loader;
/// this exists for seeding staging data in tests and local experiments.
pub async fn insert_event(pool: &PgPool, event: &StagingEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO staging_events (
            artist, auth, first_name, gender, item_in_session, last_name,
            length, level, location, method, page, registration, session_id,
            song, status, ts, user_agent, user_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(&event.artist)
    .bind(&event.auth)
    .bind(&event.first_name)
    .bind(&event.gender)
    .bind(event.item_in_session)
    .bind(&event.last_name)
    .bind(event.length)
    .bind(&event.level)
    .bind(&event.location)
    .bind(&event.method)
    .bind(&event.page)
    .bind(event.registration)
    .bind(event.session_id)
    .bind(&event.song)
    .bind(event.status)
    .bind(event.ts)
    .bind(&event.user_agent)
    .bind(event.user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a single catalog row. See [`insert_event`].
pub async fn insert_song(pool: &PgPool, song: &StagingSong) -> Result<()> {
    sqlx::query(
        "INSERT INTO staging_songs (
            artist_id, artist_latitude, artist_location, artist_longitude,
            artist_name, duration, num_songs, song_id, title, year
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&song.artist_id)
    .bind(song.artist_latitude)
    .bind(&song.artist_location)
    .bind(song.artist_longitude)
    .bind(&song.artist_name)
    .bind(song.duration)
    .bind(song.num_songs)
    .bind(&song.song_id)
    .bind(&song.title)
    .bind(song.year)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    fn source() -> SourceConfig {
        SourceConfig {
            log_data: "s3://bucket/log_data".into(),
            log_jsonpath: "s3://bucket/log_json_path.json".into(),
            song_data: "s3://bucket/song_data".into(),
            iam_role_arn: "arn:aws:iam::000000000000:role/dwhRole".into(),
            region: "us-west-2".into(),
        }
    }

    #[test]
    fn events_copy_uses_jsonpath_mapping() {
        let sql = copy_events_sql(&source());
        assert_eq!(
            sql,
            "COPY staging_events FROM 's3://bucket/log_data' \
             IAM_ROLE 'arn:aws:iam::000000000000:role/dwhRole' \
             REGION 'us-west-2' JSON 's3://bucket/log_json_path.json'"
        );
    }

    #[test]
    fn songs_copy_uses_auto_mapping() {
        let sql = copy_songs_sql(&source());
        assert!(sql.starts_with("COPY staging_songs FROM 's3://bucket/song_data'"));
        assert!(sql.ends_with("JSON 'auto'"));
    }
}
