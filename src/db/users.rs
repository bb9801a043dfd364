//! User dimension resolution and queries
//!
//! A user appears once per activity event in staging, and the `level` and
//! name fields drift over time. The chronologically last qualifying event
//! wins, with an explicit total order so exact-timestamp ties resolve the
//! same way on every run.

use crate::db::upsert::{self, DimensionOutcome, DimensionSpec};
use crate::Result;
use sqlx::PgPool;

pub fn spec() -> DimensionSpec {
    DimensionSpec {
        name: "users",
        target: "users",
        key_column: "user_id",
        key_expr: "se.user_id".into(),
        source: "staging_events se",
        filter: Some("se.page = 'NextSong'"),
        sentinels: vec![
            ("first_name", "''"),
            ("last_name", "''"),
            ("gender", "''"),
            ("level", "''"),
        ],
        attributes: vec![
            ("first_name", "se.first_name".into()),
            ("last_name", "se.last_name".into()),
            ("gender", "se.gender".into()),
            ("level", "se.level".into()),
        ],
        // Latest event wins; session and in-session position break ties when
        // two events share a timestamp.
        conflict_order: "se.ts DESC, se.session_id DESC, se.item_in_session DESC",
    }
}

pub async fn resolve(pool: &PgPool) -> Result<DimensionOutcome> {
    upsert::resolve(pool, &spec()).await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

/// Load a resolved user by id.
pub async fn fetch_user(pool: &PgPool, user_id: i32) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, first_name, last_name, gender, level FROM users WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_qualifying_events_contribute() {
        let spec = spec();
        assert_eq!(spec.filter, Some("se.page = 'NextSong'"));
        assert!(spec
            .insert_missing_keys_sql()
            .contains("se.page = 'NextSong' AND se.user_id IS NOT NULL"));
    }

    #[test]
    fn conflict_order_is_chronological_and_total() {
        let sql = spec().reconcile_attributes_sql();
        assert!(sql.contains("ORDER BY se.ts DESC, se.session_id DESC, se.item_in_session DESC"));
    }

    #[test]
    fn every_not_null_column_gets_a_sentinel() {
        let spec = spec();
        let sentinel_columns: Vec<_> = spec.sentinels.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            sentinel_columns,
            vec!["first_name", "last_name", "gender", "level"]
        );
    }
}
