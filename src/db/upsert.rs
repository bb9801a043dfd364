//! Emulated upsert for a warehouse without enforced keys or conditional insert
//!
//! The engine accepts PRIMARY KEY declarations but does not enforce them, and
//! it has no native upsert statement. Each dimension is therefore resolved in
//! two explicit set-based steps:
//!
//! 1. **Key insertion** — insert every distinct staging key that is not yet
//!    present in the target, with NOT-NULL attribute columns filled by
//!    sentinel values. After this step each key exists exactly once.
//! 2. **Attribute reconciliation** — unconditionally overwrite the attributes
//!    of every key from exactly one staging row, chosen by an explicit
//!    `ROW_NUMBER()` conflict order rather than engine row order.
//!
//! The steps must stay separate statements, and step 1 must complete before
//! step 2 begins so reconciliation can match every key. Keys present in the
//! target but absent from staging are left untouched; both steps are
//! idempotent, which makes a partial run safe to restart from the top.

use crate::Result;
use sqlx::PgPool;
use tracing::{debug, info};

/// Declarative description of one dimension's resolution.
pub struct DimensionSpec {
    /// Dimension name, used for logging and stage attribution
    pub name: &'static str,
    /// Target relation
    pub target: &'static str,
    /// Primary-key column in the target
    pub key_column: &'static str,
    /// Expression producing the key from the staging source
    pub key_expr: String,
    /// Staging relation with alias, e.g. `"staging_events se"`
    pub source: &'static str,
    /// Qualifying-row predicate on the staging source, if any
    pub filter: Option<&'static str>,
    /// NOT-NULL target columns and the sentinel literal used at key insertion
    pub sentinels: Vec<(&'static str, &'static str)>,
    /// Target attribute columns and the staging expression that fills each
    pub attributes: Vec<(&'static str, String)>,
    /// `ORDER BY` body selecting the winning staging row per key
    pub conflict_order: &'static str,
}

impl DimensionSpec {
    /// Predicate shared by both steps: qualifying rows with a non-NULL key.
    fn source_predicate(&self) -> String {
        match self.filter {
            Some(filter) => format!("{} AND {} IS NOT NULL", filter, self.key_expr),
            None => format!("{} IS NOT NULL", self.key_expr),
        }
    }

    /// Step 1: insert-if-absent for every distinct staging key.
    pub fn insert_missing_keys_sql(&self) -> String {
        let mut columns = vec![self.key_column.to_string()];
        let mut values = vec![self.key_expr.clone()];
        for (column, sentinel) in &self.sentinels {
            columns.push((*column).to_string());
            values.push((*sentinel).to_string());
        }
        format!(
            "INSERT INTO {target} ({columns}) \
             SELECT DISTINCT {values} \
             FROM {source} \
             WHERE {predicate} \
               AND NOT EXISTS (SELECT 1 FROM {target} existing WHERE existing.{key} = {key_expr})",
            target = self.target,
            columns = columns.join(", "),
            values = values.join(", "),
            source = self.source,
            predicate = self.source_predicate(),
            key = self.key_column,
            key_expr = self.key_expr,
        )
    }

    /// Step 2: overwrite attributes from the conflict-order winner per key.
    pub fn reconcile_attributes_sql(&self) -> String {
        let assignments = self
            .attributes
            .iter()
            .map(|(column, _)| format!("{column} = src.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let projections = self
            .attributes
            .iter()
            .map(|(column, expr)| format!("{expr} AS {column}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {target} SET {assignments} \
             FROM (SELECT {key_expr} AS dim_key, {projections}, \
                          ROW_NUMBER() OVER (PARTITION BY {key_expr} ORDER BY {order}) AS pick \
                   FROM {source} \
                   WHERE {predicate}) src \
             WHERE src.pick = 1 AND {target}.{key} = src.dim_key",
            target = self.target,
            assignments = assignments,
            key_expr = self.key_expr,
            projections = projections,
            order = self.conflict_order,
            source = self.source,
            predicate = self.source_predicate(),
            key = self.key_column,
        )
    }
}

/// Outcome of one dimension resolution.
#[derive(Debug, Clone, Copy)]
pub struct DimensionOutcome {
    pub dimension: &'static str,
    pub keys_inserted: u64,
    pub rows_reconciled: u64,
}

/// Run both resolution steps against the warehouse.
pub async fn resolve(pool: &PgPool, spec: &DimensionSpec) -> Result<DimensionOutcome> {
    let insert_sql = spec.insert_missing_keys_sql();
    debug!(dimension = spec.name, sql = %insert_sql, "inserting missing keys");
    let keys_inserted = sqlx::query(&insert_sql)
        .execute(pool)
        .await?
        .rows_affected();

    // Key insertion has fully completed at this point; every staging key now
    // exists in the target, so reconciliation matches all of them.
    let reconcile_sql = spec.reconcile_attributes_sql();
    debug!(dimension = spec.name, sql = %reconcile_sql, "reconciling attributes");
    let rows_reconciled = sqlx::query(&reconcile_sql)
        .execute(pool)
        .await?
        .rows_affected();

    info!(
        dimension = spec.name,
        keys_inserted, rows_reconciled, "Dimension resolved"
    );
    Ok(DimensionOutcome {
        dimension: spec.name,
        keys_inserted,
        rows_reconciled,
    })
}
