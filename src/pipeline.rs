//! Pipeline orchestration
//!
//! Stage order: staging load, then the four dimension resolutions (mutually
//! independent, run concurrently on separate pooled connections), then fact
//! assembly. Fact assembly performs its natural-key lookup against staging
//! directly, but it is still sequenced after song/artist resolution per the
//! stage ordering contract.
//!
//! A stage failure halts the run in place with the stage named in the error.
//! There is no rollback: every stage is idempotent (truncate-and-reload,
//! insert-if-absent plus unconditional overwrite, natural-key dedup), so a
//! partially updated schema is safe to re-run from the top.

use crate::config::Config;
use crate::db::staging::StagingCounts;
use crate::db::upsert::DimensionOutcome;
use crate::db::{artists, songplays, songs, staging, time, users};
use crate::{Error, Result};
use sqlx::PgPool;
use std::future::Future;
use tracing::info;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    StagingLoad,
    UserDimension,
    SongDimension,
    ArtistDimension,
    TimeDimension,
    FactAssembly,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::StagingLoad => "staging load",
            Stage::UserDimension => "user dimension",
            Stage::SongDimension => "song dimension",
            Stage::ArtistDimension => "artist dimension",
            Stage::TimeDimension => "time dimension",
            Stage::FactAssembly => "fact assembly",
        }
    }
}

/// Row counts from a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub staging: StagingCounts,
    pub dimensions: Vec<DimensionOutcome>,
    pub facts_inserted: u64,
}

pub struct Pipeline<'a> {
    pool: &'a PgPool,
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(pool: &'a PgPool, config: &'a Config) -> Self {
        Self { pool, config }
    }

    /// Run the full pipeline: staging load, dimension resolution, fact
    /// assembly.
    pub async fn run(&self) -> Result<RunSummary> {
        let staging = self.load_staging().await?;
        let dimensions = self.resolve_dimensions().await?;
        let facts_inserted = self.assemble_facts().await?;
        info!(
            staged_events = staging.events,
            staged_songs = staging.songs,
            facts_inserted,
            "Pipeline complete"
        );
        Ok(RunSummary {
            staging,
            dimensions,
            facts_inserted,
        })
    }

    /// Bulk-load both staging relations from object storage.
    pub async fn load_staging(&self) -> Result<StagingCounts> {
        info!("Stage: {}", Stage::StagingLoad.name());
        in_stage(Stage::StagingLoad, staging::load_all(self.pool, &self.config.source)).await
    }

    /// Resolve all four dimensions. Targets are distinct relations, so the
    /// resolutions run concurrently without write contention.
    pub async fn resolve_dimensions(&self) -> Result<Vec<DimensionOutcome>> {
        info!("Stage: dimension resolution");
        let (users, songs, artists, time) = tokio::try_join!(
            in_stage(Stage::UserDimension, users::resolve(self.pool)),
            in_stage(Stage::SongDimension, songs::resolve(self.pool)),
            in_stage(Stage::ArtistDimension, artists::resolve(self.pool)),
            in_stage(Stage::TimeDimension, time::resolve(self.pool)),
        )?;
        Ok(vec![users, songs, artists, time])
    }

    /// Assemble fact rows from qualifying staging events.
    pub async fn assemble_facts(&self) -> Result<u64> {
        info!("Stage: {}", Stage::FactAssembly.name());
        in_stage(Stage::FactAssembly, songplays::assemble(self.pool)).await
    }
}

async fn in_stage<T, F>(stage: Stage, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    operation
        .await
        .map_err(|source| Error::in_stage(stage.name(), source))
}
