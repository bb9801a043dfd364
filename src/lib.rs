//! # playmart
//!
//! Batch pipeline that loads raw song-play event and song-catalog JSON from
//! object storage into warehouse staging relations, then resolves the staged
//! rows into a star schema:
//! - Fact: `songplays`
//! - Dimensions: `users`, `songs`, `artists`, `time`
//!
//! The target warehouse speaks the PostgreSQL wire protocol but does not
//! enforce primary-key or uniqueness constraints and has no native upsert, so
//! dimension loading is an emulated upsert: insert missing keys first, then
//! unconditionally reconcile attributes from a deterministically chosen
//! staging row per key (see [`db::upsert`]).

pub mod config;
pub mod db;
pub mod error;
pub mod pipeline;

pub use error::{Error, Result};
