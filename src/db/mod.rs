//! Database schema, staging load, and star-schema resolution

pub mod artists;
pub mod init;
pub mod schema;
pub mod songplays;
pub mod songs;
pub mod staging;
pub mod time;
pub mod upsert;
pub mod users;
