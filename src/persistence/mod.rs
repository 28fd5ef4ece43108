//! Persistence layer modules.

pub mod db;
pub mod joke_repo;
pub mod schema;
pub mod user_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
