//! warden database: SurrealDB connection management, schema migrations
//! and the repository implementations behind the `warden-core` traits.
//!
//! This crate provides:
//! - Opening the store ([`connect`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - The membership store and entity repositories ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, connect};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
