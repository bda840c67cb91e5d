//! PostgreSQL integration for Fabula.
//!
//! This crate provides database models, schema definitions, and the
//! Postgres implementations of the repository traits in
//! `fabula_interface`: the generation job audit log, credit ledger, story
//! content store, and pricing store.
//!
//! # Example
//!
//! ```rust,ignore
//! use fabula_database::{create_pool, PostgresGenerationJobRepository};
//! use fabula_interface::GenerationJobRepository;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("postgres://localhost/fabula")?;
//! let jobs = PostgresGenerationJobRepository::new(pool);
//! let history = jobs.jobs_for_user(1, 20)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod credit_ledger;
mod job_repository;
mod models;
mod pricing_store;
mod story_store;

/// Diesel table definitions, public for query composition in tests.
pub mod schema;

pub use connection::{PgPool, create_pool, establish_connection};
pub use credit_ledger::PostgresCreditLedger;
pub use job_repository::PostgresGenerationJobRepository;
pub use models::{
    ChapterRow, CharacterRow, CreditModifierRow, GenerationJobRow, GuidePartRow, LocationRow,
    NewChapterRow, NewCharacterRow, NewCreditModifierRow, NewGenerationJobRow, NewGuidePartRow,
    NewLocationRow, NewStoryArcRow, PricingConfigRow, StoryArcRow, StoryRow, UserRow,
};
pub use pricing_store::PostgresPricingStore;
pub use story_store::PostgresStoryStore;

use fabula_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A pooled PostgreSQL connection.
pub type PooledPg =
    diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>;
