//! One-shot migration of the factual-docs Postgres schema.
//!
//! The whole migration runs as a single transaction over a single
//! connection:
//!
//! - the reserved `"user"` table becomes `app_user`
//! - pickled `BYTEA` columns on `playlist` and `post` are transcoded to `JSONB`
//! - orphaned and duplicated `post_fave` / `post_like` rows are removed, then
//!   the relation tables get cascading foreign keys and a unique constraint
//! - `post` gets a weighted `search_vector`, a trigger that keeps it current,
//!   and GIN indexes for full-text and trigram search
//!
//! ```ignore
//! let config = DbConfig::from_env()?;
//! let mut client = factual_migrate::connect(&config).await?;
//! let report = MigrationRunner::new(&mut client)
//!     .with_related_source(config.related_source)
//!     .run()
//!     .await?;
//! println!("done in {:?}", report.elapsed);
//! ```
//!
//! Nothing is committed unless every step and the final verification pass.

use std::future::Future;
use std::pin::Pin;

mod config;
mod context;
mod error;
mod runner;
pub mod schema;
pub mod sql;
mod steps;
pub mod transcode;
mod verify;

pub use config::{DbConfig, RelatedSource};
pub use context::{MigrationContext, Prepared};
pub use error::{ConfigError, Error, MigrationError, TranscodeError};
pub use runner::{MigrationRunner, RunReport, StepReport, connect};
pub use steps::{STEPS, Step};
pub use transcode::decode_legacy;
pub use verify::verify;

/// Result type for factual-migrate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for step functions, captures caller location on error.
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

/// Boxed future returned by a step function.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = MigrationResult<()>> + Send + 'a>>;

/// Type alias for step functions.
///
/// A step borrows the context mutably for the duration of its future so it
/// can bump the affected-row counter while it runs.
pub type StepFn = for<'a, 'b> fn(&'a mut MigrationContext<'b>) -> StepFuture<'a>;
