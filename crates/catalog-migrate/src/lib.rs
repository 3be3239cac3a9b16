//! # catalog-migrate
//!
//! WooCommerce to Shopify catalog migration library.
//!
//! Products are read page by page from the WooCommerce REST API and written one
//! at a time to the Shopify Admin GraphQL API:
//!
//! - **Name reconciliation**: an existing product with the exact same title is
//!   updated instead of duplicated
//! - **Partial failure tolerance**: a product that cannot be written is counted
//!   and skipped; only a failed page fetch ends the run
//! - **Progress snapshots** published after every step over a watch channel
//! - **Explicit state machine** ([`state::RunState`]) that can be driven without
//!   any network by feeding it events
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_migrate::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> catalog_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut orchestrator = Orchestrator::new(config)?;
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     println!("{} created, {} updated", result.created, result.updated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod orchestrator;
pub mod source;
pub mod state;
pub mod target;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use mapper::{to_destination_input, DestinationInput, ProductStatus};
pub use orchestrator::{HealthCheckResult, MigrationResult, Orchestrator, RunStatus};
pub use source::{Page, SourceReader, SourceRecord, SourceStatus, WooCommerceReader};
pub use state::{Phase, ProgressSnapshot, RunStats, RunState};
pub use target::{ActionTaken, Candidate, DestinationClient, Reconciler, ShopifyAdminClient};
