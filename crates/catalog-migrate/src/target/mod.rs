//! Destination store operations and name-based reconciliation.

mod shopify;

pub use shopify::ShopifyAdminClient;

use crate::error::{MigrateError, Result};
use crate::mapper::DestinationInput;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A destination product returned by a title search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub title: String,
}

/// Trait for destination store operations.
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Loose, server-side title search. Returns at most `limit` candidates in
    /// server order; matches are not guaranteed to be exact.
    async fn search_by_title(&self, title: &str, limit: u32) -> Result<Vec<Candidate>>;

    /// Create a product, returning its id.
    async fn create_product(&self, input: &DestinationInput) -> Result<String>;

    /// Overwrite title, description and status of an existing product.
    async fn update_product(&self, id: &str, input: &DestinationInput) -> Result<String>;

    /// Get the destination type identifier.
    fn destination_type(&self) -> &str;
}

/// What the reconciler did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    Created,
    Updated,
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTaken::Created => write!(f, "created"),
            ActionTaken::Updated => write!(f, "updated"),
        }
    }
}

/// Search-then-write upsert keyed on exact title.
///
/// The lookup and the write are separate requests, so a concurrent writer can
/// still slip a same-titled product in between. Runs are sequential, which keeps
/// this from happening within one run.
pub struct Reconciler {
    client: Arc<dyn DestinationClient>,
    search_limit: u32,
}

impl Reconciler {
    pub fn new(client: Arc<dyn DestinationClient>, search_limit: u32) -> Self {
        Self {
            client,
            search_limit: search_limit.max(1),
        }
    }

    /// Create or update the product whose title equals `input.title`.
    pub async fn upsert(&self, input: &DestinationInput) -> Result<ActionTaken> {
        let candidates = self
            .client
            .search_by_title(&input.title, self.search_limit)
            .await
            .map_err(|e| as_reconcile(&input.title, e))?;

        match find_exact(&candidates, &input.title) {
            Some(existing) => {
                debug!("{:?}: exact match {}, updating", input.title, existing.id);
                self.client
                    .update_product(&existing.id, input)
                    .await
                    .map_err(|e| as_reconcile(&input.title, e))?;
                Ok(ActionTaken::Updated)
            }
            None => {
                debug!(
                    "{:?}: no exact match among {} candidates, creating",
                    input.title,
                    candidates.len()
                );
                self.client
                    .create_product(input)
                    .await
                    .map_err(|e| as_reconcile(&input.title, e))?;
                Ok(ActionTaken::Created)
            }
        }
    }

    pub fn client(&self) -> Arc<dyn DestinationClient> {
        self.client.clone()
    }
}

/// First candidate, in server order, whose title is byte-for-byte equal.
pub fn find_exact<'a>(candidates: &'a [Candidate], title: &str) -> Option<&'a Candidate> {
    candidates.iter().find(|c| c.title == title)
}

fn as_reconcile(title: &str, err: MigrateError) -> MigrateError {
    match err {
        MigrateError::Reconcile { .. } => err,
        other => MigrateError::reconcile(title, other.to_string()),
    }
}
