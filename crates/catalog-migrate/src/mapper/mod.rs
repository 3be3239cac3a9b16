//! Record mapping from source products to destination product input.

use crate::source::{SourceRecord, SourceStatus};
use serde::{Deserialize, Serialize};

/// Destination product status (Shopify `ProductStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Draft,
}

/// Fields written on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInput {
    pub title: String,
    pub description_html: String,
    pub status: ProductStatus,
}

/// Map a source product to the destination's input shape.
pub fn to_destination_input(record: &SourceRecord) -> DestinationInput {
    let status = match record.status {
        SourceStatus::Published => ProductStatus::Active,
        _ => ProductStatus::Draft,
    };

    DestinationInput {
        title: record.name.clone(),
        description_html: record.description.clone(),
        status,
    }
}
