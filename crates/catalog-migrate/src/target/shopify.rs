//! Shopify Admin GraphQL client.

use super::{Candidate, DestinationClient};
use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use crate::mapper::DestinationInput;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const SEARCH_QUERY: &str = r#"
query findProducts($query: String!, $first: Int!) {
  products(first: $first, query: $query) {
    edges { node { id title } }
  }
}"#;

const CREATE_MUTATION: &str = r#"
mutation productCreate($input: ProductInput!) {
  productCreate(input: $input) {
    product { id }
    userErrors { field message }
  }
}"#;

const UPDATE_MUTATION: &str = r#"
mutation productUpdate($input: ProductInput!) {
  productUpdate(input: $input) {
    product { id }
    userErrors { field message }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: ProductConnection,
}

#[derive(Debug, Deserialize)]
struct ProductConnection {
    edges: Vec<ProductEdge>,
}

#[derive(Debug, Deserialize)]
struct ProductEdge {
    node: Candidate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    product_create: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    product_update: Option<MutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    product: Option<ProductRef>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

/// Shopify Admin API client authenticated with an access token.
pub struct ShopifyAdminClient {
    client: Client,
    endpoint: Url,
    access_token: String,
}

impl ShopifyAdminClient {
    pub fn new(config: &TargetConfig) -> Result<Self> {
        let endpoint = config.graphql_endpoint()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("catalog-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Destination: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }

    /// POST a GraphQL document and decode `data`. Failures are tagged with `title`.
    async fn execute<T: DeserializeOwned>(&self, title: &str, query: &str, variables: Value) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| MigrateError::reconcile(title, e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| MigrateError::reconcile(title, e.to_string()))?;

        if !status.is_success() {
            return Err(MigrateError::reconcile(
                title,
                format!("HTTP {}: {}", status, String::from_utf8_lossy(&body)),
            ));
        }

        decode_data(title, &body)
    }
}

/// Quote a title for the product search syntax: `title:"..."`.
pub(crate) fn title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!("title:\"{}\"", escaped)
}

fn decode_data<T: DeserializeOwned>(title: &str, body: &[u8]) -> Result<T> {
    let response: GraphQlResponse<T> = serde_json::from_slice(body)
        .map_err(|e| MigrateError::reconcile(title, format!("invalid GraphQL response: {}", e)))?;

    if !response.errors.is_empty() {
        let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(MigrateError::reconcile(title, messages.join("; ")));
    }

    response
        .data
        .ok_or_else(|| MigrateError::reconcile(title, "GraphQL response has no data"))
}

fn payload_id(title: &str, operation: &str, payload: Option<MutationPayload>) -> Result<String> {
    let payload = payload
        .ok_or_else(|| MigrateError::reconcile(title, format!("{} returned null", operation)))?;

    if !payload.user_errors.is_empty() {
        let messages: Vec<_> = payload
            .user_errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                _ => e.message,
            })
            .collect();
        return Err(MigrateError::reconcile(title, messages.join("; ")));
    }

    payload
        .product
        .map(|p| p.id)
        .ok_or_else(|| MigrateError::reconcile(title, format!("{} returned no product", operation)))
}

#[async_trait]
impl DestinationClient for ShopifyAdminClient {
    async fn search_by_title(&self, title: &str, limit: u32) -> Result<Vec<Candidate>> {
        let data: ProductsData = self
            .execute(
                title,
                SEARCH_QUERY,
                json!({ "query": title_query(title), "first": limit }),
            )
            .await?;

        let candidates: Vec<_> = data.products.edges.into_iter().map(|e| e.node).collect();
        debug!("{:?}: {} candidates", title, candidates.len());
        Ok(candidates)
    }

    async fn create_product(&self, input: &DestinationInput) -> Result<String> {
        let data: CreateData = self
            .execute(&input.title, CREATE_MUTATION, json!({ "input": input }))
            .await?;
        payload_id(&input.title, "productCreate", data.product_create)
    }

    async fn update_product(&self, id: &str, input: &DestinationInput) -> Result<String> {
        let mut fields = serde_json::to_value(input)?;
        if let Value::Object(ref mut map) = fields {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }

        let data: UpdateData = self
            .execute(&input.title, UPDATE_MUTATION, json!({ "input": fields }))
            .await?;
        payload_id(&input.title, "productUpdate", data.product_update)
    }

    fn destination_type(&self) -> &str {
        "shopify"
    }
}
