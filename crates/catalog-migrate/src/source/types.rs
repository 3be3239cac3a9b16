//! Source record and page types.

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Publication status of a source product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum SourceStatus {
    Draft,
    Published,
    /// Any other status string (`pending`, `private`, ...).
    Other(String),
    #[default]
    Unknown,
}

impl From<Option<String>> for SourceStatus {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            None | Some("") => SourceStatus::Unknown,
            Some("draft") => SourceStatus::Draft,
            // WooCommerce spells it "publish".
            Some("publish") | Some("published") => SourceStatus::Published,
            Some(other) => SourceStatus::Other(other.to_string()),
        }
    }
}

impl From<Value> for SourceStatus {
    fn from(value: Value) -> Self {
        SourceStatus::from(scalar_text(value))
    }
}

impl From<SourceStatus> for String {
    fn from(value: SourceStatus) -> Self {
        match value {
            SourceStatus::Draft => "draft".to_string(),
            SourceStatus::Published => "publish".to_string(),
            SourceStatus::Other(s) => s,
            SourceStatus::Unknown => String::new(),
        }
    }
}

/// One product as returned by the source listing endpoint.
///
/// Only the fields the migration needs are kept; the rest of the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,

    #[serde(default)]
    pub status: SourceStatus,
}

impl SourceRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>, status: &str) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status: SourceStatus::from(Some(status.to_string())),
        }
    }
}

/// Strings pass through, numbers and booleans are rendered, anything else is absent.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| scalar_text(v).unwrap_or_default())
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// One page of source records plus the listing's pagination totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub records: Vec<SourceRecord>,
    pub page_number: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl Page {
    /// Build a page from the raw pieces of a listing response.
    ///
    /// A missing or unparseable total-pages header means a single page; a missing
    /// total header falls back to the number of records in this page.
    pub fn from_response_parts(
        page_number: u32,
        total_pages_header: Option<&str>,
        total_header: Option<&str>,
        body: &[u8],
    ) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            MigrateError::SourceMalformed(format!("response is not valid JSON: {}", e))
        })?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(MigrateError::SourceMalformed(format!(
                    "expected an array of products, got {}",
                    json_kind(&other)
                )));
            }
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                if !item.is_object() {
                    return Err(MigrateError::SourceMalformed(format!(
                        "product at index {} is {}, expected an object",
                        idx,
                        json_kind(&item)
                    )));
                }
                serde_json::from_value::<SourceRecord>(item).map_err(|e| {
                    MigrateError::SourceMalformed(format!("product at index {}: {}", idx, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let total_pages = total_pages_header
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        let total_count = total_header
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(records.len() as u64);

        Ok(Self {
            records,
            page_number,
            total_pages,
            total_count,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"[
        {"id": 11, "name": "Widget A", "description": "<p>A</p>", "status": "publish", "price": "9.99"},
        {"id": 12, "name": "Widget B", "description": null, "status": "draft"}
    ]"#;

    #[test]
    fn test_page_with_headers() {
        let page = Page::from_response_parts(2, Some("7"), Some("321"), BODY.as_bytes()).unwrap();
        assert_eq!(page.page_number, 2);
        assert_eq!(page.total_pages, 7);
        assert_eq!(page.total_count, 321);
        assert_eq!(page.len(), 2);
        assert_eq!(page.records[0].status, SourceStatus::Published);
        assert_eq!(page.records[1].description, "");
    }

    #[test]
    fn test_page_without_headers_defaults() {
        let page = Page::from_response_parts(1, None, None, BODY.as_bytes()).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_page_garbage_headers_fall_back() {
        let page = Page::from_response_parts(1, Some("abc"), Some(""), BODY.as_bytes()).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_zero_total_pages_clamped() {
        let page = Page::from_response_parts(1, Some("0"), Some("0"), b"[]").unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_count, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn test_object_body_is_malformed() {
        let body = br#"{"code": "woocommerce_rest_cannot_view", "message": "Sorry"}"#;
        let err = Page::from_response_parts(1, None, None, body).unwrap_err();
        assert!(matches!(err, MigrateError::SourceMalformed(_)));
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_html_body_is_malformed() {
        let err = Page::from_response_parts(1, None, None, b"<html>login</html>").unwrap_err();
        assert!(matches!(err, MigrateError::SourceMalformed(_)));
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let page = Page::from_response_parts(1, None, None, br#"[{"id": 5}]"#).unwrap();
        let record = &page.records[0];
        assert_eq!(record.name, "");
        assert_eq!(record.description, "");
        assert_eq!(record.status, SourceStatus::Unknown);
    }

    #[test]
    fn test_odd_field_types_do_not_fail_the_page() {
        let body = br#"[
            {"id": 1, "name": "Widget A", "description": "<p>A</p>", "status": "publish"},
            {"id": "2", "name": 12345, "description": true, "status": 7},
            {"id": [3], "name": "Widget C", "description": ["x"], "status": {"v": 1}}
        ]"#;
        let page = Page::from_response_parts(1, Some("1"), Some("3"), body).unwrap();
        assert_eq!(page.len(), 3);

        let odd = &page.records[1];
        assert_eq!(odd.id, Some(2));
        assert_eq!(odd.name, "12345");
        assert_eq!(odd.description, "true");
        assert_eq!(odd.status, SourceStatus::Other("7".to_string()));

        let nested = &page.records[2];
        assert_eq!(nested.id, None);
        assert_eq!(nested.name, "Widget C");
        assert_eq!(nested.description, "");
        assert_eq!(nested.status, SourceStatus::Unknown);
    }

    #[test]
    fn test_non_object_element_is_malformed() {
        let body = br#"[{"name": "Widget A"}, "Widget B"]"#;
        let err = Page::from_response_parts(1, None, None, body).unwrap_err();
        assert!(matches!(err, MigrateError::SourceMalformed(_)));
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_status_spellings() {
        assert_eq!(SourceRecord::new("x", "", "publish").status, SourceStatus::Published);
        assert_eq!(SourceRecord::new("x", "", "published").status, SourceStatus::Published);
        assert_eq!(SourceRecord::new("x", "", "draft").status, SourceStatus::Draft);
        assert_eq!(
            SourceRecord::new("x", "", "pending").status,
            SourceStatus::Other("pending".to_string())
        );
    }
}
