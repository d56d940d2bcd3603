//! DynamoDB table scanner.
//!
//! Items come off the wire as typed attribute maps (`{"S": "..."}`,
//! `{"N": "42"}`, ...). [`unmarshall_item`] flattens them into plain JSON
//! values so the rest of the dashboard never sees DynamoDB types.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use autoqa_core::Row;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Number, Value};

use crate::deadline::with_timeout;
use crate::error::{StorageError, StorageResult};
use crate::reader::TableScanner;

const SERVICE: &str = "dynamodb";

/// Scans whole tables, following `LastEvaluatedKey` until exhausted.
#[derive(Debug, Clone)]
pub struct DynamoTableScanner {
    client: Client,
    timeout: Duration,
}

impl DynamoTableScanner {
    /// `timeout` bounds the whole paginated scan, not each page.
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn scan_all(&self, table: &str) -> StorageResult<Vec<Row>> {
        let mut pages = self.client.scan().table_name(table).into_paginator().send();
        let mut rows = Vec::new();
        let mut page_count = 0usize;

        while let Some(page) = pages.next().await {
            let page = page
                .map_err(|e| StorageError::upstream(SERVICE, DisplayErrorContext(&e).to_string()))?;
            page_count += 1;
            rows.extend(page.items().iter().map(unmarshall_item));
        }

        tracing::debug!(table, pages = page_count, rows = rows.len(), "Scanned table");
        Ok(rows)
    }
}

#[async_trait]
impl TableScanner for DynamoTableScanner {
    async fn scan(&self, table: &str) -> StorageResult<Vec<Row>> {
        with_timeout("dynamodb scan", self.timeout, self.scan_all(table)).await
    }
}

/// Convert one wire-format item into a plain row.
pub fn unmarshall_item(item: &HashMap<String, AttributeValue>) -> Row {
    item.iter()
        .map(|(name, value)| (name.clone(), unmarshall_value(value)))
        .collect()
}

/// Convert one wire-format attribute into a plain value.
///
/// Binary values become standard base64 strings and sets become arrays.
pub fn unmarshall_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(items.iter().map(|n| number(n)).collect()),
        AttributeValue::Bs(items) => Value::Array(
            items
                .iter()
                .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
                .collect(),
        ),
        AttributeValue::L(items) => Value::Array(items.iter().map(unmarshall_value).collect()),
        AttributeValue::M(map) => Value::Object(unmarshall_item(map)),
        _ => {
            tracing::warn!("Unknown DynamoDB attribute type, mapping to null");
            Value::Null
        }
    }
}

/// Integers stay integers; anything else that parses is a float; the rest
/// is kept verbatim as a string.
fn number(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(uint) = raw.parse::<u64>() {
        return Value::Number(uint.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;
    use serde_json::json;

    fn item(pairs: Vec<(&str, AttributeValue)>) -> HashMap<String, AttributeValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_scalar_attributes() {
        let row = unmarshall_item(&item(vec![
            ("name", AttributeValue::S("daily".to_string())),
            ("timestamp", AttributeValue::N("1700000000000".to_string())),
            ("score", AttributeValue::N("0.75".to_string())),
            ("passed", AttributeValue::Bool(true)),
            ("note", AttributeValue::Null(true)),
        ]));

        assert_eq!(
            Value::Object(row),
            json!({
                "name": "daily",
                "timestamp": 1_700_000_000_000i64,
                "score": 0.75,
                "passed": true,
                "note": null,
            })
        );
    }

    #[test]
    fn test_nested_attributes() {
        let inner = item(vec![("count", AttributeValue::N("3".to_string()))]);
        let row = unmarshall_item(&item(vec![
            ("summary", AttributeValue::M(inner)),
            (
                "checks",
                AttributeValue::L(vec![
                    AttributeValue::S("a".to_string()),
                    AttributeValue::N("2".to_string()),
                ]),
            ),
        ]));

        assert_eq!(row["summary"], json!({"count": 3}));
        assert_eq!(row["checks"], json!(["a", 2]));
    }

    #[test]
    fn test_sets_and_binary() {
        let row = unmarshall_item(&item(vec![
            ("tags", AttributeValue::Ss(vec!["x".to_string(), "y".to_string()])),
            ("sizes", AttributeValue::Ns(vec!["1".to_string(), "2.5".to_string()])),
            ("blob", AttributeValue::B(Blob::new(b"hi".to_vec()))),
            ("blobs", AttributeValue::Bs(vec![Blob::new(b"a".to_vec())])),
        ]));

        assert_eq!(row["tags"], json!(["x", "y"]));
        assert_eq!(row["sizes"], json!([1, 2.5]));
        assert_eq!(row["blob"], json!("aGk="));
        assert_eq!(row["blobs"], json!(["YQ=="]));
    }

    #[test]
    fn test_number_edge_cases() {
        assert_eq!(number("18446744073709551615"), json!(u64::MAX));
        assert_eq!(number(" 42 "), json!(42));
        assert_eq!(number("1e3"), json!(1000.0));
        assert_eq!(number("not-a-number"), json!("not-a-number"));
    }
}
