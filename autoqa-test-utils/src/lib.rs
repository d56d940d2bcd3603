//! AutoQA Test Utilities
//!
//! Shared test infrastructure for the AutoQA workspace:
//! - Scripted mocks for the table store and object store seams
//! - Row fixtures for report listings

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

// Re-export mock clock from its source crate
pub use autoqa_storage::ManualClock;

pub use autoqa_core::{ObjectRef, Row};
pub use autoqa_storage::{LinkSigner, StorageError, StorageResult, TableScanner};

// ============================================================================
// FIXTURES
// ============================================================================

/// Build a row from a JSON object literal.
///
/// Panics if `value` is not an object.
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row fixture must be a JSON object, got {other}"),
    }
}

/// A platform report row with the given timestamp (ms since epoch).
pub fn platform_row(timestamp: i64) -> Row {
    row(serde_json::json!({
        "timestamp": timestamp,
        "report": format!("reports/{timestamp}.json"),
    }))
}

/// A hullscrubber report row.
pub fn hullscrubber_row(name: &str) -> Row {
    row(serde_json::json!({
        "name": name,
        "report": format!("s3://qa.etl.farm/hullscrubber/{name}.html"),
    }))
}

// ============================================================================
// MOCK TABLE SCANNER
// ============================================================================

/// Table scanner answering from per-table scripts.
///
/// Each scan pops the next scripted response for that table; once a table's
/// script has one entry left, that entry is repeated forever. Tables with no
/// script scan as empty.
#[derive(Default)]
pub struct MockTableScanner {
    scripts: Mutex<HashMap<String, Vec<StorageResult<Vec<Row>>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockTableScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `rows` as the next response for `table`.
    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.push(table, Ok(rows));
        self
    }

    /// Queue a failure as the next response for `table`.
    pub fn with_failure(self, table: &str, message: &str) -> Self {
        self.push(table, Err(StorageError::upstream("dynamodb", message)));
        self
    }

    pub fn push(&self, table: &str, response: StorageResult<Vec<Row>>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(response);
    }

    /// How many scans reached this mock for `table`.
    pub fn calls(&self, table: &str) -> usize {
        self.calls.lock().unwrap().get(table).copied().unwrap_or(0)
    }
}

#[async_trait]
impl TableScanner for MockTableScanner {
    async fn scan(&self, table: &str) -> StorageResult<Vec<Row>> {
        *self.calls.lock().unwrap().entry(table.to_string()).or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(table) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) if script.len() == 1 => script[0].clone(),
            _ => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// MOCK LINK SIGNER
// ============================================================================

/// Link signer that records every request.
#[derive(Default)]
pub struct MockLinkSigner {
    fail: bool,
    requests: Mutex<Vec<(ObjectRef, Duration)>>,
    call_count: AtomicUsize,
}

impl MockLinkSigner {
    /// A signer that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signer that always fails as if the object store were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The URL this mock returns for `object`.
    pub fn url_for(object: &ObjectRef, expires_in: Duration) -> String {
        format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            object.bucket,
            object.key,
            expires_in.as_secs()
        )
    }

    pub fn requests(&self) -> Vec<(ObjectRef, Duration)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkSigner for MockLinkSigner {
    async fn presign(&self, object: &ObjectRef, expires_in: Duration) -> StorageResult<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((object.clone(), expires_in));

        if self.fail {
            return Err(StorageError::upstream("s3", "connection refused"));
        }
        Ok(Self::url_for(object, expires_in))
    }
}
