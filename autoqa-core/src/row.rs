//! Report rows as returned by a table scan.

use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// One record from a table scan: attribute name to plain value.
pub type Row = Map<String, Value>;

/// Attribute holding milliseconds since the epoch on platform reports.
pub const TIMESTAMP_ATTRIBUTE: &str = "timestamp";

/// Sort rows newest first by their `timestamp` attribute.
///
/// The sort is stable, so rows sharing a timestamp keep their scan order.
/// Every row must carry a numeric `timestamp`; the first row that does not
/// fails the whole sort.
pub fn sort_by_timestamp_desc(rows: &[Row]) -> CoreResult<Vec<Row>> {
    let mut keyed = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        keyed.push((timestamp_of(index, row)?, row));
    }

    keyed.sort_by(|(a, _), (b, _)| b.total_cmp(a));

    Ok(keyed.into_iter().map(|(_, row)| row.clone()).collect())
}

fn timestamp_of(index: usize, row: &Row) -> CoreResult<f64> {
    let value = row
        .get(TIMESTAMP_ATTRIBUTE)
        .ok_or_else(|| CoreError::MissingAttribute {
            index,
            attribute: TIMESTAMP_ATTRIBUTE.to_string(),
        })?;

    value.as_f64().ok_or_else(|| CoreError::InvalidAttribute {
        index,
        attribute: TIMESTAMP_ATTRIBUTE.to_string(),
    })
}
