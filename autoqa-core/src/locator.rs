//! Storage locators: URI-like references to object-store items.
//!
//! A locator arrives as the tail of a request path, e.g. `./reports/x.json`
//! or `s3://qa.etl.farm/reports/x.json`. Parsing follows generic URI
//! splitting rules (scheme, then `//authority`, then path; query and
//! fragment are dropped) and never fails: anything unrecognised ends up in
//! the path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme naming the object store.
pub const OBJECT_STORE_SCHEME: &str = "s3";

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocator {
    /// Lower-cased scheme, if present.
    pub scheme: Option<String>,
    /// Authority (the bucket for `s3://` locators), if present and non-empty.
    pub authority: Option<String>,
    /// Raw path component, before key normalisation.
    pub path: String,
}

/// A concrete object in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", OBJECT_STORE_SCHEME, self.bucket, self.key)
    }
}

impl StorageLocator {
    /// Split a raw locator into scheme, authority and path.
    pub fn parse(raw: &str) -> Self {
        let mut rest = raw;

        let scheme = match rest.find(':') {
            Some(idx) if is_scheme(&rest[..idx]) => {
                let scheme = rest[..idx].to_ascii_lowercase();
                rest = &rest[idx + 1..];
                Some(scheme)
            }
            _ => None,
        };

        let mut authority = None;
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            if end > 0 {
                authority = Some(after[..end].to_string());
            }
            rest = &after[end..];
        }

        let path_end = rest.find(['?', '#']).unwrap_or(rest.len());

        Self {
            scheme,
            authority,
            path: rest[..path_end].to_string(),
        }
    }

    /// Object key: the path with every leading `.` and `/` removed.
    pub fn key(&self) -> &str {
        self.path.trim_start_matches(['.', '/'])
    }

    /// Bucket named by the locator itself, if any.
    ///
    /// Only `s3://` locators with a non-empty authority name a bucket.
    pub fn bucket(&self) -> Option<&str> {
        match (&self.scheme, &self.authority) {
            (Some(scheme), Some(authority)) if scheme == OBJECT_STORE_SCHEME => Some(authority),
            _ => None,
        }
    }

    /// Resolve to a concrete object, substituting `default_bucket` when the
    /// locator does not name one.
    pub fn resolve(&self, default_bucket: &str) -> ObjectRef {
        ObjectRef::new(self.bucket().unwrap_or(default_bucket), self.key())
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
