//! AutoQA Core - Domain Types
//!
//! Pure data structures shared by the storage adapters and the HTTP layer.
//! Nothing in this crate performs I/O.

pub mod error;
pub mod locator;
pub mod row;

pub use error::{CoreError, CoreResult};
pub use locator::{ObjectRef, StorageLocator, OBJECT_STORE_SCHEME};
pub use row::{sort_by_timestamp_desc, Row, TIMESTAMP_ATTRIBUTE};
