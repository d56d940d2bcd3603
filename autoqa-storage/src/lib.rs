//! AutoQA Storage - Upstream Adapters and Read Cache
//!
//! Wraps the two remote services the dashboard reads from:
//! - the table store (DynamoDB), scanned in full and unmarshalled into plain rows
//! - the object store (S3), used only to mint time-limited signed links
//!
//! Table scans go through [`CachedTableReader`], which memoises each table's
//! rows per fixed time bucket.

pub mod cache;
pub mod clock;
pub mod deadline;
pub mod dynamo;
pub mod error;
pub mod reader;
pub mod s3;
pub mod signer;

pub use cache::{BucketedCache, CacheStats, TimeBucket, TABLE_SCAN_WINDOW};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dynamo::{unmarshall_item, unmarshall_value, DynamoTableScanner};
pub use error::{StorageError, StorageResult};
pub use reader::{CachedTableReader, TableScanner};
pub use s3::{S3LinkSigner, SIGNED_LINK_TTL};
pub use signer::LinkSigner;
