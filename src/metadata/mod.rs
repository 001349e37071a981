//! Metadata store
//!
//! Disease advisory and supplement tables, both keyed by class index.
//! Loaded once at startup and shared read-only across calls.

pub mod store;
pub mod table;

pub use store::{AdvisoryRecord, MetadataStore, SupplementRecord};
pub use table::MetadataTable;
