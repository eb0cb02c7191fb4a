//! HTTP document cache
//!
//! - [`cache`]: in-memory, process-lifetime cache keyed by URL
//! - [`store`]: optional SQLite persistence behind it

pub mod cache;
pub mod store;

pub use cache::{CachedDocument, HttpCache};
pub use store::DocumentStore;
