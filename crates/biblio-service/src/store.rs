//! The embedded-store seam.
//!
//! The core never talks to a concrete database. Hosts implement
//! `StoreConnector` to open handles (pooled by `ConnectionPool`) and
//! `Catalog` to run searches on a borrowed handle. Both are synchronous
//! by design: embedded stores block, so callers wrap the work in
//! `tokio::task::spawn_blocking`.

use crate::error::ServiceError;
use crate::types::{BookRef, FileRef};

/// Opens handles to the backing store.
pub trait StoreConnector: Send + Sync + 'static {
    /// One open connection. Closed by drop.
    type Handle: Send + 'static;

    /// Opens a fresh handle. A failure here must leave no residue; the
    /// pool admits nothing on error.
    fn connect(&self) -> Result<Self::Handle, ServiceError>;
}

/// Query execution against a borrowed store handle.
///
/// Results are opaque ordered references; the matching algorithm belongs
/// entirely to the implementor.
pub trait Catalog: StoreConnector {
    /// Runs a search, returning at most `limit` hits in relevance order.
    fn search(
        &self,
        conn: &mut Self::Handle,
        query: &str,
        limit: usize,
    ) -> Result<Vec<BookRef>, ServiceError>;

    /// Resolves the deliverable file behind a hit, recording the download
    /// if the store keeps such counts. `Ok(None)` means the book vanished
    /// between search and delivery.
    fn fetch_file(
        &self,
        conn: &mut Self::Handle,
        book_id: &str,
    ) -> Result<Option<FileRef>, ServiceError>;
}
