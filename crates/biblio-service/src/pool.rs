//! Bounded per-owner connection pool with LRU eviction.
//!
//! Each owner key (worker identity) gets at most one handle, reused across
//! calls. When admitting a new owner would exceed capacity, the entry with
//! the oldest `last_used` among *other* owners is dropped first. Handles
//! are borrowed as `Arc<parking_lot::Mutex<H>>`; the pool retains
//! ownership, so `release` is a documented no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::store::StoreConnector;

struct PooledEntry<H> {
    handle: Arc<Mutex<H>>,
    last_used: Instant,
    /// Insertion sequence, the eviction tie-break under coarse clocks.
    seq: u64,
}

struct PoolTable<H> {
    entries: HashMap<String, PooledEntry<H>>,
    next_seq: u64,
}

/// Thread-safe pool of store handles keyed by owner identity.
pub struct ConnectionPool<C: StoreConnector> {
    connector: Arc<C>,
    capacity: usize,
    metrics: Arc<Metrics>,
    table: Mutex<PoolTable<C::Handle>>,
}

impl<C: StoreConnector> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<C: StoreConnector> ConnectionPool<C> {
    /// Creates a pool admitting at most `capacity` handles.
    ///
    /// A capacity of zero is invalid: the pool could never serve anyone.
    pub fn new(
        connector: Arc<C>,
        capacity: usize,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ServiceError> {
        if capacity == 0 {
            return Err(ServiceError::Config(
                "pool capacity must be at least 1".to_owned(),
            ));
        }
        Ok(Self {
            connector,
            capacity,
            metrics,
            table: Mutex::new(PoolTable {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        })
    }

    /// Returns the owner's handle, opening one on first acquire.
    ///
    /// Refreshes the entry's `last_used` on every call. The connect happens
    /// outside the table lock, so a failed open leaves the table untouched
    /// and a slow open never stalls other owners' acquires. Eviction and
    /// insertion run atomically under the table lock.
    pub fn acquire(&self, owner: &str) -> Result<Arc<Mutex<C::Handle>>, ServiceError> {
        if let Some(handle) = self.lookup(owner) {
            return Ok(handle);
        }

        let fresh = self.connector.connect()?;

        let mut table = self.table.lock();
        // Another caller may have admitted this owner while we connected.
        if let Some(entry) = table.entries.get_mut(owner) {
            entry.last_used = Instant::now();
            return Ok(Arc::clone(&entry.handle));
        }

        if table.entries.len() >= self.capacity && evict_oldest(&mut table.entries, owner) {
            self.metrics.record_pool_eviction();
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        let handle = Arc::new(Mutex::new(fresh));
        table.entries.insert(
            owner.to_owned(),
            PooledEntry {
                handle: Arc::clone(&handle),
                last_used: Instant::now(),
                seq,
            },
        );
        tracing::debug!(owner, pooled = table.entries.len(), "opened store handle");
        Ok(handle)
    }

    /// Borrowing semantics: handles stay pooled. Nothing to return.
    pub fn release(&self, _owner: &str) {}

    /// Shared reference to the connector, for running queries against a
    /// borrowed handle off the async runtime.
    pub fn connector(&self) -> Arc<C> {
        Arc::clone(&self.connector)
    }

    /// Number of pooled handles.
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().entries.len() == 0
    }

    /// Whether an owner currently holds a pooled handle.
    pub fn contains(&self, owner: &str) -> bool {
        self.table.lock().entries.contains_key(owner)
    }

    /// Drops every pooled handle. Used at process shutdown.
    pub fn shutdown(&self) {
        let mut table = self.table.lock();
        let drained = table.entries.len();
        table.entries.clear();
        if drained > 0 {
            tracing::info!(drained, "closed pooled store handles");
        }
    }

    fn lookup(&self, owner: &str) -> Option<Arc<Mutex<C::Handle>>> {
        let mut table = self.table.lock();
        let entry = table.entries.get_mut(owner)?;
        entry.last_used = Instant::now();
        Some(Arc::clone(&entry.handle))
    }
}

/// Removes the entry with the globally smallest `(last_used, seq)` among
/// owners other than `admitting`. Dropping the entry closes its handle
/// once the last borrower lets go.
fn evict_oldest<H>(entries: &mut HashMap<String, PooledEntry<H>>, admitting: &str) -> bool {
    let victim = entries
        .iter()
        .filter(|(key, _)| key.as_str() != admitting)
        .min_by_key(|(_, entry)| (entry.last_used, entry.seq))
        .map(|(key, _)| key.clone());

    if let Some(key) = victim {
        entries.remove(&key);
        tracing::debug!(owner = %key, "evicted least-recently-used store handle");
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Connector whose handles count opens and closes.
    struct CountingConnector {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        fail: bool,
    }

    #[derive(Debug)]
    struct CountingHandle {
        closed: Arc<AtomicUsize>,
    }

    impl Drop for CountingHandle {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingConnector {
        fn new() -> Self {
            Self {
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }
    }

    impl StoreConnector for CountingConnector {
        type Handle = CountingHandle;

        fn connect(&self) -> Result<Self::Handle, ServiceError> {
            if self.fail {
                return Err(ServiceError::Connection("store is down".to_owned()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(CountingHandle {
                closed: Arc::clone(&self.closed),
            })
        }
    }

    fn new_pool<C: StoreConnector>(connector: C, capacity: usize) -> ConnectionPool<C> {
        ConnectionPool::new(Arc::new(connector), capacity, Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ConnectionPool::new(
            Arc::new(CountingConnector::new()),
            0,
            Arc::new(Metrics::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn test_acquire_reuses_per_owner_handle() {
        let connector = CountingConnector::new();
        let opened = Arc::clone(&connector.opened);
        let pool = new_pool(connector, 2);

        let first = pool.acquire("worker-1").unwrap();
        let second = pool.acquire("worker-1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let pool = new_pool(CountingConnector::new(), 3);
        for owner in ["a", "b", "c", "d", "e", "f"] {
            pool.acquire(owner).unwrap();
            assert!(pool.len() <= 3);
        }
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_eviction_removes_oldest_and_closes_handle() {
        let connector = CountingConnector::new();
        let closed = Arc::clone(&connector.closed);
        let pool = new_pool(connector, 2);

        pool.acquire("x").unwrap();
        pool.acquire("y").unwrap();
        // Refresh x so y becomes the oldest.
        pool.acquire("x").unwrap();

        pool.acquire("z").unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("x"));
        assert!(pool.contains("z"));
        assert!(!pool.contains("y"));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tie_break_evicts_first_inserted() {
        let pool = new_pool(CountingConnector::new(), 2);
        pool.acquire("first").unwrap();
        pool.acquire("second").unwrap();

        // Force identical timestamps, as a coarse clock would produce.
        let tied = Instant::now();
        {
            let mut table = pool.table.lock();
            for entry in table.entries.values_mut() {
                entry.last_used = tied;
            }
        }

        pool.acquire("third").unwrap();
        assert!(!pool.contains("first"));
        assert!(pool.contains("second"));
        assert!(pool.contains("third"));
    }

    #[test]
    fn test_failed_connect_leaves_pool_unchanged() {
        let mut connector = CountingConnector::new();
        connector.fail = true;
        let pool = new_pool(connector, 2);

        let err = pool.acquire("worker-1").unwrap_err();
        assert!(matches!(err, ServiceError::Connection(_)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_shutdown_closes_all_handles() {
        let connector = CountingConnector::new();
        let closed = Arc::clone(&connector.closed);
        let pool = new_pool(connector, 4);

        pool.acquire("a").unwrap();
        pool.acquire("b").unwrap();
        pool.shutdown();

        assert!(pool.is_empty());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_acquires_respect_capacity() {
        let pool = Arc::new(new_pool(CountingConnector::new(), 4));
        let mut joins = Vec::new();
        for i in 0..8 {
            let pool = Arc::clone(&pool);
            joins.push(std::thread::spawn(move || {
                for round in 0..50 {
                    let owner = format!("worker-{}", (i + round) % 8);
                    pool.acquire(&owner).unwrap();
                    assert!(pool.len() <= 4);
                }
            }));
        }
        for join in joins {
            join.join().unwrap();
        }
        assert!(pool.len() <= 4);
    }
}
