//! Biblio Service — core resource and session management for the Biblio
//! book-delivery bot.
//!
//! This crate contains all transport-agnostic business logic: the bounded
//! store-connection pool, the per-user search session registry with TTL
//! expiry, pagination, and delivery orchestration.
//!
//! Chat adapters depend on this crate and provide the platform-specific
//! frontend (command parsing, message formatting, keyboards).
//!
//! **Zero transport dependencies** — no chat-API or wire-protocol code.

pub mod error;
pub mod expiry;
pub mod messenger;
pub mod metrics;
pub mod page;
pub mod pool;
pub mod search;
pub mod session;
pub mod store;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use error::ServiceError;
use messenger::Messenger;
use metrics::Metrics;
use pool::ConnectionPool;
use session::SessionStore;
use store::StoreConnector;

/// Configuration subset relevant to the service layer.
///
/// Transport-specific config (bot tokens, webhook ports) stays in the
/// host binary's own config struct.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Maximum simultaneously open store handles.
    pub pool_capacity: usize,
    /// How long an unattended search session lives.
    pub session_ttl: Duration,
    /// Results shown per page.
    pub page_size: usize,
    /// Cap on results fetched per search.
    pub search_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 5,
            session_ttl: Duration::from_secs(600),
            page_size: 5,
            search_limit: 50,
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.page_size == 0 {
            return Err(ServiceError::Config("page size must be at least 1".into()));
        }
        if self.search_limit == 0 {
            return Err(ServiceError::Config(
                "search limit must be at least 1".into(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(ServiceError::Config(
                "session TTL must be non-zero".into(),
            ));
        }
        // pool_capacity is validated by the pool constructor.
        Ok(())
    }
}

/// Shared service state, cloneable across all host handlers.
///
/// Wraps the pool, session store, and metrics in an `Arc`. Transport
/// adapters receive this and delegate all logic to it.
pub struct ServiceState<C: StoreConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: StoreConnector> std::fmt::Debug for ServiceState<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<C: StoreConnector> Clone for ServiceState<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C: StoreConnector> {
    pool: ConnectionPool<C>,
    sessions: SessionStore,
    messenger: Arc<dyn Messenger>,
    metrics: Arc<Metrics>,
    config: ServiceConfig,
    start_time: Instant,
}

impl<C: StoreConnector> ServiceState<C> {
    /// Creates service state from config, a store connector, and the
    /// messaging collaborator. Rejects invalid configuration.
    pub fn new(
        config: ServiceConfig,
        connector: Arc<C>,
        messenger: Arc<dyn Messenger>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let metrics = Arc::new(Metrics::new());
        let pool = ConnectionPool::new(connector, config.pool_capacity, Arc::clone(&metrics))?;
        let sessions = SessionStore::new(Arc::clone(&messenger), Arc::clone(&metrics));

        Ok(Self {
            inner: Arc::new(Inner {
                pool,
                sessions,
                messenger,
                metrics,
                config,
                start_time: Instant::now(),
            }),
        })
    }

    // --- Accessors ---

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.inner.pool
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.inner.messenger
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    // --- Maintenance ---

    /// Render current metrics in Prometheus text format.
    pub fn render_metrics(&self) -> String {
        self.inner.metrics.render(
            self.inner.sessions.active_count(),
            self.inner.pool.len(),
            self.uptime_secs(),
        )
    }

    /// Closes all pooled store handles. Used at process shutdown.
    pub fn shutdown(&self) {
        self.inner.pool.shutdown();
    }
}
