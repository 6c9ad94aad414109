//! Atomic-counter metrics with Prometheus text rendering.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Application-wide metrics collected via atomic counters.
pub struct Metrics {
    searches_total: AtomicU64,
    search_errors_total: AtomicU64,
    empty_searches_total: AtomicU64,
    downloads_total: AtomicU64,
    sessions_created_total: AtomicU64,
    sessions_replaced_total: AtomicU64,
    sessions_expired_total: AtomicU64,
    sessions_cleared_total: AtomicU64,
    pool_evictions_total: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            searches_total: AtomicU64::new(0),
            search_errors_total: AtomicU64::new(0),
            empty_searches_total: AtomicU64::new(0),
            downloads_total: AtomicU64::new(0),
            sessions_created_total: AtomicU64::new(0),
            sessions_replaced_total: AtomicU64::new(0),
            sessions_expired_total: AtomicU64::new(0),
            sessions_cleared_total: AtomicU64::new(0),
            pool_evictions_total: AtomicU64::new(0),
        }
    }

    /// Record a completed search. Empty result sets are tracked separately
    /// so hosts can see how often users come up dry.
    pub fn record_search(&self, hits: usize) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
        if hits == 0 {
            self.empty_searches_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_search_error(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
        self.search_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self) {
        self.downloads_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_created(&self) {
        self.sessions_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_replaced(&self) {
        self.sessions_replaced_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_expired(&self) {
        self.sessions_expired_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_cleared(&self) {
        self.sessions_cleared_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pool_eviction(&self) {
        self.pool_evictions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn searches_total(&self) -> u64 {
        self.searches_total.load(Ordering::Relaxed)
    }

    pub fn downloads_total(&self) -> u64 {
        self.downloads_total.load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, active_sessions: usize, pooled_handles: usize, uptime_secs: u64) -> String {
        let mut out = String::with_capacity(1024);

        gauge(
            &mut out,
            "biblio_active_sessions_total",
            "Active search sessions",
            active_sessions,
        );
        gauge(
            &mut out,
            "biblio_pooled_handles_total",
            "Open pooled store handles",
            pooled_handles,
        );
        gauge(
            &mut out,
            "biblio_uptime_seconds",
            "Host uptime in seconds",
            uptime_secs,
        );

        counter(
            &mut out,
            "biblio_searches_total",
            "Total searches executed.",
            self.searches_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_search_errors_total",
            "Total failed searches.",
            self.search_errors_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_empty_searches_total",
            "Searches returning no results.",
            self.empty_searches_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_downloads_total",
            "Total files delivered.",
            self.downloads_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_sessions_created_total",
            "Search sessions created.",
            self.sessions_created_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_sessions_replaced_total",
            "Sessions terminated by a newer search.",
            self.sessions_replaced_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_sessions_expired_total",
            "Sessions removed by TTL expiry.",
            self.sessions_expired_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_sessions_cleared_total",
            "Sessions removed by explicit clear.",
            self.sessions_cleared_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "biblio_pool_evictions_total",
            "Pooled handles evicted for capacity.",
            self.pool_evictions_total.load(Ordering::Relaxed),
        );

        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} gauge").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} counter").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}
