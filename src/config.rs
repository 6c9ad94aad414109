//! Host configuration via CLI args and environment variables.

use clap::Parser;

/// Host process for the Biblio book-delivery bot core.
#[derive(Parser, Debug, Clone)]
#[command(name = "biblio-bot", version, about)]
pub struct Config {
    /// SQLite catalog path. Omit for an in-memory catalog.
    #[arg(long, env = "BIBLIO_DB_PATH")]
    pub db_path: Option<String>,

    /// Maximum pooled store connections.
    #[arg(long, default_value_t = 5, env = "BIBLIO_POOL_CAPACITY")]
    pub pool_capacity: usize,

    /// Search session time-to-live in seconds.
    #[arg(long, default_value_t = 600, env = "BIBLIO_SESSION_TTL")]
    pub session_ttl: u64,

    /// Results shown per page.
    #[arg(long, default_value_t = 5, env = "BIBLIO_PAGE_SIZE")]
    pub page_size: usize,

    /// Cap on results fetched per search.
    #[arg(long, default_value_t = 50, env = "BIBLIO_SEARCH_LIMIT")]
    pub search_limit: usize,

    /// Seed a small demo catalog when the store is empty.
    #[arg(
        long,
        default_value_t = true,
        env = "BIBLIO_SEED_DEMO",
        action = clap::ArgAction::Set
    )]
    pub seed_demo: bool,

    /// Log level.
    #[arg(long, default_value = "info", env = "BIBLIO_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "BIBLIO_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// The service-layer slice of this config.
    pub fn service_config(&self) -> biblio_service::ServiceConfig {
        biblio_service::ServiceConfig {
            pool_capacity: self.pool_capacity,
            session_ttl: std::time::Duration::from_secs(self.session_ttl),
            page_size: self.page_size,
            search_limit: self.search_limit,
        }
    }
}
