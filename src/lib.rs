//! Biblio bot host library.
//!
//! Wires the service core to a concrete SQLite catalog and a messenger.
//! Chat adapters embed [`BotState`] and drive it from their own handlers.

pub mod catalog;
pub mod config;
pub mod messenger;

use std::sync::Arc;

use biblio_service::ServiceState;
use biblio_service::error::ServiceError;
use biblio_service::messenger::Messenger;
use biblio_service::store::StoreConnector;

use catalog::SqliteCatalog;
use config::Config;

/// Service state specialized to the SQLite catalog.
pub type BotState = ServiceState<SqliteCatalog>;

/// Builds the full host state from config: opens the catalog, ensures its
/// schema, optionally seeds the demo data, and assembles the service core.
pub fn build_state(config: &Config, messenger: Arc<dyn Messenger>) -> Result<BotState, ServiceError> {
    let catalog = match &config.db_path {
        Some(path) => SqliteCatalog::open(path)?,
        None => SqliteCatalog::in_memory()?,
    };

    if config.seed_demo {
        let mut conn = catalog.connect()?;
        catalog.seed_demo(&mut conn)?;
    }

    ServiceState::new(config.service_config(), Arc::new(catalog), messenger)
}
