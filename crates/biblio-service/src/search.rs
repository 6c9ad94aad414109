//! Search and delivery orchestration.
//!
//! Stateless method collection tying the components together: acquire a
//! pooled handle, run the catalog query off the runtime, hand results to
//! the session store, page through them, deliver files. All state is
//! borrowed from `ServiceState`.

use crate::ServiceState;
use crate::error::ServiceError;
use crate::session::SessionPage;
use crate::store::Catalog;
use crate::types::{MessageRef, UserId};

/// Stateless search orchestration facade.
pub struct SearchService;

impl SearchService {
    /// Runs a catalog search on the owner's pooled handle and, for a
    /// non-empty result set, opens a session (replacing any predecessor)
    /// and returns its first page. `Ok(None)` means no results: the caller
    /// reports "nothing found" and no session state is left behind.
    pub async fn run_search<C: Catalog>(
        state: &ServiceState<C>,
        owner: &str,
        user_id: UserId,
        query: &str,
        anchor: MessageRef,
    ) -> Result<Option<SessionPage>, ServiceError> {
        let config = state.config();
        let limit = config.search_limit;
        let ttl = config.session_ttl;
        let page_size = config.page_size;

        let result = {
            let handle = state.pool().acquire(owner)?;
            let catalog = state.pool().connector();
            let query = query.to_owned();
            tokio::task::spawn_blocking(move || {
                let mut conn = handle.lock();
                catalog.search(&mut *conn, &query, limit)
            })
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
        };

        let hits = match result {
            Ok(hits) => {
                state.metrics().record_search(hits.len());
                hits
            }
            Err(e) => {
                state.metrics().record_search_error();
                return Err(e);
            }
        };

        if hits.is_empty() {
            tracing::debug!(user_id, query, "search returned no results");
            return Ok(None);
        }

        state
            .sessions()
            .create_session(user_id, query.to_owned(), hits, anchor, ttl)
            .await;

        Ok(Some(state.sessions().get_page(user_id, 0, page_size)?))
    }

    /// Returns the requested page of the user's active session, using the
    /// configured page size.
    pub fn get_page<C: Catalog>(
        state: &ServiceState<C>,
        user_id: UserId,
        page_index: usize,
    ) -> Result<SessionPage, ServiceError> {
        state
            .sessions()
            .get_page(user_id, page_index, state.config().page_size)
    }

    /// Resolves a book's file on the owner's pooled handle and delivers it.
    ///
    /// Returns `false` if the book vanished between search and delivery;
    /// the session stays usable either way.
    pub async fn send_book<C: Catalog>(
        state: &ServiceState<C>,
        owner: &str,
        user_id: UserId,
        book_id: &str,
    ) -> Result<bool, ServiceError> {
        let file = {
            let handle = state.pool().acquire(owner)?;
            let catalog = state.pool().connector();
            let book_id = book_id.to_owned();
            tokio::task::spawn_blocking(move || {
                let mut conn = handle.lock();
                catalog.fetch_file(&mut *conn, &book_id)
            })
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))??
        };

        let Some(file) = file else {
            tracing::debug!(user_id, book_id, "book no longer available");
            return Ok(false);
        };

        state.messenger().send_file(user_id, file).await?;
        state.metrics().record_download();
        Ok(true)
    }
}
