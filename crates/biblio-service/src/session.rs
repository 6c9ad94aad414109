//! Per-user search session registry with TTL expiry.
//!
//! One session per user at any instant. A session owns its result list
//! (immutable after creation), its page cursor, and the expiry timer that
//! cleans it up if the user walks away. Termination — by TTL, explicit
//! clear, or replacement — happens exactly once per session, arbitrated
//! by the timer's claim flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::expiry::{ExpiryHandle, ExpiryScheduler};
use crate::messenger::Messenger;
use crate::metrics::Metrics;
use crate::page::paginate;
use crate::types::{BookRef, MessageRef, UserId};

/// An active search session for one user.
pub struct SearchSession {
    /// Distinguishes this session from any successor under the same user.
    pub session_id: Uuid,
    pub user_id: UserId,
    pub query: String,
    /// Immutable after creation.
    result_refs: Vec<BookRef>,
    pub created_at: Instant,
    /// The chat message showing the results. Weak reference: it may
    /// already be gone whenever cleanup runs.
    pub anchor: MessageRef,
    current_page: AtomicUsize,
    expiry: ExpiryHandle,
}

impl SearchSession {
    /// The session's result references, in search order.
    pub fn result_refs(&self) -> &[BookRef] {
        &self.result_refs
    }

    /// The page most recently shown.
    pub fn current_page(&self) -> usize {
        self.current_page.load(Ordering::Relaxed)
    }
}

/// One page of a session's results, as handed to the transport.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub items: Vec<BookRef>,
    pub index: usize,
    pub total_pages: usize,
}

/// Thread-safe registry of active search sessions, keyed by user.
///
/// Cloning shares the underlying table; the expiry callbacks hold a clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    sessions: DashMap<UserId, Arc<SearchSession>>,
    messenger: Arc<dyn Messenger>,
    metrics: Arc<Metrics>,
}

impl SessionStore {
    pub fn new(messenger: Arc<dyn Messenger>, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                sessions: DashMap::new(),
                messenger,
                metrics,
            }),
        }
    }

    /// Creates a session for `user_id`, replacing and terminating any
    /// predecessor, and arms its expiry timer for `ttl`.
    ///
    /// Callers only create sessions for non-empty result lists; an empty
    /// search is reported upstream without session state. The predecessor,
    /// if any, is swapped out before its timer is cancelled, so a stale
    /// fire in between removes nothing (identity mismatch).
    pub async fn create_session(
        &self,
        user_id: UserId,
        query: String,
        result_refs: Vec<BookRef>,
        anchor: MessageRef,
        ttl: Duration,
    ) -> Arc<SearchSession> {
        let session_id = Uuid::new_v4();

        let store = self.clone();
        let expiry = ExpiryScheduler::schedule(session_id, ttl, move |sid| async move {
            store.expire(user_id, sid).await;
        });

        let session = Arc::new(SearchSession {
            session_id,
            user_id,
            query,
            result_refs,
            created_at: Instant::now(),
            anchor,
            current_page: AtomicUsize::new(0),
            expiry,
        });

        let replaced = self.inner.sessions.insert(user_id, Arc::clone(&session));
        self.inner.metrics.record_session_created();

        if let Some(old) = replaced {
            // The old timer may already have won its claim; then it owns
            // cleanup and we skip the anchor delete here.
            if old.expiry.cancel() {
                self.inner.metrics.record_session_replaced();
                tracing::debug!(user_id, old = %old.session_id, new = %session_id, "replaced search session");
                self.delete_anchor(old.anchor).await;
            }
        }

        session
    }

    /// Returns the requested page and advances the session's cursor.
    ///
    /// The page is computed on the session's immutable result snapshot;
    /// no table lock is held while slicing.
    pub fn get_page(
        &self,
        user_id: UserId,
        page_index: usize,
        page_size: usize,
    ) -> Result<SessionPage, ServiceError> {
        let session = self.get(user_id).ok_or(ServiceError::SessionNotFound)?;

        let page = paginate(session.result_refs(), page_index, page_size);
        session.current_page.store(page.index, Ordering::Relaxed);

        Ok(SessionPage {
            items: page.items.to_vec(),
            index: page.index,
            total_pages: page.total_pages,
        })
    }

    /// Removes and terminates the user's session, if any.
    ///
    /// Claims the timer first: if the claim is lost, expiry is already
    /// performing cleanup and this call is a no-op returning `false`.
    /// Safe to call for absent or already-expired sessions.
    pub async fn clear(&self, user_id: UserId) -> bool {
        let Some(session) = self.get(user_id) else {
            return false;
        };

        if !session.expiry.cancel() {
            return false;
        }

        self.inner
            .sessions
            .remove_if(&user_id, |_, s| s.session_id == session.session_id);
        self.inner.metrics.record_session_cleared();
        tracing::debug!(user_id, session = %session.session_id, "cleared search session");
        self.delete_anchor(session.anchor).await;
        true
    }

    /// The user's active session, if any.
    pub fn get(&self, user_id: UserId) -> Option<Arc<SearchSession>> {
        self.inner
            .sessions
            .get(&user_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of active sessions.
    pub fn active_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Expiry callback body. Runs only after the timer won its claim.
    ///
    /// Removal is keyed by user id *and* session identity: a session
    /// replaced after this timer was armed must never lose its successor.
    async fn expire(&self, user_id: UserId, session_id: Uuid) {
        let removed = self
            .inner
            .sessions
            .remove_if(&user_id, |_, s| s.session_id == session_id);

        if let Some((_, session)) = removed {
            self.inner.metrics.record_session_expired();
            tracing::debug!(user_id, session = %session_id, "search session expired");
            self.delete_anchor(session.anchor).await;
        }
    }

    /// Best effort: a failed delete never fails the primary operation.
    async fn delete_anchor(&self, anchor: MessageRef) {
        if let Err(e) = self.inner.messenger.delete_message(anchor).await {
            tracing::warn!(
                chat_id = anchor.chat_id,
                message_id = anchor.message_id,
                error = %e,
                "failed to delete result message",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Messenger that counts deletions and can be told to fail them.
    struct CountingMessenger {
        deletes: AtomicUsize,
        sends: AtomicUsize,
        fail_deletes: bool,
    }

    impl CountingMessenger {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                deletes: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
                fail_deletes: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                deletes: AtomicUsize::new(0),
                sends: AtomicUsize::new(0),
                fail_deletes: true,
            })
        }

        fn deletes(&self) -> usize {
            self.deletes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Messenger for CountingMessenger {
        async fn delete_message(&self, _message: MessageRef) -> Result<(), ServiceError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail_deletes {
                return Err(ServiceError::Internal("message already gone".to_owned()));
            }
            Ok(())
        }

        async fn send_file(
            &self,
            _user_id: UserId,
            _file: crate::types::FileRef,
        ) -> Result<(), ServiceError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn refs(n: usize) -> Vec<BookRef> {
        (0..n)
            .map(|i| BookRef {
                book_id: format!("book-{i}"),
                title: format!("Title {i}"),
                author: "Author".to_owned(),
            })
            .collect()
    }

    fn anchor(message_id: i64) -> MessageRef {
        MessageRef {
            chat_id: 77,
            message_id,
        }
    }

    fn store_with(messenger: Arc<CountingMessenger>) -> SessionStore {
        SessionStore::new(messenger, Arc::new(Metrics::new()))
    }

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test(start_paused = true)]
    async fn test_replacement_terminates_predecessor_once() {
        let messenger = CountingMessenger::new();
        let store = store_with(Arc::clone(&messenger));

        let first = store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;
        let second = store
            .create_session(1, "tokio".into(), refs(4), anchor(11), TTL)
            .await;

        assert_eq!(store.active_count(), 1);
        assert_eq!(store.get(1).unwrap().session_id, second.session_id);
        // Old anchor deleted exactly once; old timer settled.
        assert_eq!(messenger.deletes(), 1);
        assert!(!first.expiry.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_page_advances_cursor_and_clamps() {
        let store = store_with(CountingMessenger::new());
        store
            .create_session(1, "rust".into(), refs(12), anchor(10), TTL)
            .await;

        let page = store.get_page(1, 0, 5).unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_pages, 3);

        let page = store.get_page(1, 5, 5).unwrap();
        assert_eq!(page.index, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(store.get(1).unwrap().current_page(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_page_without_session_fails_clean() {
        let store = store_with(CountingMessenger::new());
        let err = store.get_page(42, 0, 5).unwrap_err();
        assert!(matches!(err, ServiceError::SessionNotFound));
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_idempotent() {
        let messenger = CountingMessenger::new();
        let store = store_with(Arc::clone(&messenger));
        store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;

        assert!(store.clear(1).await);
        assert!(!store.clear(1).await);
        assert!(!store.clear(999).await);
        assert_eq!(messenger.deletes(), 1);
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_removes_session_and_anchor() {
        let messenger = CountingMessenger::new();
        let store = store_with(Arc::clone(&messenger));
        store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;

        tokio::time::sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.active_count(), 0);
        assert_eq!(messenger.deletes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_then_late_fire_is_noop() {
        let messenger = CountingMessenger::new();
        let store = store_with(Arc::clone(&messenger));
        store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.clear(1).await);

        // Past the original deadline: the cancelled timer must do nothing.
        tokio::time::sleep(Duration::from_secs(700)).await;
        tokio::task::yield_now().await;

        assert_eq!(messenger.deletes(), 1);
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expiry_never_touches_successor() {
        let messenger = CountingMessenger::new();
        let store = store_with(Arc::clone(&messenger));

        let old = store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;
        let new = store
            .create_session(1, "tokio".into(), refs(4), anchor(11), TTL)
            .await;

        // Even if the old timer's callback somehow ran now, the identity
        // check keeps the successor intact.
        store.expire(1, old.session_id).await;
        assert_eq!(store.get(1).unwrap().session_id, new.session_id);
        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_anchor_delete_still_clears_state() {
        let messenger = CountingMessenger::failing();
        let store = store_with(Arc::clone(&messenger));
        store
            .create_session(1, "rust".into(), refs(3), anchor(10), TTL)
            .await;

        assert!(store.clear(1).await);
        assert_eq!(store.active_count(), 0);
        assert_eq!(messenger.deletes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clear_races_expiry_exactly_one_cleanup() {
        // Real-time race: a very short TTL firing while clear runs.
        // Whichever actor wins the claim, cleanup executes exactly once.
        for _ in 0..25 {
            let messenger = CountingMessenger::new();
            let store = store_with(Arc::clone(&messenger));
            store
                .create_session(
                    1,
                    "rust".into(),
                    refs(3),
                    anchor(10),
                    Duration::from_millis(2),
                )
                .await;

            let racer = {
                let store = store.clone();
                tokio::spawn(async move { store.clear(1).await })
            };
            let _ = racer.await;

            // Let a winning timer task finish its cleanup.
            tokio::time::sleep(Duration::from_millis(25)).await;

            assert_eq!(messenger.deletes(), 1);
            assert_eq!(store.active_count(), 0);
        }
    }
}
