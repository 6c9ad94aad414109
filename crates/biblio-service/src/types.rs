//! Shared value types passed between the core and its collaborators.
//!
//! The core treats all of these as opaque: it orders and slices `BookRef`
//! lists but never inspects their contents, and it hands `MessageRef` /
//! `FileRef` back to the messenger untouched.

use serde::{Deserialize, Serialize};

/// Chat-platform user identifier.
pub type UserId = i64;

/// A single catalog hit, carried through search results and pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRef {
    /// Stable catalog identifier.
    pub book_id: String,
    /// Display title.
    pub title: String,
    /// Display author.
    pub author: String,
}

/// Opaque reference to a deliverable file held by the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef(pub String);

/// Weak reference to the chat message anchoring a result listing.
///
/// The referenced message may be gone by the time cleanup runs; deleting
/// it is always best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}
