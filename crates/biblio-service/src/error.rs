//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. The chat adapter maps it to
//! whatever its frontend shows users ("nothing found", "try again later").

/// Service error shared across all entry points.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The backing store refused to open a handle. Pool state is unchanged.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// Page or clear requested for a user with no active search session.
    #[error("no active search session")]
    SessionNotFound,

    /// Invalid construction-time configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal error (task join failures and the like).
    #[error("internal error: {0}")]
    Internal(String),
}
