//! Error types surfaced by the client.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::kind::{OperationKind, RequestId};

/// Errors returned to callers of [`crate::NlpClient`].
///
/// Registration-time failures are returned synchronously before any I/O.
/// `ConnectionLost` is delivered asynchronously to every outstanding future
/// when the channel goes down.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// An operation was issued while the client was not connected.
    #[error("client is not connected")]
    NotConnected,

    /// The remote service refused the connection handshake.
    #[error("connection rejected by the remote service")]
    ConnectionRejected,

    /// The channel went down while the call was outstanding.
    #[error("connection lost")]
    ConnectionLost,

    /// A request id was reused while its previous entry was still pending.
    #[error("request {id} for {kind} is already pending")]
    DuplicateRequest {
        /// Kind of the colliding entry.
        kind: OperationKind,
        /// Reused id.
        id: RequestId,
    },

    /// `connect` was called while a connection attempt was in flight.
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    /// `connect` was called on a connected client.
    #[error("client is already connected")]
    AlreadyConnected,

    /// The channel adapter failed a connect, send, or registration call.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

impl ClientError {
    pub(crate) const fn duplicate(kind: OperationKind, id: RequestId) -> Self {
        Self::DuplicateRequest { kind, id }
    }

    /// Whether the error was caused by the channel going away.
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionLost)
    }
}
