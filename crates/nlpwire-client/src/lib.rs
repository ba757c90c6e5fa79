//! Asynchronous client for a remote natural-language processing service.
//!
//! The service speaks a message-oriented protocol: each request is a flat
//! key/value [`Message`] naming an operation, carrying the input text and a
//! request id, and each response echoes the operation and id back. Responses
//! may arrive in any order. [`NlpClient`] allocates ids per operation kind,
//! parks one completion per outstanding call in a [`PendingRegistry`], and
//! resolves each [`PendingCall`] when the matching response is dispatched.
//!
//! Transport is abstracted behind [`ChannelAdapter`]. Adapters report
//! lifecycle and inbound traffic through [`ChannelEvents`]; the client never
//! assumes a particular runtime, so the returned futures can be awaited on any
//! executor.
//!
//! When the connection drops every outstanding call fails with
//! [`ClientError::ConnectionLost`] and registered observers receive a
//! [`Disconnection`] describing what was drained.

mod allocator;
mod channel;
mod client;
mod dispatch;
mod errors;
mod kind;
mod lifecycle;
mod message;
mod observers;
mod registry;
mod results;
pub mod telemetry;

pub use allocator::RequestIdAllocator;
pub use channel::{ChannelAdapter, ChannelError, ChannelEvents};
pub use client::NlpClient;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use errors::ClientError;
pub use kind::{OperationKind, OperationKindParseError, RequestId};
pub use lifecycle::{ConnectionState, PendingConnect};
pub use message::{Message, wire};
pub use observers::{Disconnection, ObserverId};
pub use registry::{DrainReport, PendingCall, PendingRegistry};
pub use results::{
    DetectedLanguage, EntityChunks, Lemma, Materialize, OperationResult, TaggedTokens, Tokens,
    materialize,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
