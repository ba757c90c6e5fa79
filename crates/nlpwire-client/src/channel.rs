//! Contract with the transport that carries messages to the remote service.
//!
//! The client drives a [`ChannelAdapter`] and receives lifecycle events and
//! inbound messages through [`ChannelEvents`]. Adapters know nothing about
//! operation kinds; they only move [`Message`] bundles.

use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

use crate::message::Message;

/// Failure reported by a channel adapter.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChannelError {
    message: String,
    #[source]
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl ChannelError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::from(source.into())),
        }
    }

    /// Human-friendly description without the optional source.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Transport primitives consumed by the client.
///
/// Calls must not block on the network. Outcomes of [`Self::connect`] are
/// reported later through the [`ChannelEvents`] handed to it, possibly
/// before `connect` returns.
pub trait ChannelAdapter: Send + Sync {
    /// Starts connecting; accept, reject and disconnect signals go to `events`.
    fn connect(&self, events: Arc<dyn ChannelEvents>) -> Result<(), ChannelError>;

    /// Closes the physical connection.
    fn disconnect(&self) -> Result<(), ChannelError>;

    /// Sends one message to the remote service.
    fn send(&self, message: &Message) -> Result<(), ChannelError>;

    /// Registers the client for inbound message delivery.
    fn register(&self) -> Result<(), ChannelError>;

    /// Stops inbound message delivery.
    fn unregister(&self) -> Result<(), ChannelError>;
}

/// Signals delivered by a channel adapter.
///
/// Inbound messages are delivered serially on one path; lifecycle events may
/// arrive on any thread.
pub trait ChannelEvents: Send + Sync {
    /// The remote service accepted the connection.
    fn on_connected(&self);

    /// The remote service refused the connection.
    fn on_rejected(&self);

    /// The connection went down.
    fn on_disconnected(&self);

    /// A message arrived from `sender_id`.
    fn on_message(&self, sender_id: &str, message: Message);
}
