//! Routing of inbound messages to pending calls.

use tracing::{debug, warn};

use crate::kind::{OperationKind, RequestId};
use crate::message::{Message, wire};
use crate::registry::PendingRegistry;

/// Log target for dispatch decisions.
pub(crate) const DISPATCH_TARGET: &str = "nlpwire_client::dispatch";

/// What happened to one inbound message.
///
/// Only [`Self::Delivered`] reaches a caller; every other outcome is logged
/// and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The matching pending call was completed.
    Delivered {
        /// Kind of the completed call.
        kind: OperationKind,
        /// Id of the completed call.
        id: RequestId,
    },
    /// No call was pending for the pair; late or duplicate response.
    Unmatched {
        /// Kind named by the message.
        kind: OperationKind,
        /// Id named by the message.
        id: RequestId,
    },
    /// The `command` field was missing or named no known kind.
    UnknownKind {
        /// Raw label, if one was present.
        label: Option<String>,
    },
    /// The `request_id` field was missing or not a non-negative integer.
    MissingRequestId {
        /// Kind named by the message.
        kind: OperationKind,
    },
    /// The message came from a sender other than the configured service.
    ForeignSender {
        /// Sender reported by the channel adapter.
        sender_id: String,
    },
    /// The client was not connected when the message arrived.
    NotConnected,
}

impl DispatchOutcome {
    /// Whether a caller received the message.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Reads the kind and id labels of inbound messages and resolves the
/// matching registry entry.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    service_id: Option<String>,
}

impl Dispatcher {
    /// Creates a dispatcher that accepts every sender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher that only accepts messages from `service_id`.
    #[must_use]
    pub fn for_service(service_id: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.into()),
        }
    }

    /// Routes `message` to its pending call.
    #[must_use]
    pub fn dispatch(
        &self,
        registry: &PendingRegistry,
        sender_id: &str,
        message: &Message,
    ) -> DispatchOutcome {
        if let Some(expected) = self.service_id.as_deref()
            && expected != sender_id
        {
            warn!(
                target: DISPATCH_TARGET,
                sender_id,
                expected,
                "discarding message from unexpected sender"
            );
            return DispatchOutcome::ForeignSender {
                sender_id: sender_id.to_owned(),
            };
        }

        let Some(kind) = message.command().and_then(|label| label.parse::<OperationKind>().ok()) else {
            let label = message.command().map(str::to_owned);
            warn!(
                target: DISPATCH_TARGET,
                label = ?label,
                "discarding message with unknown operation kind"
            );
            return DispatchOutcome::UnknownKind { label };
        };

        let Some(id) = message.request_id() else {
            warn!(
                target: DISPATCH_TARGET,
                %kind,
                raw = ?message.field(wire::REQUEST_ID),
                "discarding message without a usable request id"
            );
            return DispatchOutcome::MissingRequestId { kind };
        };

        if registry.resolve(kind, id, message) {
            debug!(target: DISPATCH_TARGET, %kind, %id, "delivered response");
            DispatchOutcome::Delivered { kind, id }
        } else {
            warn!(
                target: DISPATCH_TARGET,
                %kind,
                %id,
                "no pending request for response; late or duplicate delivery"
            );
            DispatchOutcome::Unmatched { kind, id }
        }
    }
}
