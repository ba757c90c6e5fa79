//! Channel double that records traffic and lets tests drive lifecycle events.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::channel::{ChannelAdapter, ChannelError, ChannelEvents};
use crate::kind::OperationKind;
use crate::message::{Message, wire};

/// Adapter calls observed by the double.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Connect,
    Disconnect,
    Send(Message),
    Register,
    Unregister,
}

/// Adapter operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Connect,
    Send,
    Register,
}

#[derive(Default)]
struct ChannelState {
    calls: Vec<ChannelCall>,
    events: Option<Arc<dyn ChannelEvents>>,
    failures: HashSet<FailurePoint>,
}

/// Records every adapter call and holds the event sink handed to `connect`.
#[derive(Default)]
pub struct RecordingChannel {
    state: Mutex<ChannelState>,
}

impl RecordingChannel {
    /// Makes `point` fail until the double is dropped.
    pub fn fail_on(&self, point: FailurePoint) {
        self.with_state(|state| state.failures.insert(point));
    }

    /// Snapshot of the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Messages passed to `send`, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::Send(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Most recent request sent for `kind`.
    #[must_use]
    pub fn last_request(&self, kind: OperationKind) -> Option<Message> {
        self.sent()
            .into_iter()
            .rev()
            .find(|message| message.command() == Some(kind.as_str()))
    }

    /// Number of recorded calls equal to `call`.
    #[must_use]
    pub fn count(&self, call: &ChannelCall) -> usize {
        self.calls().iter().filter(|recorded| *recorded == call).count()
    }

    /// Signals that the service accepted the connection.
    pub fn accept(&self) {
        self.events().on_connected();
    }

    /// Signals that the service refused the connection.
    pub fn reject(&self) {
        self.events().on_rejected();
    }

    /// Signals that the connection went down.
    pub fn drop_connection(&self) {
        self.events().on_disconnected();
    }

    /// Delivers `message` as if it came from `sender_id`.
    pub fn deliver(&self, sender_id: &str, message: Message) {
        self.events().on_message(sender_id, message);
    }

    fn events(&self) -> Arc<dyn ChannelEvents> {
        self.with_state(|state| state.events.clone())
            .expect("connect was never called on the recording channel")
    }

    fn record(&self, call: ChannelCall, point: Option<FailurePoint>) -> Result<(), ChannelError> {
        self.with_state(|state| {
            state.calls.push(call);
            match point {
                Some(point) if state.failures.contains(&point) => {
                    Err(ChannelError::new(format!("injected {point:?} failure")))
                }
                _ => Ok(()),
            }
        })
    }

    fn with_state<R>(&self, action: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut guard = self.state.lock().expect("recording channel mutex poisoned");
        action(&mut guard)
    }
}

impl ChannelAdapter for RecordingChannel {
    fn connect(&self, events: Arc<dyn ChannelEvents>) -> Result<(), ChannelError> {
        self.with_state(|state| state.events = Some(events));
        self.record(ChannelCall::Connect, Some(FailurePoint::Connect))
    }

    fn disconnect(&self) -> Result<(), ChannelError> {
        self.record(ChannelCall::Disconnect, None)
    }

    fn send(&self, message: &Message) -> Result<(), ChannelError> {
        self.record(ChannelCall::Send(message.clone()), Some(FailurePoint::Send))
    }

    fn register(&self) -> Result<(), ChannelError> {
        self.record(ChannelCall::Register, Some(FailurePoint::Register))
    }

    fn unregister(&self) -> Result<(), ChannelError> {
        self.record(ChannelCall::Unregister, None)
    }
}

/// Builds the service's answer to `request`.
///
/// Tags are only attached when `tags` is non-empty.
#[must_use]
pub fn response_to(request: &Message, tokens: &[&str], tags: &[&str]) -> Message {
    let echo = |label: &str| request.field(label).cloned().unwrap_or(Value::Null);
    let response = Message::new()
        .with_field(wire::COMMAND, echo(wire::COMMAND))
        .with_field(wire::REQUEST_ID, echo(wire::REQUEST_ID))
        .with_field(wire::RETURN_TOKEN, to_array(tokens));
    if tags.is_empty() {
        response
    } else {
        response.with_field(wire::RETURN_TAG, to_array(tags))
    }
}

fn to_array(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|item| Value::from(*item)).collect())
}
