//! Labeled-field messages exchanged with the remote service.
//!
//! The channel adapter moves a [`Message`] as a generic bundle of named
//! fields. The field names the service understands live in [`wire`] so the
//! contract is kept in one place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::{OperationKind, RequestId};

/// Field labels used by the remote service.
pub mod wire {
    /// Operation kind label, e.g. `word_tokenize`.
    pub const COMMAND: &str = "command";
    /// Input text of a request.
    pub const INFO: &str = "info";
    /// Decimal string carrying the request id.
    pub const REQUEST_ID: &str = "request_id";
    /// Token list returned by every operation.
    pub const RETURN_TOKEN: &str = "return_token";
    /// Tag list returned by tagging and chunking.
    pub const RETURN_TAG: &str = "return_tag";
}

/// Mapping of field labels to primitive or array values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    fields: Map<String, Value>,
}

impl Message {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the outbound request for `kind` carrying `text`.
    #[must_use]
    pub fn request(kind: OperationKind, id: RequestId, text: &str) -> Self {
        Self::new()
            .with_field(wire::COMMAND, kind.as_str())
            .with_field(wire::INFO, text)
            .with_field(wire::REQUEST_ID, id.get().to_string())
    }

    /// Adds or replaces a field, returning the updated message.
    #[must_use]
    pub fn with_field(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(label, value);
        self
    }

    /// Adds or replaces a field in place.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(label.into(), value.into());
    }

    /// Raw value stored under `label`.
    #[must_use]
    pub fn field(&self, label: &str) -> Option<&Value> {
        self.fields.get(label)
    }

    /// String value stored under `label`, if the field holds a string.
    #[must_use]
    pub fn text(&self, label: &str) -> Option<&str> {
        self.field(label).and_then(Value::as_str)
    }

    /// String elements of the array stored under `label`.
    ///
    /// Absent or non-array fields produce an empty list and non-string
    /// elements are skipped.
    #[must_use]
    pub fn text_list(&self, label: &str) -> Vec<String> {
        self.field(label)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `command` label, untouched.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.text(wire::COMMAND)
    }

    /// Parses the `request_id` field.
    ///
    /// The service encodes ids as decimal strings; plain non-negative numbers
    /// are accepted as well.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self.field(wire::REQUEST_ID)? {
            Value::String(raw) => raw.trim().parse::<u64>().ok().map(RequestId::new),
            Value::Number(number) => number.as_u64().map(RequestId::new),
            _ => None,
        }
    }

    /// Iterates over field labels in sorted order.
    #[must_use]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the message has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
