//! BDD test world: owns the client, its recording channel and every call
//! issued during a scenario.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use nlpwire_config::Config;

use crate::client::NlpClient;
use crate::dispatch::DispatchOutcome;
use crate::errors::ClientError;
use crate::kind::{OperationKind, RequestId};
use crate::lifecycle::{ConnectionState, PendingConnect};
use crate::message::Message;
use crate::observers::Disconnection;
use crate::registry::PendingCall;
use crate::results::OperationResult;

use super::recording_channel::{RecordingChannel, response_to};

/// Sender id the client is configured to trust.
pub const SERVICE_ID: &str = "nlp-service";

type CallFuture = Pin<Box<dyn Future<Output = Result<OperationResult, ClientError>> + Send>>;

struct IssuedCall {
    kind: OperationKind,
    id: RequestId,
    future: Option<CallFuture>,
    outcome: Option<Result<OperationResult, ClientError>>,
}

impl IssuedCall {
    fn new<T>(call: PendingCall<T>) -> Self
    where
        T: Into<OperationResult> + Send + 'static,
    {
        let (kind, id) = (call.kind(), call.id());
        Self {
            kind,
            id,
            future: Some(Box::pin(async move { call.await.map(Into::into) })),
            outcome: None,
        }
    }

    fn poll(&mut self) -> Option<&Result<OperationResult, ClientError>> {
        if let Some(future) = self.future.as_mut() {
            if let Some(outcome) = poll_once(future) {
                self.outcome = Some(outcome);
                self.future = None;
            }
        }
        self.outcome.as_ref()
    }
}

/// Polls `future` once without a runtime; `None` means it is still pending.
pub fn poll_once<F>(future: &mut F) -> Option<F::Output>
where
    F: Future + Unpin,
{
    let mut context = Context::from_waker(Waker::noop());
    match Pin::new(future).poll(&mut context) {
        Poll::Ready(output) => Some(output),
        Poll::Pending => None,
    }
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub channel: Arc<RecordingChannel>,
    client: NlpClient,
    pending_connect: Option<PendingConnect>,
    connect_outcome: Option<Result<(), ClientError>>,
    calls: Vec<IssuedCall>,
    issue_error: Option<ClientError>,
    last_outcome: Option<DispatchOutcome>,
    disconnections: Arc<Mutex<Vec<Disconnection>>>,
}

impl TestWorld {
    /// Builds a disconnected client that trusts [`SERVICE_ID`].
    #[must_use]
    pub fn new() -> Self {
        let channel = Arc::new(RecordingChannel::default());
        let config = Config::default().with_service_id(SERVICE_ID);
        let client = NlpClient::with_config(channel.clone(), &config);
        let disconnections = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&disconnections);
        let _observer = client.on_disconnect(move |event: &Disconnection| {
            sink.lock()
                .expect("disconnection log mutex poisoned")
                .push(event.clone());
        });
        Self {
            channel,
            client,
            pending_connect: None,
            connect_outcome: None,
            calls: Vec::new(),
            issue_error: None,
            last_outcome: None,
            disconnections,
        }
    }

    /// Client under test.
    #[must_use]
    pub fn client(&self) -> &NlpClient {
        &self.client
    }

    /// Starts a connection attempt and keeps its future.
    pub fn connect(&mut self) {
        self.connect_outcome = None;
        match self.client.connect() {
            Ok(pending) => self.pending_connect = Some(pending),
            Err(error) => self.connect_outcome = Some(Err(error)),
        }
    }

    /// Connects and has the service accept.
    pub fn connect_and_accept(&mut self) {
        self.connect();
        self.channel.accept();
        match self.connect_outcome() {
            Some(Ok(())) => {}
            other => panic!("connection should be accepted, got {other:?}"),
        }
    }

    /// Outcome of the latest connection attempt, once it has settled.
    pub fn connect_outcome(&mut self) -> Option<&Result<(), ClientError>> {
        if let Some(pending) = self.pending_connect.as_mut() {
            if let Some(outcome) = poll_once(pending) {
                self.connect_outcome = Some(outcome);
                self.pending_connect = None;
            }
        }
        self.connect_outcome.as_ref()
    }

    /// Issues one call of `kind` carrying `text`.
    pub fn issue(&mut self, kind: OperationKind, text: &str) {
        let client = &self.client;
        let issued = match kind {
            OperationKind::WordTokenize => client.word_tokenize(text).map(IssuedCall::new),
            OperationKind::PartOfSpeechTag => client.pos_tag(text).map(IssuedCall::new),
            OperationKind::NamedEntityChunk => client.named_entity_chunk(text).map(IssuedCall::new),
            OperationKind::Lemmatize => client.lemmatize(text).map(IssuedCall::new),
            OperationKind::LanguageDetect => client.detect_language(text).map(IssuedCall::new),
        };
        match issued {
            Ok(call) => {
                self.issue_error = None;
                self.calls.push(call);
            }
            Err(error) => self.issue_error = Some(error),
        }
    }

    /// Error returned by the latest issue attempt.
    #[must_use]
    pub fn issue_error(&self) -> Option<&ClientError> {
        self.issue_error.as_ref()
    }

    /// Answers call `index` (1-based, in issue order) as `sender_id`.
    pub fn answer(&mut self, index: usize, sender_id: &str, tokens: &[&str], tags: &[&str]) {
        let request = self.request_for(index);
        let response = response_to(&request, tokens, tags);
        self.last_outcome = Some(self.client.deliver(sender_id, &response));
    }

    /// Request that was sent for call `index`.
    #[must_use]
    pub fn request_for(&self, index: usize) -> Message {
        let call = self.call(index);
        self.channel
            .sent()
            .into_iter()
            .find(|message| {
                message.command() == Some(call.kind.as_str()) && message.request_id() == Some(call.id)
            })
            .unwrap_or_else(|| panic!("no request was sent for call {index}"))
    }

    /// Settled outcome of call `index`, or `None` while it is pending.
    pub fn outcome(&mut self, index: usize) -> Option<&Result<OperationResult, ClientError>> {
        self.call_mut(index).poll()
    }

    /// Dispatch outcome of the latest answer.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&DispatchOutcome> {
        self.last_outcome.as_ref()
    }

    /// Disconnections reported to the observer installed by [`Self::new`].
    #[must_use]
    pub fn disconnections(&self) -> Vec<Disconnection> {
        self.disconnections
            .lock()
            .expect("disconnection log mutex poisoned")
            .clone()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    fn call(&self, index: usize) -> &IssuedCall {
        index
            .checked_sub(1)
            .and_then(|slot| self.calls.get(slot))
            .unwrap_or_else(|| panic!("call {index} was never issued"))
    }

    fn call_mut(&mut self, index: usize) -> &mut IssuedCall {
        index
            .checked_sub(1)
            .and_then(|slot| self.calls.get_mut(slot))
            .unwrap_or_else(|| panic!("call {index} was never issued"))
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
