//! Client facade over one channel to the remote service.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use nlpwire_config::Config;
use tracing::{debug, info, warn};

use crate::allocator::RequestIdAllocator;
use crate::channel::{ChannelAdapter, ChannelEvents};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::errors::ClientError;
use crate::kind::OperationKind;
use crate::lifecycle::{ConnectionState, Disconnect, Lifecycle, PendingConnect};
use crate::message::Message;
use crate::observers::{DisconnectObservers, Disconnection, ObserverId};
use crate::registry::{DrainReport, PendingCall, PendingRegistry};
use crate::results::{DetectedLanguage, EntityChunks, Lemma, Materialize, TaggedTokens, Tokens};

/// Log target for client lifecycle and issue events.
pub(crate) const CLIENT_TARGET: &str = "nlpwire_client::client";

/// Correlates calls issued over a [`ChannelAdapter`] with their responses.
///
/// Every operation returns a [`PendingCall`] synchronously once the request is
/// registered and sent; awaiting it yields the typed result. Dropping the
/// client disposes it.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use nlpwire_client::NlpClient;
///
/// let client = NlpClient::new(Arc::new(adapter));
/// client.connect()?.await?;
/// let tokens = client.word_tokenize("a b")?.await?;
/// ```
pub struct NlpClient {
    shared: Arc<Shared>,
}

struct Shared {
    adapter: Arc<dyn ChannelAdapter>,
    allocator: RequestIdAllocator,
    registry: PendingRegistry,
    dispatcher: Dispatcher,
    lifecycle: Mutex<Lifecycle>,
    observers: DisconnectObservers,
}

/// Adapter-facing event sink. Holds the client weakly so an adapter keeping
/// the sink alive does not keep the client alive.
struct EventSink {
    shared: Weak<Shared>,
}

impl NlpClient {
    /// Creates a disconnected client that accepts responses from any sender.
    #[must_use]
    pub fn new(adapter: Arc<dyn ChannelAdapter>) -> Self {
        Self::with_dispatcher(adapter, Dispatcher::new())
    }

    /// Creates a disconnected client configured from `config`.
    #[must_use]
    pub fn with_config(adapter: Arc<dyn ChannelAdapter>, config: &Config) -> Self {
        let dispatcher = config
            .service_id()
            .map_or_else(Dispatcher::new, Dispatcher::for_service);
        Self::with_dispatcher(adapter, dispatcher)
    }

    fn with_dispatcher(adapter: Arc<dyn ChannelAdapter>, dispatcher: Dispatcher) -> Self {
        Self {
            shared: Arc::new(Shared {
                adapter,
                allocator: RequestIdAllocator::new(),
                registry: PendingRegistry::new(),
                dispatcher,
                lifecycle: Mutex::new(Lifecycle::default()),
                observers: DisconnectObservers::default(),
            }),
        }
    }

    /// Starts connecting to the remote service.
    ///
    /// The returned future resolves when the service accepts or rejects the
    /// connection.
    ///
    /// # Errors
    ///
    /// [`ClientError::AlreadyConnecting`] or [`ClientError::AlreadyConnected`]
    /// when a connection exists or is in flight, and [`ClientError::Channel`]
    /// when the adapter cannot start connecting.
    pub fn connect(&self) -> Result<PendingConnect, ClientError> {
        let pending = self.shared.with_lifecycle(Lifecycle::begin_connect)?;
        info!(target: CLIENT_TARGET, "connecting to remote service");

        let events: Arc<dyn ChannelEvents> = Arc::new(EventSink {
            shared: Arc::downgrade(&self.shared),
        });
        if let Err(error) = self.shared.adapter.connect(events) {
            warn!(target: CLIENT_TARGET, %error, "channel failed to start connecting");
            drop(self.shared.with_lifecycle(Lifecycle::abort_connect));
            return Err(ClientError::Channel(error));
        }
        Ok(pending)
    }

    /// Splits `text` into word tokens.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] unless connected, and
    /// [`ClientError::Channel`] when the request cannot be sent.
    pub fn word_tokenize(&self, text: &str) -> Result<PendingCall<Tokens>, ClientError> {
        self.issue(text)
    }

    /// Tags each token of `text` with its part of speech.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or [`ClientError::Channel`].
    pub fn pos_tag(&self, text: &str) -> Result<PendingCall<TaggedTokens>, ClientError> {
        self.issue(text)
    }

    /// Chunks the named entities of `text`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or [`ClientError::Channel`].
    pub fn named_entity_chunk(&self, text: &str) -> Result<PendingCall<EntityChunks>, ClientError> {
        self.issue(text)
    }

    /// Reduces `text` to its lemma.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or [`ClientError::Channel`].
    pub fn lemmatize(&self, text: &str) -> Result<PendingCall<Lemma>, ClientError> {
        self.issue(text)
    }

    /// Detects the language of `text`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] or [`ClientError::Channel`].
    pub fn detect_language(&self, text: &str) -> Result<PendingCall<DetectedLanguage>, ClientError> {
        self.issue(text)
    }

    /// Feeds an inbound message through the dispatcher.
    ///
    /// Adapters normally deliver messages through [`ChannelEvents`]; this is
    /// the same path with the outcome returned.
    #[must_use]
    pub fn deliver(&self, sender_id: &str, message: &Message) -> DispatchOutcome {
        self.shared.handle_message(sender_id, message)
    }

    /// Registers `observer` to run after every connection loss.
    #[must_use]
    pub fn on_disconnect<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&Disconnection) + Send + Sync + 'static,
    {
        self.shared.observers.add(Arc::new(observer))
    }

    /// Removes an observer. Returns `false` when it was not registered.
    #[must_use]
    pub fn remove_disconnect_observer(&self, id: ObserverId) -> bool {
        self.shared.observers.remove(id)
    }

    /// Closes the channel and fails every outstanding call with
    /// [`ClientError::ConnectionLost`].
    ///
    /// Disconnect observers are not notified. Repeated calls are no-ops.
    #[must_use]
    pub fn dispose(&self) -> DrainReport {
        self.shared.shutdown()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether calls may be issued.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of calls of `kind` awaiting a response.
    #[must_use]
    pub fn pending_count(&self, kind: OperationKind) -> usize {
        self.shared.registry.pending_count(kind)
    }

    fn issue<T>(&self, text: &str) -> Result<PendingCall<T>, ClientError>
    where
        T: Materialize + Send + 'static,
    {
        let kind = T::KIND;
        let state = self.state();
        if state != ConnectionState::Connected {
            debug!(target: CLIENT_TARGET, %kind, %state, "rejecting call while not connected");
            return Err(ClientError::NotConnected);
        }

        let shared = &self.shared;
        let call = shared.registry.register_next::<T>(&shared.allocator)?;
        let id = call.id();

        if let Err(error) = shared.adapter.send(&Message::request(kind, id, text)) {
            shared.registry.cancel(kind, id);
            warn!(target: CLIENT_TARGET, %kind, %id, %error, "failed to send request");
            return Err(ClientError::Channel(error));
        }

        debug!(target: CLIENT_TARGET, %kind, %id, "issued request");
        Ok(call)
    }
}

impl Drop for NlpClient {
    fn drop(&mut self) {
        drop(self.shared.shutdown());
        self.shared.observers.clear();
    }
}

impl fmt::Debug for NlpClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NlpClient")
            .field("state", &self.state())
            .field("dispatcher", &self.shared.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn with_lifecycle<R>(&self, action: impl FnOnce(&mut Lifecycle) -> R) -> R {
        let mut guard = self
            .lifecycle
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        action(&mut guard)
    }

    fn state(&self) -> ConnectionState {
        self.with_lifecycle(|lifecycle| lifecycle.state())
    }

    fn handle_connected(&self) {
        // The registry opens under the lifecycle lock so no caller can observe
        // `Connected` with a closed registry.
        let waiter = self.with_lifecycle(|lifecycle| {
            let waiter = lifecycle.accept();
            if waiter.is_some() {
                self.registry.open();
            }
            waiter
        });
        let Some(waiter) = waiter else {
            debug!(target: CLIENT_TARGET, "ignoring accept signal outside a connect attempt");
            return;
        };

        if let Err(error) = self.adapter.register() {
            warn!(target: CLIENT_TARGET, %error, "channel registration failed");
            self.with_lifecycle(|lifecycle| {
                drop(lifecycle.disconnect());
                self.registry.drain_every_kind(&ClientError::ConnectionLost)
            });
            self.close_channel();
            waiter.complete(Err(ClientError::Channel(error)));
            return;
        }

        info!(target: CLIENT_TARGET, "connected to remote service");
        waiter.complete(Ok(()));
    }

    fn handle_rejected(&self) {
        let Some(waiter) = self.with_lifecycle(Lifecycle::abort_connect) else {
            debug!(target: CLIENT_TARGET, "ignoring reject signal outside a connect attempt");
            return;
        };
        warn!(target: CLIENT_TARGET, "remote service rejected the connection");
        waiter.complete(Err(ClientError::ConnectionRejected));
    }

    fn handle_disconnected(&self) {
        let (transition, drained) = self.with_lifecycle(|lifecycle| {
            let transition = lifecycle.disconnect();
            let drained = self.registry.drain_every_kind(&ClientError::ConnectionLost);
            (transition, drained)
        });

        match transition {
            Disconnect::FromConnected => {
                self.unregister();
                warn!(
                    target: CLIENT_TARGET,
                    drained = drained.total(),
                    "connection to remote service lost"
                );
                self.observers.notify(&Disconnection {
                    error: ClientError::ConnectionLost,
                    drained,
                });
            }
            Disconnect::FromConnecting(waiter) => {
                warn!(target: CLIENT_TARGET, "connection lost during handshake");
                waiter.complete(Err(ClientError::ConnectionLost));
            }
            Disconnect::AlreadyDisconnected => {
                debug!(target: CLIENT_TARGET, "ignoring disconnect signal while disconnected");
            }
        }
    }

    fn handle_message(&self, sender_id: &str, message: &Message) -> DispatchOutcome {
        let state = self.state();
        if state != ConnectionState::Connected {
            warn!(
                target: CLIENT_TARGET,
                sender_id,
                %state,
                "discarding message received while not connected"
            );
            return DispatchOutcome::NotConnected;
        }
        self.dispatcher.dispatch(&self.registry, sender_id, message)
    }

    fn shutdown(&self) -> DrainReport {
        let (transition, drained) = self.with_lifecycle(|lifecycle| {
            let transition = lifecycle.disconnect();
            let drained = self.registry.drain_every_kind(&ClientError::ConnectionLost);
            (transition, drained)
        });

        match transition {
            Disconnect::FromConnected => {
                self.unregister();
                self.close_channel();
            }
            Disconnect::FromConnecting(waiter) => {
                waiter.complete(Err(ClientError::ConnectionLost));
                self.close_channel();
            }
            Disconnect::AlreadyDisconnected => return drained,
        }

        info!(
            target: CLIENT_TARGET,
            drained = drained.total(),
            "client disposed"
        );
        drained
    }

    fn unregister(&self) {
        if let Err(error) = self.adapter.unregister() {
            warn!(target: CLIENT_TARGET, %error, "failed to unregister from delivery");
        }
    }

    fn close_channel(&self) {
        if let Err(error) = self.adapter.disconnect() {
            warn!(target: CLIENT_TARGET, %error, "failed to close channel");
        }
    }
}

impl ChannelEvents for EventSink {
    fn on_connected(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_connected();
        }
    }

    fn on_rejected(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_rejected();
        }
    }

    fn on_disconnected(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_disconnected();
        }
    }

    fn on_message(&self, sender_id: &str, message: Message) {
        if let Some(shared) = self.shared.upgrade() {
            drop(shared.handle_message(sender_id, &message));
        }
    }
}
