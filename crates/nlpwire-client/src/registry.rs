//! Pending request registry.
//!
//! Every in-flight call owns exactly one entry keyed by `(kind, id)`. Entries
//! are inserted by the issuing path, removed and completed by the dispatch
//! path, and drained by teardown. All three mutate the map under a single
//! mutex; completion handles are always fired after the lock is released.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::allocator::RequestIdAllocator;
use crate::errors::ClientError;
use crate::kind::{OperationKind, RequestId};
use crate::message::Message;
use crate::results::Materialize;

/// Log target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = "nlpwire_client::registry";

type Completer = Box<dyn FnOnce(Result<&Message, ClientError>) + Send>;

/// Future returned for every issued call.
///
/// Resolves exactly once: with the materialized result when the matching
/// response arrives, or with [`ClientError::ConnectionLost`] when the
/// connection is torn down first.
#[derive(Debug)]
#[must_use = "the call result is only observable by awaiting the future"]
pub struct PendingCall<T> {
    kind: OperationKind,
    id: RequestId,
    receiver: oneshot::Receiver<Result<T, ClientError>>,
}

impl<T> PendingCall<T> {
    /// Kind of the call.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Id assigned to the call.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }
}

impl<T> Future for PendingCall<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the registry went away without completing us.
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(ClientError::ConnectionLost)))
    }
}

/// Ids failed by a drain, grouped by kind in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    failed: BTreeMap<OperationKind, Vec<RequestId>>,
}

impl DrainReport {
    /// Ids of `kind` that were failed, in ascending order.
    #[must_use]
    pub fn ids(&self, kind: OperationKind) -> &[RequestId] {
        self.failed
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of failed entries across every kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.failed.values().map(Vec::len).sum()
    }

    /// Whether nothing was pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates over kinds that had failed entries.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, &[RequestId])> {
        self.failed.iter().map(|(kind, ids)| (*kind, ids.as_slice()))
    }
}

#[derive(Default)]
struct RegistryState {
    open: bool,
    pending: BTreeMap<OperationKind, BTreeMap<RequestId, Completer>>,
}

impl RegistryState {
    fn take_entry(&mut self, kind: OperationKind, id: RequestId) -> Option<Completer> {
        let entries = self.pending.get_mut(&kind)?;
        let completer = entries.remove(&id);
        if entries.is_empty() {
            self.pending.remove(&kind);
        }
        completer
    }

    fn take_kind(&mut self, kind: OperationKind) -> Vec<(RequestId, Completer)> {
        self.pending
            .remove(&kind)
            .map(|entries| entries.into_iter().collect())
            .unwrap_or_default()
    }
}

/// Mapping of `(kind, id)` to the caller awaiting the response.
///
/// A new registry starts closed: [`Self::register`] fails with
/// [`ClientError::NotConnected`] until [`Self::open`] is called.
#[derive(Default)]
pub struct PendingRegistry {
    state: Mutex<RegistryState>,
}

impl PendingRegistry {
    /// Creates a closed, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts registrations until the next [`Self::drain_every_kind`].
    pub fn open(&self) {
        self.with_state(|state| state.open = true);
    }

    /// Whether registrations are currently accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.with_state(|state| state.open)
    }

    /// Inserts a pending entry for `(T::KIND, id)`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] while the registry is closed, and
    /// [`ClientError::DuplicateRequest`] when the pair is already pending.
    pub fn register<T>(&self, id: RequestId) -> Result<PendingCall<T>, ClientError>
    where
        T: Materialize + Send + 'static,
    {
        self.register_with(|| id)
    }

    /// Registers a call under the next id `allocator` hands out for its kind.
    ///
    /// The id is drawn under the registry lock after the open check, so a
    /// closed registry never consumes one.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] while the registry is closed.
    pub(crate) fn register_next<T>(
        &self,
        allocator: &RequestIdAllocator,
    ) -> Result<PendingCall<T>, ClientError>
    where
        T: Materialize + Send + 'static,
    {
        self.register_with(|| allocator.next(T::KIND))
    }

    fn register_with<T>(
        &self,
        allocate: impl FnOnce() -> RequestId,
    ) -> Result<PendingCall<T>, ClientError>
    where
        T: Materialize + Send + 'static,
    {
        let kind = T::KIND;
        let (sender, receiver) = oneshot::channel();

        let id = self.with_state(|state| {
            if !state.open {
                return Err(ClientError::NotConnected);
            }
            let id = allocate();
            let entries = state.pending.entry(kind).or_default();
            if entries.contains_key(&id) {
                return Err(ClientError::duplicate(kind, id));
            }
            entries.insert(id, completer::<T>(id, sender));
            Ok(id)
        })?;

        debug!(target: REGISTRY_TARGET, %kind, %id, "registered pending request");
        Ok(PendingCall { kind, id, receiver })
    }

    /// Completes the entry for `(kind, id)` with `message`.
    ///
    /// Returns `false` when nothing was pending for the pair, which covers
    /// late, duplicate and already-drained responses.
    #[must_use]
    pub fn resolve(&self, kind: OperationKind, id: RequestId, message: &Message) -> bool {
        let Some(complete) = self.with_state(|state| state.take_entry(kind, id)) else {
            return false;
        };
        complete(Ok(message));
        debug!(target: REGISTRY_TARGET, %kind, %id, "resolved pending request");
        true
    }

    /// Removes the entry for `(kind, id)` without completing it.
    ///
    /// The caller's future then resolves with
    /// [`ClientError::ConnectionLost`] once dropped by the registry.
    pub(crate) fn cancel(&self, kind: OperationKind, id: RequestId) -> bool {
        self.with_state(|state| state.take_entry(kind, id))
            .is_some()
    }

    /// Fails every pending entry of `kind` with `error`.
    ///
    /// Returns the failed ids in ascending order.
    #[must_use]
    pub fn drain_all(&self, kind: OperationKind, error: &ClientError) -> Vec<RequestId> {
        let drained = self.with_state(|state| state.take_kind(kind));
        fail_entries(drained, error)
    }

    /// Closes the registry and fails every entry of every kind with `error`.
    ///
    /// Closing and removal happen under one lock acquisition.
    #[must_use]
    pub fn drain_every_kind(&self, error: &ClientError) -> DrainReport {
        let drained: Vec<_> = self.with_state(|state| {
            state.open = false;
            OperationKind::ALL
                .into_iter()
                .map(|kind| (kind, state.take_kind(kind)))
                .collect()
        });

        let mut report = DrainReport::default();
        for (kind, entries) in drained {
            let ids = fail_entries(entries, error);
            if !ids.is_empty() {
                report.failed.insert(kind, ids);
            }
        }

        if !report.is_empty() {
            info!(
                target: REGISTRY_TARGET,
                failed = report.total(),
                error = %error,
                "drained pending requests"
            );
        }
        report
    }

    /// Number of pending entries for `kind`.
    #[must_use]
    pub fn pending_count(&self, kind: OperationKind) -> usize {
        self.with_state(|state| state.pending.get(&kind).map_or(0, BTreeMap::len))
    }

    /// Whether no entry is pending for any kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with_state(|state| state.pending.values().all(BTreeMap::is_empty))
    }

    fn with_state<R>(&self, action: impl FnOnce(&mut RegistryState) -> R) -> R {
        // Completers never run under the lock, so a poisoned map is still
        // consistent.
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        action(&mut guard)
    }
}

fn completer<T>(id: RequestId, sender: oneshot::Sender<Result<T, ClientError>>) -> Completer
where
    T: Materialize + Send + 'static,
{
    let kind = T::KIND;
    Box::new(move |outcome: Result<&Message, ClientError>| {
        if sender.send(outcome.map(T::materialize)).is_err() {
            debug!(
                target: REGISTRY_TARGET,
                %kind,
                %id,
                "caller dropped its future before completion"
            );
        }
    })
}

fn fail_entries(entries: Vec<(RequestId, Completer)>, error: &ClientError) -> Vec<RequestId> {
    entries
        .into_iter()
        .map(|(id, complete)| {
            complete(Err(error.clone()));
            id
        })
        .collect()
}
