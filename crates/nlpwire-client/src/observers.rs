//! Disconnect observer list.
//!
//! The list is explicit per-client state guarded by one mutex. Observers are
//! cloned out of the lock before being invoked, so an observer may register
//! or remove observers without deadlocking.

use std::sync::{Arc, Mutex};

use crate::errors::ClientError;
use crate::registry::DrainReport;

/// Notification delivered when the channel goes down.
#[derive(Debug, Clone)]
pub struct Disconnection {
    /// Error delivered to every drained call; always
    /// [`ClientError::ConnectionLost`].
    pub error: ClientError,
    /// Calls that were failed by the drain.
    pub drained: DrainReport,
}

/// Handle identifying a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&Disconnection) + Send + Sync>;

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<(ObserverId, Observer)>,
}

#[derive(Default)]
pub(crate) struct DisconnectObservers {
    list: Mutex<ObserverList>,
}

impl DisconnectObservers {
    pub(crate) fn add(&self, observer: Observer) -> ObserverId {
        self.with_list(|list| {
            let id = ObserverId(list.next_id);
            list.next_id += 1;
            list.entries.push((id, observer));
            id
        })
    }

    pub(crate) fn remove(&self, id: ObserverId) -> bool {
        self.with_list(|list| {
            let before = list.entries.len();
            list.entries.retain(|(entry_id, _)| *entry_id != id);
            list.entries.len() != before
        })
    }

    pub(crate) fn notify(&self, event: &Disconnection) {
        let snapshot: Vec<Observer> = self.with_list(|list| {
            list.entries
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect()
        });
        for observer in snapshot {
            observer(event);
        }
    }

    pub(crate) fn clear(&self) {
        self.with_list(|list| list.entries.clear());
    }

    fn with_list<R>(&self, action: impl FnOnce(&mut ObserverList) -> R) -> R {
        let mut guard = self
            .list
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        action(&mut guard)
    }
}
