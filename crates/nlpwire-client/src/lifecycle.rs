//! Connection state machine.
//!
//! `Disconnected → Connecting → Connected → Disconnected`, re-enterable via a
//! new `connect`. The machine only records transitions and hands back the
//! pending connect waiter; the client performs the side effects after
//! releasing its lock.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::errors::ClientError;

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; the initial state.
    #[default]
    Disconnected,
    /// A connect request is awaiting the service's accept or reject signal.
    Connecting,
    /// Calls may be issued.
    Connected,
}

impl ConnectionState {
    /// Lower-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Future returned by [`crate::NlpClient::connect`].
///
/// Resolves once the service accepts (`Ok`) or refuses
/// ([`ClientError::ConnectionRejected`]) the connection.
#[derive(Debug)]
#[must_use = "the connection outcome is only observable by awaiting the future"]
pub struct PendingConnect {
    receiver: oneshot::Receiver<Result<(), ClientError>>,
}

impl Future for PendingConnect {
    type Output = Result<(), ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(ClientError::ConnectionLost)))
    }
}

/// Completion side of a [`PendingConnect`].
#[derive(Debug)]
pub(crate) struct ConnectWaiter {
    sender: oneshot::Sender<Result<(), ClientError>>,
}

impl ConnectWaiter {
    pub(crate) fn complete(self, outcome: Result<(), ClientError>) {
        // The caller may have dropped the future; nothing else to notify.
        drop(self.sender.send(outcome));
    }
}

/// State held before a disconnect signal was applied.
#[derive(Debug)]
pub(crate) enum Disconnect {
    /// The client was connected; pending calls must be drained.
    FromConnected,
    /// A connect attempt was in flight.
    FromConnecting(ConnectWaiter),
    /// Nothing to tear down.
    AlreadyDisconnected,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: ConnectionState,
    waiter: Option<ConnectWaiter>,
}

impl Lifecycle {
    pub(crate) const fn state(&self) -> ConnectionState {
        self.state
    }

    /// `Disconnected → Connecting`.
    pub(crate) fn begin_connect(&mut self) -> Result<PendingConnect, ClientError> {
        match self.state {
            ConnectionState::Connecting => Err(ClientError::AlreadyConnecting),
            ConnectionState::Connected => Err(ClientError::AlreadyConnected),
            ConnectionState::Disconnected => {
                let (sender, receiver) = oneshot::channel();
                self.state = ConnectionState::Connecting;
                self.waiter = Some(ConnectWaiter { sender });
                Ok(PendingConnect { receiver })
            }
        }
    }

    /// `Connecting → Connected`. Returns the waiter when the transition
    /// happened.
    pub(crate) fn accept(&mut self) -> Option<ConnectWaiter> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        self.state = ConnectionState::Connected;
        self.waiter.take()
    }

    /// `Connecting → Disconnected` after a reject signal or a failed
    /// transport call. Returns the waiter when the transition happened.
    pub(crate) fn abort_connect(&mut self) -> Option<ConnectWaiter> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        self.state = ConnectionState::Disconnected;
        self.waiter.take()
    }

    /// Any state `→ Disconnected`.
    pub(crate) fn disconnect(&mut self) -> Disconnect {
        let previous = std::mem::take(&mut self.state);
        match (previous, self.waiter.take()) {
            (ConnectionState::Connected, _) => Disconnect::FromConnected,
            (ConnectionState::Connecting, Some(waiter)) => Disconnect::FromConnecting(waiter),
            (ConnectionState::Connecting | ConnectionState::Disconnected, _) => {
                Disconnect::AlreadyDisconnected
            }
        }
    }
}
