//! Single-fulfillment rendezvous between the session bootstrap and the
//! reconciliation coordinator.
//!
//! The bootstrap (OAuth callback listener, cached credential loader, ...) runs
//! as its own task and delivers exactly one [`SessionHandle`]. The coordinator
//! suspends in [`SessionReceiver::await_session`] until that happens.
//!
//! ```
//! use core_auth::{SessionHandle, SessionHandoff};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (sender, receiver) = SessionHandoff::channel();
//!
//! tokio::spawn(async move {
//!     sender.deliver(SessionHandle::new("token")).ok();
//! });
//!
//! let handle = receiver.await_session().await.unwrap();
//! assert_eq!(handle.access_token(), "token");
//! # }
//! ```

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::types::SessionHandle;

/// Factory for the two ends of a session handoff.
pub struct SessionHandoff;

impl SessionHandoff {
    pub fn channel() -> (SessionSender, SessionReceiver) {
        let (tx, rx) = oneshot::channel();
        (SessionSender { tx }, SessionReceiver { rx })
    }
}

/// Bootstrap side. `deliver` consumes the sender, so a session can be
/// handed over at most once.
#[derive(Debug)]
pub struct SessionSender {
    tx: oneshot::Sender<SessionHandle>,
}

impl SessionSender {
    /// Hand the session to the coordinator.
    ///
    /// Fails with [`AuthError::CoordinatorGone`] if the receiver was dropped.
    pub fn deliver(self, handle: SessionHandle) -> Result<()> {
        debug!(session = ?handle, "Delivering session");
        self.tx.send(handle).map_err(|_| AuthError::CoordinatorGone)
    }

    /// Whether the coordinator stopped waiting
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Coordinator side.
#[derive(Debug)]
pub struct SessionReceiver {
    rx: oneshot::Receiver<SessionHandle>,
}

impl SessionReceiver {
    /// Suspend until the bootstrap delivers a session.
    ///
    /// Fails with [`AuthError::BootstrapAbandoned`] if the sender is dropped
    /// without delivering.
    pub async fn await_session(self) -> Result<SessionHandle> {
        self.rx.await.map_err(|_| AuthError::BootstrapAbandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_delivery_after_wait_starts() {
        let (sender, receiver) = SessionHandoff::channel();

        let waiter = tokio::spawn(async move { receiver.await_session().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        sender.deliver(SessionHandle::new("late")).unwrap();

        let handle = waiter.await.unwrap().unwrap();
        assert_eq!(handle.access_token(), "late");
    }

    #[tokio::test]
    async fn test_delivery_before_wait_starts() {
        let (sender, receiver) = SessionHandoff::channel();
        sender.deliver(SessionHandle::new("early")).unwrap();

        let handle = receiver.await_session().await.unwrap();
        assert_eq!(handle.access_token(), "early");
    }

    #[tokio::test]
    async fn test_dropped_sender_abandons() {
        let (sender, receiver) = SessionHandoff::channel();
        drop(sender);

        let result = receiver.await_session().await;
        assert!(matches!(result, Err(AuthError::BootstrapAbandoned)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_rejects_delivery() {
        let (sender, receiver) = SessionHandoff::channel();
        drop(receiver);

        assert!(sender.is_closed());
        let result = sender.deliver(SessionHandle::new("nobody"));
        assert!(matches!(result, Err(AuthError::CoordinatorGone)));
    }
}
