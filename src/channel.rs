//! In-process transport for a client and service running in the same process.
//!
//! Two linked ends hand messages straight to each other's message observer.
//! There is no handshake, no serialization and no retry surface.

use crate::transport::{Observers, Transport};
use crate::{Error, Message, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct End {
    observers: Observers,
    closed: AtomicBool,
}

struct Link {
    ends: [End; 2],
}

/// One end of an in-process channel.
pub struct ChannelTransport {
    link: Arc<Link>,
    side: usize,
}

impl ChannelTransport {
    /// Create two connected ends. `a` observes what the second end sends and
    /// `b` observes what the first end sends.
    pub fn pair(a: Observers, b: Observers) -> (Self, Self) {
        let link = Arc::new(Link {
            ends: [
                End {
                    observers: a,
                    closed: AtomicBool::new(false),
                },
                End {
                    observers: b,
                    closed: AtomicBool::new(false),
                },
            ],
        });
        (
            Self {
                link: Arc::clone(&link),
                side: 0,
            },
            Self { link, side: 1 },
        )
    }

    fn local(&self) -> &End {
        &self.link.ends[self.side]
    }

    fn peer(&self) -> &End {
        &self.link.ends[1 - self.side]
    }

    pub fn is_closed(&self) -> bool {
        self.local().closed.load(Ordering::SeqCst)
    }

    /// Synchronous form of [`Transport::send`].
    pub fn post(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(Error::NotConnected);
        }
        let peer = self.peer();
        if peer.closed.load(Ordering::SeqCst) {
            tracing::debug!(kind = message.kind(), "peer closed, dropping message");
            return Ok(());
        }
        peer.observers.message(message);
        Ok(())
    }

    /// Synchronous form of [`Transport::close`]. Idempotent.
    pub fn shutdown(&self) {
        self.local().closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<()> {
        self.post(message)
    }

    async fn close(&self) -> Result<()> {
        self.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    fn recorder() -> (Observers, Arc<Mutex<Vec<Message>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observers = Observers::new().on_message(move |m| sink.lock().unwrap().push(m));
        (observers, seen)
    }

    fn cmd(n: u32) -> Message {
        Message::command("serial:write", json!({ "n": n }), Some(n.to_string()))
    }

    #[tokio::test]
    async fn delivers_to_peer_in_order() {
        let (a_obs, a_seen) = recorder();
        let (b_obs, b_seen) = recorder();
        let (a, b) = ChannelTransport::pair(a_obs, b_obs);
        assert_ok!(a.connect().await);
        assert_ok!(b.connect().await);

        for n in 0..5 {
            assert_ok!(a.send(cmd(n)).await);
        }
        assert_ok!(b.send(cmd(99)).await);

        assert_eq!(*b_seen.lock().unwrap(), (0..5).map(cmd).collect::<Vec<_>>());
        assert_eq!(*a_seen.lock().unwrap(), vec![cmd(99)]);
    }

    #[tokio::test]
    async fn close_is_silent_and_idempotent() {
        let closes = Arc::new(Mutex::new(0));
        let c = Arc::clone(&closes);
        let (a, _b) = ChannelTransport::pair(
            Observers::new().on_close(move |_, _| *c.lock().unwrap() += 1),
            Observers::new(),
        );
        assert_ok!(a.close().await);
        assert_ok!(a.close().await);
        assert!(a.is_closed());
        assert_eq!(*closes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (a, _b) = ChannelTransport::pair(Observers::new(), Observers::new());
        a.shutdown();
        let err = assert_err!(a.send(cmd(1)).await);
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn send_to_closed_peer_is_dropped() {
        let (b_obs, b_seen) = recorder();
        let (a, b) = ChannelTransport::pair(Observers::new(), b_obs);
        b.shutdown();
        assert_ok!(a.send(cmd(1)).await);
        assert!(b_seen.lock().unwrap().is_empty());
    }
}
