//! Transport abstraction for the message layer.
//!
//! A transport moves [`Message`]s between this process and the simulation
//! service. Incoming traffic and failures are delivered to an [`Observers`]
//! set fixed when the transport is built, so handlers cannot be swapped
//! while a delivery is in flight.

use crate::{Error, Message, Result};
use async_trait::async_trait;

/// Async trait for a message transport (WebSocket, in-process channel).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Make the channel usable. Resolves once messages can be sent.
    async fn connect(&self) -> Result<()>;

    /// Queue one message for delivery. Fails only when the transport is not
    /// open or the message cannot be encoded; later delivery failures go to
    /// the observers.
    async fn send(&self, message: Message) -> Result<()>;

    /// Shut the channel down. Never reported to the close observer.
    async fn close(&self) -> Result<()>;
}

type MessageHandler = Box<dyn Fn(Message) + Send + Sync>;
type CloseHandler = Box<dyn Fn(u16, Option<String>) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(Error) + Send + Sync>;

/// Handlers a transport reports to.
///
/// The message handler defaults to a no-op; without a close or error handler
/// those events are logged instead.
pub struct Observers {
    on_message: MessageHandler,
    on_close: Option<CloseHandler>,
    on_error: Option<ErrorHandler>,
}

impl Observers {
    pub fn new() -> Self {
        Self {
            on_message: Box::new(|_| {}),
            on_close: None,
            on_error: None,
        }
    }

    /// Called once per received message, in arrival order.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.on_message = Box::new(f);
        self
    }

    /// Called once when the channel terminates without a local `close()`,
    /// with the close code and optional reason.
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(u16, Option<String>) + Send + Sync + 'static,
    {
        self.on_close = Some(Box::new(f));
        self
    }

    /// Called for failures that do not end the channel, such as unsupported frames.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn message(&self, message: Message) {
        (self.on_message)(message);
    }

    pub(crate) fn closed(&self, code: u16, reason: Option<String>) {
        match &self.on_close {
            Some(f) => f(code, reason),
            None => tracing::warn!(code, reason = reason.as_deref(), "channel closed"),
        }
    }

    pub(crate) fn error(&self, error: Error) {
        match &self.on_error {
            Some(f) => f(error),
            None => tracing::error!(%error, "transport error"),
        }
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
