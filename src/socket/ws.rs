//! Resilient WebSocket transport (requires `full` feature).

use crate::error::{ConnectionError, Error};
use crate::handshake::{HandshakeFailure, HandshakeVerdict};
use crate::transport::{Observers, Transport};
use crate::{Message, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;

use super::attempt::ConnectionAttempt;
use super::framed::{FramedRecv, FramedSend, Inbound, WsStream};
use super::{ConnectionState, SocketConfig, StateCell};

/// Marks the close of one particular socket as locally initiated.
///
/// Each open socket gets its own guard, so a close we caused on one socket
/// can never hide an unexpected close on another.
#[derive(Debug)]
struct CloseGuard {
    attempt: usize,
    expected: AtomicBool,
}

impl CloseGuard {
    fn new(attempt: usize) -> Self {
        Self {
            attempt,
            expected: AtomicBool::new(false),
        }
    }

    fn expect(&self) {
        self.expected.store(true, Ordering::SeqCst);
    }

    /// Whether the close was expected. Clears the mark.
    fn take(&self) -> bool {
        self.expected.swap(false, Ordering::SeqCst)
    }
}

/// The socket currently owned by the transport.
///
/// Writes go through `outbox` to the writer task, so nothing holds the
/// transport's lock while the socket is busy.
struct Link {
    outbox: mpsc::UnboundedSender<String>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    guard: Arc<CloseGuard>,
}

impl Link {
    /// Drop the socket without a close handshake and without reporting it.
    fn terminate(self) {
        self.guard.expect();
        self.writer.abort();
        self.reader.abort();
    }
}

/// WebSocket transport that retries transient upgrade rejections.
///
/// `connect()` keeps trying while the server answers 408, 503 or 524 and the
/// [`RetrySchedule`](crate::RetrySchedule) still has a delay for the attempt;
/// any other failure ends it. Once open, every text frame is decoded into a
/// [`Message`] and handed to the observers in arrival order. A session that
/// drops after opening is reported through the close observer and is not
/// reconnected automatically.
pub struct SocketTransport {
    config: SocketConfig,
    observers: Arc<Observers>,
    state: Arc<StateCell>,
    link: Mutex<Option<Link>>,
    abort: watch::Sender<bool>,
}

impl SocketTransport {
    pub fn new(config: SocketConfig, observers: Observers) -> Self {
        let (abort, _) = watch::channel(false);
        Self {
            config,
            observers: Arc::new(observers),
            state: Arc::new(StateCell::new(ConnectionState::Idle)),
            link: Mutex::new(None),
            abort,
        }
    }

    /// Transport for `token` against the endpoint from the environment.
    pub fn from_env(token: impl Into<String>, observers: Observers) -> Self {
        Self::new(SocketConfig::new(token), observers)
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.get() == ConnectionState::Open
    }

    fn aborted(&self) -> Error {
        self.state.set(ConnectionState::Closed);
        ConnectionError::Aborted {
            url: self.config.url().to_string(),
        }
        .into()
    }

    fn fail(&self, err: impl Into<Error>) -> Error {
        self.state.set(ConnectionState::Closed);
        err.into()
    }

    /// Install the socket and start delivering frames.
    async fn open(&self, stream: WsStream, attempt: usize) -> Result<()> {
        let mut link = self.link.lock().await;
        // close() raises the abort flag before taking the lock, so checking it
        // here under the lock means a racing close() either sees this link or
        // makes us drop it.
        if *self.abort.borrow() {
            return Err(self.aborted());
        }
        let (sink, stream) = stream.split();
        let (outbox, queued) = mpsc::unbounded_channel();
        let guard = Arc::new(CloseGuard::new(attempt));
        self.state.set(ConnectionState::Open);
        let writer = tokio::spawn(write_loop(
            FramedSend::new(sink),
            queued,
            Arc::clone(&self.observers),
        ));
        let reader = tokio::spawn(read_loop(
            FramedRecv::new(stream),
            Arc::clone(&self.observers),
            Arc::clone(&self.state),
            Arc::clone(&guard),
            self.config.close_timeout(),
        ));
        let stale = link.replace(Link {
            outbox,
            writer,
            reader,
            guard,
        });
        if let Some(stale) = stale {
            stale.terminate();
        }
        tracing::debug!(url = %self.config.url(), attempt, "connection open");
        Ok(())
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn connect(&self) -> Result<()> {
        if self.is_open() {
            tracing::debug!(url = %self.config.url(), "already connected");
            return Ok(());
        }
        install_crypto_provider();
        self.abort.send_replace(false);
        let mut abort = self.abort.subscribe();
        let url = self.config.url();
        let retry = self.config.retry();

        let mut attempt = ConnectionAttempt::first(&self.config);
        loop {
            self.state.set(ConnectionState::Connecting);
            let request = attempt.request().map_err(|e| self.fail(e))?;
            let outcome = tokio::select! {
                outcome = connect_async(request) => outcome,
                _ = aborted(&mut abort) => return Err(self.aborted()),
            };
            let failure = match outcome {
                Ok((stream, _response)) => return self.open(stream, attempt.index()).await,
                Err(e) => HandshakeFailure::from(e),
            };

            if failure.verdict() == HandshakeVerdict::Fatal {
                return Err(self.fail(failure.into_error(url)));
            }
            let Some(delay) = retry.delay(attempt.index()) else {
                return Err(self.fail(ConnectionError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt.index() + 1,
                }));
            };
            // The rejected socket was never handed observers, so dropping it
            // cannot surface as a close event.
            if let HandshakeFailure::Rejected { status, reason } = &failure {
                tracing::warn!(url, status, reason = %reason, "connection failed");
            }
            tracing::info!(?delay, attempt = attempt.index() + 1, "will retry");

            self.state.set(ConnectionState::RetryWait);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = aborted(&mut abort) => return Err(self.aborted()),
            }
            tracing::info!(url, "retrying connection");
            attempt = attempt.next();
        }
    }

    async fn send(&self, message: Message) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        let text = message.encode()?;
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(Error::NotConnected)?;
        if link.outbox.send(text).is_err() {
            // The writer already reported why it stopped.
            tracing::debug!("socket writer stopped, message dropped");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.abort.send_replace(true);
        let Some(link) = self.link.lock().await.take() else {
            if self.state.get() != ConnectionState::Idle {
                self.state.set(ConnectionState::Closed);
            }
            return Ok(());
        };

        link.guard.expect();
        let was_open = self.state.get() == ConnectionState::Open;
        self.state.set(ConnectionState::Closing);
        let Link {
            outbox,
            mut writer,
            mut reader,
            ..
        } = link;
        // An empty outbox tells the writer to flush what is queued and send
        // the close frame.
        drop(outbox);
        if was_open && !reader.is_finished() {
            let handshake = async {
                let _ = (&mut writer).await;
                let _ = (&mut reader).await;
            };
            if tokio::time::timeout(self.config.close_timeout(), handshake)
                .await
                .is_err()
            {
                tracing::debug!("no close reply from peer, terminating");
            }
        }
        writer.abort();
        reader.abort();
        self.state.set(ConnectionState::Closed);
        Ok(())
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.terminate();
        }
    }
}

/// Resolves once `close()` raises the abort flag.
async fn aborted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn write_loop(
    mut send: FramedSend,
    mut queued: mpsc::UnboundedReceiver<String>,
    observers: Arc<Observers>,
) {
    while let Some(text) = queued.recv().await {
        if let Err(e) = send.send_text(text).await {
            observers.error(e);
            return;
        }
    }
    if let Err(e) = send.close().await {
        tracing::debug!(error = %e, "close handshake failed");
    }
}

async fn read_loop(
    mut recv: FramedRecv,
    observers: Arc<Observers>,
    state: Arc<StateCell>,
    guard: Arc<CloseGuard>,
    close_timeout: Duration,
) {
    let (code, reason) = loop {
        match recv.next_inbound().await {
            Inbound::Message(message) => observers.message(message),
            Inbound::Rejected(err) => observers.error(err),
            Inbound::Closed { code, reason } => break (code, reason),
        }
    };
    if guard.take() {
        tracing::debug!(attempt = guard.attempt, code, "locally closed socket finished");
        return;
    }
    state.set(ConnectionState::Closed);
    tracing::warn!(code, reason = reason.as_deref(), "connection closed unexpectedly");
    observers.closed(code, reason);
    recv.finish(close_timeout).await;
}

fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // Err means the application installed its own provider first.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
