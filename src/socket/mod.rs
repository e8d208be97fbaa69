//! WebSocket transport to the simulation service.
//!
//! Connects with an authenticated upgrade request, retries transient
//! rejections on a fixed schedule and carries one JSON message per text
//! frame. The network pieces require the `full` feature.

#[cfg(feature = "full")]
mod attempt;
#[cfg(feature = "full")]
mod framed;
#[cfg(feature = "full")]
mod ws;

#[cfg(feature = "full")]
pub use ws::SocketTransport;

use crate::retry::RetrySchedule;
use crate::version::ClientIdentity;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Service endpoint used when [`SERVER_URL_ENV`] is not set.
pub const DEFAULT_SERVER_URL: &str = "wss://wokwi.com/api/ws/beta";

/// Environment variable overriding the service endpoint.
pub const SERVER_URL_ENV: &str = "SIMLINK_SERVER";

/// Close code reported when the peer closed without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the socket was lost without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// How long `close()` waits for the peer's close reply by default.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// The endpoint from [`SERVER_URL_ENV`], or [`DEFAULT_SERVER_URL`].
///
/// An empty value counts as unset, so a blank variable falls back to the
/// default endpoint instead of producing an unusable URL.
pub fn server_url_from_env() -> String {
    std::env::var(SERVER_URL_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Settings for a [`SocketTransport`](crate::socket::SocketTransport).
#[derive(Clone)]
pub struct SocketConfig {
    url: String,
    token: String,
    identity: ClientIdentity,
    retry: RetrySchedule,
    close_timeout: Duration,
}

impl SocketConfig {
    /// Config for `token` against the endpoint from the environment.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: server_url_from_env(),
            token: token.into(),
            identity: ClientIdentity::default(),
            retry: RetrySchedule::default(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_retry(mut self, retry: RetrySchedule) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn retry(&self) -> &RetrySchedule {
        &self.retry
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

impl std::fmt::Debug for SocketConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .field("retry", &self.retry)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

/// Lifecycle of a socket transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Built, `connect()` not called yet.
    Idle,
    /// Upgrade handshake in flight.
    Connecting,
    /// Waiting out a retry delay before the next handshake.
    RetryWait,
    Open,
    /// Local `close()` in progress.
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::RetryWait,
            3 => Self::Open,
            4 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Lock-free cell shared between the transport and its reader task.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_hides_token() {
        let config = SocketConfig::new("s3cret").with_url("wss://example.test/ws");
        let debug = format!("{config:?}");
        assert!(debug.contains("wss://example.test/ws"));
        assert!(!debug.contains("s3cret"));
        assert_eq!(config.token(), "s3cret");
    }

    #[test]
    fn config_defaults() {
        let config = SocketConfig::new("t").with_url("ws://x");
        assert_eq!(config.retry(), &RetrySchedule::default());
        assert_eq!(config.close_timeout(), DEFAULT_CLOSE_TIMEOUT);
        assert_eq!(config.identity().name(), crate::version::DEFAULT_CLIENT_NAME);
    }

    #[test]
    fn server_url_honours_env_override() {
        std::env::set_var(SERVER_URL_ENV, "wss://staging.example.test/ws");
        assert_eq!(server_url_from_env(), "wss://staging.example.test/ws");
        std::env::set_var(SERVER_URL_ENV, "");
        assert_eq!(server_url_from_env(), DEFAULT_SERVER_URL);
        std::env::remove_var(SERVER_URL_ENV);
        assert_eq!(server_url_from_env(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn state_cell_roundtrips_every_state() {
        let cell = StateCell::new(ConnectionState::Idle);
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::RetryWait,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
