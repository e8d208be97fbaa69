//! One upgrade handshake try.

use crate::error::ConnectionError;
use crate::Result;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, USER_AGENT};
use tokio_tungstenite::tungstenite::http::HeaderValue;

use super::SocketConfig;

/// A single handshake try. A fresh one (index 0) starts every `connect()`,
/// so earlier sessions never eat into the retry budget.
#[derive(Debug)]
pub(crate) struct ConnectionAttempt<'a> {
    config: &'a SocketConfig,
    index: usize,
}

impl<'a> ConnectionAttempt<'a> {
    pub(crate) fn first(config: &'a SocketConfig) -> Self {
        Self { config, index: 0 }
    }

    pub(crate) fn next(self) -> Self {
        Self {
            config: self.config,
            index: self.index + 1,
        }
    }

    /// Zero-based attempt index, used to look up the retry delay.
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Build the upgrade request. Identity is read now, not cached.
    pub(crate) fn request(&self) -> Result<Request> {
        let mut request = self
            .config
            .url()
            .into_client_request()
            .map_err(|e| ConnectionError::InvalidRequest(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.config.token()))?,
        );
        headers.insert(
            USER_AGENT,
            header_value(&self.config.identity().user_agent())?,
        );
        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    Ok(HeaderValue::from_str(value)
        .map_err(|e| ConnectionError::InvalidRequest(e.to_string()))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{BuildInfo, ClientIdentity};

    fn config() -> SocketConfig {
        SocketConfig::new("tok")
            .with_url("ws://127.0.0.1:9/ws")
            .with_identity(ClientIdentity::new("sim-cli", || BuildInfo {
                version: "1.0.0".into(),
                build_id: "deadbeef".into(),
            }))
    }

    #[test]
    fn request_carries_credentials_and_identity() {
        let config = config();
        let request = ConnectionAttempt::first(&config).request().unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
        assert_eq!(request.headers()[USER_AGENT], "sim-cli/1.0.0 (deadbeef)");
        assert_eq!(request.uri(), "ws://127.0.0.1:9/ws");
    }

    #[test]
    fn attempts_count_up_from_zero() {
        let config = config();
        let attempt = ConnectionAttempt::first(&config);
        assert_eq!(attempt.index(), 0);
        assert_eq!(attempt.next().next().index(), 2);
    }

    #[test]
    fn bad_url_is_invalid_request() {
        let config = config().with_url("not a url");
        let err = ConnectionAttempt::first(&config).request().unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Connection(ConnectionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn control_characters_in_token_are_rejected() {
        let config = config();
        let config = SocketConfig::new("bad\ntoken")
            .with_url(config.url())
            .with_identity(config.identity().clone());
        assert!(ConnectionAttempt::first(&config).request().is_err());
    }
}
