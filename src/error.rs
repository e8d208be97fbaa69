use thiserror::Error;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a transport, either from a call or through the error observer.
#[derive(Error, Debug)]
pub enum Error {
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("not connected")]
    NotConnected,
}

/// Connection-related errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket: {0}")]
    WebSocket(String),

    /// The server answered the upgrade request with a non-101 status.
    #[error("error connecting to {url}: {status} {reason}")]
    Rejected {
        url: String,
        status: u16,
        reason: String,
    },

    /// Failure below HTTP: DNS, refused connection, TLS.
    #[error("error connecting to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("failed to connect to {url}, giving up after {attempts} attempts")]
    Exhausted { url: String, attempts: usize },

    #[error("connection to {url} aborted by close")]
    Aborted { url: String },

    #[error("invalid upgrade request: {0}")]
    InvalidRequest(String),

    #[error("unsupported {kind} frame ({len} bytes)")]
    UnsupportedFrame { kind: &'static str, len: usize },
}

/// Message (de)serialization errors.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(CodecError::Json(e))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Codec(CodecError::Base64(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_names_url_and_status() {
        let err: Error = ConnectionError::Rejected {
            url: "wss://example.test/ws".into(),
            status: 401,
            reason: "Unauthorized".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "connection: error connecting to wss://example.test/ws: 401 Unauthorized"
        );
    }

    #[test]
    fn exhausted_names_url() {
        let err = ConnectionError::Exhausted {
            url: "wss://example.test/ws".into(),
            attempts: 6,
        };
        assert!(err.to_string().contains("wss://example.test/ws"));
        assert!(err.to_string().contains("giving up"));
    }

    #[test]
    fn json_errors_convert_to_codec() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Codec(CodecError::Json(_))));
    }
}
