//! Classification of failed upgrade handshakes.
//!
//! Only a few HTTP statuses mean "the origin or a proxy in front of it was
//! briefly overloaded"; everything else (bad token, wrong path, DNS or TLS
//! failure) will not get better by waiting.

use crate::error::ConnectionError;

/// Statuses that warrant another attempt: 408 Request Timeout,
/// 503 Service Unavailable and the Cloudflare origin timeout 524.
pub const RETRYABLE_STATUSES: [u16; 3] = [408, 503, 524];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeVerdict {
    Retryable,
    Fatal,
}

/// Classify an upgrade rejection by HTTP status.
pub fn classify_status(status: u16) -> HandshakeVerdict {
    if RETRYABLE_STATUSES.contains(&status) {
        HandshakeVerdict::Retryable
    } else {
        HandshakeVerdict::Fatal
    }
}

/// Why one connection attempt did not produce an open socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// The server answered the upgrade with an HTTP status other than 101.
    Rejected { status: u16, reason: String },
    /// No HTTP answer at all.
    Unreachable(String),
}

impl HandshakeFailure {
    pub fn verdict(&self) -> HandshakeVerdict {
        match self {
            Self::Rejected { status, .. } => classify_status(*status),
            Self::Unreachable(_) => HandshakeVerdict::Fatal,
        }
    }

    /// Error reported to the `connect()` caller for this failure.
    pub fn into_error(self, url: &str) -> ConnectionError {
        match self {
            Self::Rejected { status, reason } => ConnectionError::Rejected {
                url: url.to_string(),
                status,
                reason,
            },
            Self::Unreachable(reason) => ConnectionError::Unreachable {
                url: url.to_string(),
                reason,
            },
        }
    }
}

#[cfg(feature = "full")]
impl From<tokio_tungstenite::tungstenite::Error> for HandshakeFailure {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Http(response) => {
                let status = response.status();
                Self::Rejected {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                }
            }
            other => Self::Unreachable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        for status in [408, 503, 524] {
            assert_eq!(classify_status(status), HandshakeVerdict::Retryable);
        }
    }

    #[test]
    fn other_statuses_are_fatal() {
        for status in [400, 401, 403, 404, 429, 500, 502, 504] {
            assert_eq!(classify_status(status), HandshakeVerdict::Fatal, "{status}");
        }
    }

    #[test]
    fn unreachable_is_fatal() {
        let failure = HandshakeFailure::Unreachable("connection refused".into());
        assert_eq!(failure.verdict(), HandshakeVerdict::Fatal);
        let err = failure.into_error("wss://example.test");
        assert_eq!(
            err.to_string(),
            "error connecting to wss://example.test: connection refused"
        );
    }

    #[cfg(feature = "full")]
    #[test]
    fn http_error_maps_to_rejection() {
        use tokio_tungstenite::tungstenite::http::Response;
        use tokio_tungstenite::tungstenite::Error as WsError;

        let response = Response::builder().status(503).body(None).unwrap();
        let failure = HandshakeFailure::from(WsError::Http(response));
        assert_eq!(
            failure,
            HandshakeFailure::Rejected {
                status: 503,
                reason: "Service Unavailable".into()
            }
        );
        assert_eq!(failure.verdict(), HandshakeVerdict::Retryable);
    }
}
