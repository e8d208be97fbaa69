//! JSON text framing over the WebSocket halves.
//! Each text frame carries exactly one [`Message`]; anything else is reported, not delivered.

use crate::error::{ConnectionError, Error};
use crate::{Message, Result};
use futures::sink::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message as Frame;

use super::{CLOSE_ABNORMAL, CLOSE_NO_STATUS};

pub(crate) type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Send half: writes one text frame per message.
pub(crate) struct FramedSend {
    writer: SplitSink<WsStream, Frame>,
}

impl FramedSend {
    pub(crate) fn new(writer: SplitSink<WsStream, Frame>) -> Self {
        Self { writer }
    }

    pub(crate) async fn send_text(&mut self, text: String) -> Result<()> {
        self.writer
            .send(Frame::Text(text))
            .await
            .map_err(|e| Error::Connection(ConnectionError::WebSocket(e.to_string())))
    }

    /// Start the close handshake: send a close frame and flush.
    pub(crate) async fn close(&mut self) -> Result<()> {
        self.writer
            .close()
            .await
            .map_err(|e| Error::Connection(ConnectionError::WebSocket(e.to_string())))
    }
}

/// What the receive half produced.
#[derive(Debug)]
pub(crate) enum Inbound {
    Message(Message),
    /// A frame that could not be delivered; the connection stays up.
    Rejected(Error),
    /// The socket is gone. Terminal.
    Closed { code: u16, reason: Option<String> },
}

/// Receive half: decodes text frames, stops at the peer's close frame.
pub(crate) struct FramedRecv {
    reader: SplitStream<WsStream>,
}

impl FramedRecv {
    pub(crate) fn new(reader: SplitStream<WsStream>) -> Self {
        Self { reader }
    }

    pub(crate) async fn next_inbound(&mut self) -> Inbound {
        loop {
            let frame = match self.reader.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    return Inbound::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: Some(e.to_string()),
                    }
                }
                None => {
                    return Inbound::Closed {
                        code: CLOSE_NO_STATUS,
                        reason: None,
                    }
                }
            };
            match frame {
                Frame::Text(text) => {
                    return match Message::decode(&text) {
                        Ok(message) => Inbound::Message(message),
                        Err(e) => Inbound::Rejected(e),
                    }
                }
                Frame::Binary(data) => {
                    return Inbound::Rejected(
                        ConnectionError::UnsupportedFrame {
                            kind: "binary",
                            len: data.len(),
                        }
                        .into(),
                    )
                }
                // The close handshake is over from our side once this arrives;
                // the server owns tearing down TCP.
                Frame::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(f) => {
                            let reason = Some(f.reason.into_owned()).filter(|r| !r.is_empty());
                            (u16::from(f.code), reason)
                        }
                        None => (CLOSE_NO_STATUS, None),
                    };
                    return Inbound::Closed { code, reason };
                }
                // Pings are answered by tungstenite itself.
                Frame::Ping(_) | Frame::Pong(_) | Frame::Frame(_) => {}
            }
        }
    }

    /// Keep polling after a close so tungstenite flushes its close reply,
    /// until the stream ends or `limit` passes.
    pub(crate) async fn finish(mut self, limit: Duration) {
        let drain = async { while let Some(Ok(_)) = self.reader.next().await {} };
        if tokio::time::timeout(limit, drain).await.is_err() {
            tracing::debug!(?limit, "peer kept the socket open after close");
        }
    }
}
