//! # simlink
//!
//! Resilient message transport between a client and a remote simulation service.
//!
//! ## Features
//!
//! - Authenticated WebSocket upgrade (`Authorization: Bearer`, `User-Agent`)
//! - Automatic retry of transient upgrade rejections (408, 503, 524) on a fixed schedule
//! - One JSON message per text frame, delivered in arrival order
//! - Silent local shutdown: only unexpected terminations reach the close observer
//! - In-process channel variant with the same contract
//!
//! ## Example
//!
//! ```ignore
//! use simlink::{Message, Observers, SocketTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let observers = Observers::new()
//!         .on_message(|msg| println!("{msg:?}"))
//!         .on_close(|code, reason| eprintln!("closed: {code} {reason:?}"));
//!     let transport = SocketTransport::from_env("my-token", observers);
//!     transport.connect().await?;
//!     transport
//!         .send(Message::command("sim:pause", serde_json::Value::Null, None))
//!         .await?;
//!     transport.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod handshake;
pub mod message;
pub mod retry;
pub mod socket;
pub mod transport;
pub mod version;

pub use channel::ChannelTransport;
pub use error::{CodecError, ConnectionError, Error, Result};
pub use handshake::{classify_status, HandshakeVerdict};
pub use message::Message;
pub use retry::RetrySchedule;
#[cfg(feature = "full")]
pub use socket::SocketTransport;
pub use socket::{ConnectionState, SocketConfig};
pub use transport::{Observers, Transport};
pub use version::{BuildInfo, BuildInfoSource, ClientIdentity, PackageBuildInfo, VersionFile};
