//! Basic example: connect to the simulation service, wait for its hello, disconnect.
//!
//! Run with: `SIMLINK_TOKEN=... cargo run --example basic`

use simlink::{Message, Observers, SocketTransport, Transport};
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let token = std::env::var("SIMLINK_TOKEN")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let observers = Observers::new()
        .on_message(move |msg| {
            let _ = tx.send(msg);
        })
        .on_close(|code, reason| {
            println!("[Close] code {} {}", code, reason.unwrap_or_default());
        })
        .on_error(|err| {
            println!("[Error] {}", err);
        });

    let transport = SocketTransport::from_env(token, observers);
    println!("Connecting to {}...", transport.config().url());
    transport.connect().await?;

    match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
        Ok(Some(Message::Hello {
            app_name,
            app_version,
            protocol_version,
        })) => {
            println!("[Hello] {} {} (protocol {})", app_name, app_version, protocol_version);
        }
        Ok(Some(other)) => println!("[Message] {:?}", other),
        Ok(None) | Err(_) => println!("No greeting received."),
    }

    transport.close().await?;
    Ok(())
}
