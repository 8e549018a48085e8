//! Minimal bot: connects anonymously, joins a channel, logs chat, and
//! measures server latency once a minute.
//!
//! ```sh
//! cargo run --example pingbot -- forsen
//! ```

use std::time::Instant;

use anyhow::Result;
use tmi_sdk::{ClientConfig, Connection, Event, TransportKind};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let channel = std::env::args().nth(1).unwrap_or_else(|| "forsen".to_string());

    let (conn, mut events) = Connection::new(ClientConfig::default(), TransportKind::twitch());
    conn.connect().await?;
    conn.join(&channel).await?;
    tracing::info!("joined #{channel}");

    let pinger = conn.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            let started = Instant::now();
            match pinger.ping().await {
                Ok(()) => tracing::info!("server latency: {:?}", started.elapsed()),
                Err(e) => {
                    tracing::warn!("ping failed: {e}");
                    break;
                }
            }
        }
    });

    while let Some(event) = events.recv().await {
        match event {
            Event::Message(msg) if msg.command == "PRIVMSG" => {
                let who = msg.prefix_nick().unwrap_or("?");
                let text = msg.last_param().unwrap_or("");
                println!("[#{channel}] {who}: {text}");
            }
            Event::Close(error) => {
                match error {
                    Some(e) => tracing::error!("connection closed: {e}"),
                    None => tracing::info!("connection closed"),
                }
                break;
            }
            _ => {}
        }
    }
    Ok(())
}
