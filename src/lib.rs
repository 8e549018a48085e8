//! Twitch chat (IRC) client SDK.
//!
//! Connects to `tmi.twitch.tv`, negotiates capabilities, logs in, and
//! correlates command responses out of the untagged IRC message stream.
//! The central primitive is [`await_response`]: operations send their
//! wire command, then queue an awaiter that resolves when a matching
//! reply arrives — with strict FIFO ordering, head-of-queue timeouts,
//! and deterministic rejection of everything still pending when the
//! connection goes down.
//!
//! # Example
//!
//! ```rust,no_run
//! use tmi_sdk::{ClientConfig, Connection, Event, TransportKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (conn, mut events) = Connection::new(
//!         ClientConfig::default(), // anonymous login
//!         TransportKind::twitch(),
//!     );
//!     conn.connect().await?;
//!     conn.join("forsen").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let Event::Message(msg) = event {
//!             println!("{}", msg.raw_source);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod awaiter;
pub mod conditions;
pub mod config;
pub mod connection;
pub mod error;
pub mod irc;
pub mod operations;
pub mod transport;
pub mod validation;

mod timeout;

pub use awaiter::{await_response, Matcher, NoResponseAction, ResponseOptions};
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionState, Event};
pub use error::{ChatError, ErrorKind};
pub use irc::{Message, ParseError};
pub use transport::TransportKind;
