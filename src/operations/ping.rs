//! Client-to-server PING.
//!
//! This doubles as the connection's liveness probe: a server that fails
//! to PONG in time is considered dead, so the timeout error here is
//! connection-fatal.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::awaiter::{await_response, ResponseOptions};
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;
use crate::operations::require_matched;

const ERROR_MESSAGE: &str = "Server did not PONG back";

static PING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A process-unique identifier so concurrent pings cannot claim each
/// other's PONGs.
fn next_ping_identifier() -> String {
    format!(
        "tmi-sdk:manual:{:016x}",
        PING_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Ping the server and wait for the PONG carrying the same identifier.
/// With no identifier given a unique one is generated.
pub async fn send_ping(
    conn: &Connection,
    identifier: Option<&str>,
) -> Result<Message, ChatError> {
    let identifier = identifier.map_or_else(next_ping_identifier, str::to_string);
    conn.send_raw(&format!("PING :{identifier}"))?;

    let expected = identifier.clone();
    let response = await_response(
        conn,
        ResponseOptions {
            // `:tmi.twitch.tv PONG tmi.twitch.tv :<identifier>`
            success: Some(Box::new(move |msg: &Message| {
                msg.command == "PONG" && msg.last_param() == Some(expected.as_str())
            })),
            timeout: Some(conn.config().ping_timeout),
            error_kind: ErrorKind::PingTimeout,
            error_message: ERROR_MESSAGE.to_string(),
            ..Default::default()
        },
    )
    .await?;
    require_matched(response, ErrorKind::PingTimeout, ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identifiers_are_unique_and_recognizable() {
        let first = next_ping_identifier();
        let second = next_ping_identifier();
        assert_ne!(first, second);
        let suffix = first.strip_prefix("tmi-sdk:manual:").unwrap();
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
