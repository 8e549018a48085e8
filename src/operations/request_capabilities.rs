//! CAP REQ negotiation.
//!
//! Twitch chat is useless without `twitch.tv/commands` and
//! `twitch.tv/tags`, so a denied request is connection-fatal.

use crate::awaiter::{await_response, ResponseOptions};
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;

/// Matches a `CAP * ACK` acknowledging every requested capability.
pub fn acknowledges_capabilities(
    requested: &[&str],
) -> impl Fn(&Message) -> bool + Send + 'static {
    let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
    move |msg: &Message| {
        if msg.command != "CAP" || msg.param(1) != Some("ACK") {
            return false;
        }
        let acknowledged: Vec<&str> = msg
            .last_param()
            .unwrap_or("")
            .split_whitespace()
            .collect();
        requested
            .iter()
            .all(|cap| acknowledged.contains(&cap.as_str()))
    }
}

/// Matches a `CAP * NAK` denying any of the requested capabilities.
pub fn denied_any_capability(requested: &[&str]) -> impl Fn(&Message) -> bool + Send + 'static {
    let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
    move |msg: &Message| {
        if msg.command != "CAP" || msg.param(1) != Some("NAK") {
            return false;
        }
        msg.last_param()
            .unwrap_or("")
            .split_whitespace()
            .any(|cap| requested.iter().any(|r| r == cap))
    }
}

/// Request the Twitch capability set, optionally including
/// `twitch.tv/membership`.
pub async fn request_capabilities(
    conn: &Connection,
    request_membership: bool,
) -> Result<(), ChatError> {
    let mut capabilities = vec!["twitch.tv/commands", "twitch.tv/tags"];
    if request_membership {
        capabilities.push("twitch.tv/membership");
    }

    conn.send_raw(&format!("CAP REQ :{}", capabilities.join(" ")))?;

    await_response(
        conn,
        ResponseOptions {
            success: Some(Box::new(acknowledges_capabilities(&capabilities))),
            failure: Some(Box::new(denied_any_capability(&capabilities))),
            timeout: Some(conn.config().default_timeout),
            error_kind: ErrorKind::Capabilities,
            error_message: format!(
                "Failed to request server capabilities {}",
                capabilities.join(", ")
            ),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(line: &str) -> Message {
        Message::parse(line).unwrap()
    }

    #[test]
    fn acknowledges_only_when_all_requested_are_acked() {
        let matcher = acknowledges_capabilities(&["a", "b", "c"]);
        assert!(matcher(&msg("CAP * ACK :a b c d")));
        assert!(matcher(&msg("CAP * ACK :c b a")));
        assert!(!matcher(&msg("CAP * ACK :a b")));
    }

    #[test]
    fn acknowledges_only_considers_the_ack_subcommand() {
        let matcher = acknowledges_capabilities(&["a", "b", "c"]);
        assert!(!matcher(&msg("CAP * DEF :a b c")));
        assert!(!matcher(&msg("CAP * NAK :a b c")));
    }

    #[test]
    fn denies_when_any_requested_is_naked() {
        let matcher = denied_any_capability(&["a", "b", "c"]);
        assert!(matcher(&msg("CAP * NAK :a b c")));
        assert!(matcher(&msg("CAP * NAK :a")));
        assert!(matcher(&msg("CAP * NAK :c")));
        assert!(!matcher(&msg("CAP * NAK :d")));
    }

    #[test]
    fn denies_only_considers_the_nak_subcommand() {
        let matcher = denied_any_capability(&["a", "b", "c"]);
        assert!(!matcher(&msg("CAP * DEF :a")));
        assert!(!matcher(&msg("CAP * ACK :a")));
    }
}
