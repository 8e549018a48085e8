//! Whispers (direct messages).
//!
//! Twitch never positively confirms a whisper; the server only speaks up
//! with a `whisper_*` NOTICE when something went wrong. The awaiter
//! therefore has no success matcher and resolves successfully when its
//! grace period passes, or when the connection closes cleanly, without
//! a failure notice having arrived.

use std::time::Duration;

use crate::awaiter::{await_response, NoResponseAction, ResponseOptions};
use crate::conditions::matching_notice;
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::validation::validate_channel_name;

const FAILURE_NOTICE_IDS: &[&str] = &[
    "whisper_banned",
    "whisper_banned_recipient",
    "whisper_invalid_args",
    "whisper_invalid_login",
    "whisper_invalid_self",
    "whisper_limit_per_min",
    "whisper_limit_per_sec",
    "whisper_restricted",
    "whisper_restricted_recipient",
];

/// How long to listen for a failure notice before declaring the whisper
/// delivered.
const GRACE_PERIOD: Duration = Duration::from_millis(1000);

/// Whisper `message` to `username`.
pub async fn whisper(
    conn: &Connection,
    username: &str,
    message: &str,
) -> Result<(), ChatError> {
    // usernames share the channel-name grammar
    validate_channel_name(username)?;

    let own_channel = conn.config().username.clone();
    conn.send_raw(&format!("PRIVMSG #{own_channel} :/w {username} {message}"))?;

    await_response(
        conn,
        ResponseOptions {
            failure: Some(Box::new(matching_notice(&own_channel, FAILURE_NOTICE_IDS))),
            timeout: Some(GRACE_PERIOD),
            no_response_action: NoResponseAction::Success,
            error_kind: ErrorKind::Whisper,
            error_message: format!("Failed to whisper [{username}]: {message}"),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
