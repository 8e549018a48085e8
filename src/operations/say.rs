//! Channel messages with server confirmation.
//!
//! Twitch echoes a `USERSTATE` for the channel after accepting a
//! message, and reports failures through tagged NOTICEs; `say` waits for
//! either.

use crate::awaiter::{await_response, ResponseOptions};
use crate::conditions::matching_notice;
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;
use crate::operations::require_matched;
use crate::validation::validate_channel_name;

const FAILURE_NOTICE_IDS: &[&str] = &[
    "msg_banned",
    "msg_bad_characters",
    "msg_channel_blocked",
    "msg_channel_suspended",
    "msg_duplicate",
    "msg_emoteonly",
    "msg_followersonly",
    "msg_followersonly_followed",
    "msg_followersonly_zero",
    "msg_r9k",
    "msg_ratelimit",
    "msg_rejected",
    "msg_rejected_mandatory",
    "msg_slowmode",
    "msg_subsonly",
    "msg_suspended",
    "msg_timedout",
    "msg_verified_email",
];

/// Defuse chat commands in user-provided text: a message starting with
/// `/` or `.` would otherwise be interpreted as a command by the server.
pub fn remove_commands(message: &str) -> String {
    if message.starts_with('/') || message.starts_with('.') {
        format!("/ {message}")
    } else {
        message.to_string()
    }
}

/// Say `message` in a channel; chat commands in the text are defused.
/// Resolves with the confirming `USERSTATE` message.
pub async fn say(
    conn: &Connection,
    channel_name: &str,
    message: &str,
) -> Result<Message, ChatError> {
    send_and_confirm(conn, channel_name, message, &remove_commands(message)).await
}

/// Send an action (`/me`) message to a channel.
pub async fn me(
    conn: &Connection,
    channel_name: &str,
    message: &str,
) -> Result<Message, ChatError> {
    send_and_confirm(conn, channel_name, &format!("/me {message}"), &format!("/me {message}"))
        .await
}

async fn send_and_confirm(
    conn: &Connection,
    channel_name: &str,
    described_message: &str,
    wire_text: &str,
) -> Result<Message, ChatError> {
    validate_channel_name(channel_name)?;

    let error_message = format!("Failed to say [#{channel_name}]: {described_message}");
    conn.send_raw(&format!("PRIVMSG #{channel_name} :{wire_text}"))?;

    let wanted_channel = channel_name.to_string();
    let response = await_response(
        conn,
        ResponseOptions {
            success: Some(Box::new(move |msg: &Message| {
                msg.command == "USERSTATE"
                    && msg.channel_name() == Some(wanted_channel.as_str())
            })),
            failure: Some(Box::new(matching_notice(channel_name, FAILURE_NOTICE_IDS))),
            timeout: Some(conn.config().default_timeout),
            error_kind: ErrorKind::Say,
            error_message: error_message.clone(),
            ..Default::default()
        },
    )
    .await?;
    require_matched(response, ErrorKind::Say, &error_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_commands_defuses_commands() {
        assert_eq!(remove_commands("/me hi"), "/ /me hi");
        assert_eq!(remove_commands(".me hi"), "/ .me hi");
        assert_eq!(remove_commands("/timeout weeb123 5"), "/ /timeout weeb123 5");
    }

    #[test]
    fn remove_commands_leaves_other_messages_alone() {
        assert_eq!(remove_commands(""), "");
        assert_eq!(remove_commands("\\me hi"), "\\me hi");
        assert_eq!(remove_commands("hello world!"), "hello world!");
    }
}
