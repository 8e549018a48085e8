//! JOIN a channel.

use crate::awaiter::{await_response, ResponseOptions};
use crate::conditions::matching_notice;
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;
use crate::operations::require_matched;
use crate::validation::validate_channel_name;

const FAILURE_NOTICE_IDS: &[&str] = &["msg_channel_suspended"];

/// True when the channel is both joined and wanted — nothing left to do.
/// A channel that is joined but no longer wanted (a part in progress)
/// or wanted but not joined (a previously failed join) can be
/// (re)joined.
pub fn join_nothing_to_do(conn: &Connection, channel_name: &str) -> bool {
    conn.wanted_channels().contains(channel_name)
        && conn.joined_channels().contains(channel_name)
}

/// Join a channel and wait for the server's confirming `JOIN` echo.
/// Resolves with that message, or `None` when there was nothing to do.
pub async fn join_channel(
    conn: &Connection,
    channel_name: &str,
) -> Result<Option<Message>, ChatError> {
    validate_channel_name(channel_name)?;
    if join_nothing_to_do(conn, channel_name) {
        return Ok(None);
    }
    conn.mark_wanted(channel_name, true);

    let error_message = format!("Failed to join channel {channel_name}");
    conn.send_raw(&format!("JOIN #{channel_name}"))?;

    let own_username = conn.config().username.clone();
    let wanted_channel = channel_name.to_string();
    let response = await_response(
        conn,
        ResponseOptions {
            success: Some(Box::new(move |msg: &Message| {
                msg.command == "JOIN"
                    && msg.channel_name() == Some(wanted_channel.as_str())
                    && msg.prefix_nick() == Some(own_username.as_str())
            })),
            failure: Some(Box::new(matching_notice(channel_name, FAILURE_NOTICE_IDS))),
            timeout: Some(conn.config().default_timeout),
            error_kind: ErrorKind::Join,
            error_message: error_message.clone(),
            ..Default::default()
        },
    )
    .await?;

    let message = require_matched(response, ErrorKind::Join, &error_message)?;
    conn.mark_joined(channel_name, true);
    Ok(Some(message))
}
