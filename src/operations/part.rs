//! PART a channel.

use crate::awaiter::{await_response, ResponseOptions};
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;
use crate::operations::require_matched;
use crate::validation::validate_channel_name;

/// True when the channel is neither joined nor wanted. A channel that is
/// still joined (a previously failed part) or still wanted (a join in
/// progress we want undone) can be parted.
pub fn part_nothing_to_do(conn: &Connection, channel_name: &str) -> bool {
    !conn.wanted_channels().contains(channel_name)
        && !conn.joined_channels().contains(channel_name)
}

/// Leave a channel and wait for the server's confirming `PART` echo.
/// Resolves with that message, or `None` when there was nothing to do.
pub async fn part_channel(
    conn: &Connection,
    channel_name: &str,
) -> Result<Option<Message>, ChatError> {
    validate_channel_name(channel_name)?;
    if part_nothing_to_do(conn, channel_name) {
        return Ok(None);
    }
    conn.mark_wanted(channel_name, false);

    let error_message = format!("Failed to part channel {channel_name}");
    conn.send_raw(&format!("PART #{channel_name}"))?;

    let own_username = conn.config().username.clone();
    let wanted_channel = channel_name.to_string();
    let response = await_response(
        conn,
        ResponseOptions {
            success: Some(Box::new(move |msg: &Message| {
                msg.command == "PART"
                    && msg.channel_name() == Some(wanted_channel.as_str())
                    && msg.prefix_nick() == Some(own_username.as_str())
            })),
            timeout: Some(conn.config().default_timeout),
            error_kind: ErrorKind::Part,
            error_message: error_message.clone(),
            ..Default::default()
        },
    )
    .await?;

    let message = require_matched(response, ErrorKind::Part, &error_message)?;
    conn.mark_joined(channel_name, false);
    Ok(Some(message))
}
