//! Fire-and-forget PRIVMSG.
//!
//! Unlike [`say`](crate::operations::say::say) this sends the text
//! verbatim and does not wait for any confirmation.

use crate::connection::Connection;
use crate::error::ChatError;
use crate::validation::validate_channel_name;

pub fn send_privmsg(
    conn: &Connection,
    channel_name: &str,
    message: &str,
) -> Result<(), ChatError> {
    validate_channel_name(channel_name)?;
    conn.send_raw(&format!("PRIVMSG #{channel_name} :{message}"))
}
