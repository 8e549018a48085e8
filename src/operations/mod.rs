//! High-level chat operations.
//!
//! Each operation sends its wire command and then blocks on
//! [`await_response`](crate::awaiter::await_response) with the matchers,
//! timeout and error policy that command calls for. Whether a failed
//! operation takes the whole connection down is decided purely by its
//! [`ErrorKind`](crate::error::ErrorKind): login, capability and ping
//! failures are connection-fatal, join/part/say/whisper failures are
//! not.

pub mod join;
pub mod login;
pub mod part;
pub mod ping;
pub mod privmsg;
pub mod request_capabilities;
pub mod say;
pub mod whisper;

use crate::awaiter::CONNECTION_CLOSED;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;

/// An awaiter with the default no-response action only ever resolves
/// with a message — a clean close rejects it instead. This states that
/// invariant once for the operations that return the matched message.
pub(crate) fn require_matched(
    response: Option<Message>,
    error_kind: ErrorKind,
    error_message: &str,
) -> Result<Message, ChatError> {
    response.ok_or_else(|| {
        ChatError::with_cause(
            error_kind,
            error_message,
            ChatError::new(ErrorKind::Connection, CONNECTION_CLOSED),
        )
    })
}
