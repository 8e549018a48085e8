//! PASS/NICK login.
//!
//! A login failure is connection-fatal: the server will not accept any
//! further commands on a connection that failed to authenticate.

use crate::awaiter::{await_response, ResponseOptions};
use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;

const ERROR_MESSAGE: &str = "Failed to login";

/// Authenticate the connection. With no password only `NICK` is sent
/// (anonymous login); otherwise `PASS` precedes it, with the `oauth:`
/// prefix added when missing. Resolves on the server's `001` welcome.
pub async fn send_login(
    conn: &Connection,
    username: &str,
    password: Option<&str>,
) -> Result<(), ChatError> {
    if let Some(password) = password {
        let password = if password.starts_with("oauth:") {
            password.to_string()
        } else {
            format!("oauth:{password}")
        };
        conn.send_raw(&format!("PASS {password}"))?;
    }
    conn.send_raw(&format!("NICK {username}"))?;

    await_response(
        conn,
        ResponseOptions {
            success: Some(Box::new(|msg: &Message| msg.command == "001")),
            // e.g. `:tmi.twitch.tv NOTICE * :Improperly formatted auth`
            failure: Some(Box::new(|msg: &Message| {
                msg.command == "NOTICE" && msg.param(0) == Some("*")
            })),
            timeout: Some(conn.config().default_timeout),
            error_kind: ErrorKind::Login,
            error_message: ERROR_MESSAGE.to_string(),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
