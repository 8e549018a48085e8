//! Validation of outbound commands and operation parameters.

use crate::error::{ChatError, ErrorKind};

/// Reject raw commands that would corrupt the line framing.
pub fn validate_irc_command(command: &str) -> Result<(), ChatError> {
    if command.contains('\n') || command.contains('\r') {
        return Err(ChatError::new(
            ErrorKind::Validation,
            "IRC command may not include \\n or \\r",
        ));
    }
    Ok(())
}

/// Twitch channel names (logins): 1-25 characters, lowercase
/// alphanumerics and underscores.
pub fn validate_channel_name(channel_name: &str) -> Result<(), ChatError> {
    let valid = !channel_name.is_empty()
        && channel_name.len() <= 25
        && channel_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(ChatError::new(
            ErrorKind::Validation,
            format!("Channel name \"{channel_name}\" is invalid/malformed"),
        ));
    }
    Ok(())
}

/// Anonymous (read-only) Twitch logins are `justinfan` followed by
/// digits. They can connect without credentials but cannot send
/// messages.
pub fn is_anonymous_username(username: &str) -> bool {
    username
        .strip_prefix("justinfan")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_embedded_newlines() {
        assert!(validate_irc_command("JOIN #a\nJOIN #b").is_err());
        assert!(validate_irc_command("JOIN #a\r\n").is_err());
        assert!(validate_irc_command("JOIN #a").is_ok());
    }

    #[test]
    fn newline_error_chain() {
        let err = validate_irc_command("PING\r").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "IRC command may not include \\n or \\r");
    }

    #[test]
    fn channel_names() {
        assert!(validate_channel_name("pajlada").is_ok());
        assert!(validate_channel_name("forsen_1").is_ok());
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name("Pajlada").is_err());
        assert!(validate_channel_name("#pajlada").is_err());
        assert!(validate_channel_name("with space").is_err());
        assert!(validate_channel_name("a_very_long_name_that_is_over_25_chars").is_err());
    }

    #[test]
    fn anonymous_usernames() {
        assert!(is_anonymous_username("justinfan12345"));
        assert!(is_anonymous_username("justinfan1"));
        assert!(!is_anonymous_username("justinfan"));
        assert!(!is_anonymous_username("justinfan12a"));
        assert!(!is_anonymous_username("pajlada"));
    }
}
