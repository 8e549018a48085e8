//! Error taxonomy for the client.
//!
//! Every failure in this crate is a [`ChatError`]: an error kind, an
//! optional message of its own, and an optional boxed cause. Causes chain
//! into exactly one line of ancestry, and the rendered message is the
//! concatenation of every non-empty message along that chain
//! (`"Failed to join channel forsen: Bad response message: ..."`).
//!
//! The chain is first-class data, not incidental logging: connection
//! teardown decisions and the test suites both walk it.

use std::fmt;

/// What category of failure a [`ChatError`] (or one link of its cause
/// chain) represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plain wrapper with no further meaning of its own.
    Generic,
    /// Connection-level failure (transport error, unexpected close).
    Connection,
    /// A received line could not be parsed as an IRC message.
    Protocol,
    /// The server asked us to reconnect.
    Reconnect,
    /// A received message matched an awaiter's failure condition.
    Message,
    /// An awaiter timed out or was outpaced by a later response.
    Timeout,
    /// Malformed outbound command or operation parameter.
    Validation,
    /// Login (PASS/NICK) was rejected.
    Login,
    /// Capability negotiation (CAP REQ) was rejected.
    Capabilities,
    /// The server failed to answer one of our PINGs in time.
    PingTimeout,
    /// JOIN failed.
    Join,
    /// PART failed.
    Part,
    /// Sending a channel message failed.
    Say,
    /// Sending a whisper failed.
    Whisper,
}

impl ErrorKind {
    /// Whether an error of this kind must close the connection it
    /// occurred on.
    ///
    /// `Protocol` is deliberately absent: a malformed line is surfaced
    /// as an error event but must not kill the read loop.
    pub fn is_connection_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::Connection
                | ErrorKind::Reconnect
                | ErrorKind::Login
                | ErrorKind::Capabilities
                | ErrorKind::PingTimeout
        )
    }
}

/// A chainable error: kind, optional own message, optional single cause.
#[derive(Debug, Clone)]
pub struct ChatError {
    kind: ErrorKind,
    message: Option<String>,
    cause: Option<Box<ChatError>>,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn with_cause(kind: ErrorKind, message: impl Into<String>, cause: ChatError) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            cause: Some(Box::new(cause)),
        }
    }

    /// An error with a cause but no message of its own; it renders as
    /// its cause's message.
    pub fn from_cause(kind: ErrorKind, cause: ChatError) -> Self {
        Self {
            kind,
            message: None,
            cause: Some(Box::new(cause)),
        }
    }

    /// An error with neither message nor cause.
    pub fn bare(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            cause: None,
        }
    }

    /// Wraps a foreign error (IO, TLS, ...) as the terminal link of a
    /// chain, keeping only its rendered message.
    pub fn external(error: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            kind: ErrorKind::Generic,
            message: Some(error.to_string()),
            cause: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// This link's own message, without the cause appended.
    pub fn own_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&ChatError> {
        self.cause.as_deref()
    }

    /// The full rendered message: `own: cause` where both are non-empty,
    /// else whichever is non-empty, else empty.
    pub fn message(&self) -> String {
        let own = self.message.as_deref().unwrap_or("");
        let cause = self
            .cause
            .as_ref()
            .map(|c| c.message())
            .unwrap_or_default();
        match (own.is_empty(), cause.is_empty()) {
            (false, false) => format!("{own}: {cause}"),
            (false, true) => own.to_string(),
            (true, false) => cause,
            (true, true) => String::new(),
        }
    }

    /// Does this error, or any cause below it, have the given kind?
    pub fn any_cause_is(&self, kind: ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(error) = current {
            if error.kind == kind {
                return true;
            }
            current = error.cause();
        }
        false
    }

    /// Does any link of the chain carry a connection-fatal kind?
    pub fn is_fatal(&self) -> bool {
        let mut current = Some(self);
        while let Some(error) = current {
            if error.kind.is_connection_fatal() {
                return true;
            }
            current = error.cause();
        }
        false
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as _)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_concatenates_own_and_cause() {
        let inner = ChatError::new(ErrorKind::Generic, "C");
        let mid = ChatError::with_cause(ErrorKind::Generic, "B", inner);
        let outer = ChatError::with_cause(ErrorKind::Generic, "A", mid);
        assert_eq!(outer.message(), "A: B: C");
    }

    #[test]
    fn message_falls_back_to_cause() {
        let cause = ChatError::new(ErrorKind::Generic, "C");
        let error = ChatError::from_cause(ErrorKind::Generic, cause);
        assert_eq!(error.message(), "C");
    }

    #[test]
    fn message_without_cause_is_own_message() {
        assert_eq!(ChatError::new(ErrorKind::Generic, "A").message(), "A");
    }

    #[test]
    fn message_with_empty_cause_is_own_message() {
        let cause = ChatError::bare(ErrorKind::Generic);
        let error = ChatError::with_cause(ErrorKind::Generic, "A", cause);
        assert_eq!(error.message(), "A");
    }

    #[test]
    fn message_empty_when_nothing_set() {
        assert_eq!(ChatError::bare(ErrorKind::Generic).message(), "");
        let cause = ChatError::bare(ErrorKind::Generic);
        let error = ChatError::from_cause(ErrorKind::Generic, cause);
        assert_eq!(error.message(), "");
    }

    #[test]
    fn cause_is_preserved() {
        let cause = ChatError::new(ErrorKind::Connection, "cause msg");
        let error = ChatError::with_cause(ErrorKind::Generic, "error msg", cause);
        assert_eq!(error.cause().unwrap().message(), "cause msg");
        assert!(ChatError::new(ErrorKind::Generic, "error msg")
            .cause()
            .is_none());
    }

    #[test]
    fn any_cause_finds_kind_at_every_depth() {
        let a = ChatError::new(ErrorKind::Timeout, "A");
        let b = ChatError::with_cause(ErrorKind::Message, "B", a);
        let c = ChatError::with_cause(ErrorKind::Join, "C", b);

        assert!(c.any_cause_is(ErrorKind::Join));
        assert!(c.any_cause_is(ErrorKind::Message));
        assert!(c.any_cause_is(ErrorKind::Timeout));
        assert!(!c.any_cause_is(ErrorKind::Connection));
    }

    #[test]
    fn fatality_follows_the_chain() {
        // a non-fatal wrapper around a fatal cause is still fatal
        let fatal = ChatError::new(ErrorKind::Connection, "gone");
        let wrapped = ChatError::with_cause(ErrorKind::Generic, "op failed", fatal);
        assert!(wrapped.is_fatal());

        let harmless = ChatError::with_cause(
            ErrorKind::Join,
            "op failed",
            ChatError::new(ErrorKind::Timeout, "too slow"),
        );
        assert!(!harmless.is_fatal());
    }

    #[test]
    fn operation_kind_fatality_policy() {
        assert!(ErrorKind::Login.is_connection_fatal());
        assert!(ErrorKind::Capabilities.is_connection_fatal());
        assert!(ErrorKind::PingTimeout.is_connection_fatal());
        assert!(ErrorKind::Reconnect.is_connection_fatal());
        assert!(ErrorKind::Connection.is_connection_fatal());

        assert!(!ErrorKind::Protocol.is_connection_fatal());
        assert!(!ErrorKind::Join.is_connection_fatal());
        assert!(!ErrorKind::Part.is_connection_fatal());
        assert!(!ErrorKind::Say.is_connection_fatal());
        assert!(!ErrorKind::Whisper.is_connection_fatal());
        assert!(!ErrorKind::Validation.is_connection_fatal());
    }
}
