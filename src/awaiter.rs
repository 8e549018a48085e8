//! Response correlation: pending awaiters and the FIFO queue that owns
//! them.
//!
//! Twitch IRC has no request IDs, so an in-flight command is correlated
//! to its reply purely by position: awaiters queue up in issuance order,
//! and only the head of the queue is ever tested against an incoming
//! message. The one exception is outpacing — a message that explicitly
//! matches a *later* awaiter's success condition proves every awaiter
//! before it will never be answered, so those are rejected and the
//! matched one resolves.
//!
//! Each awaiter resolves exactly once: fulfilment and rejection both
//! consume its oneshot sender.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::connection::Connection;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;

pub(crate) const CONNECTION_CLOSED: &str = "Connection closed with no error";
pub(crate) const CLOSED_DUE_TO_ERROR: &str = "Connection closed due to error";
const OUTPACED: &str = "A response to a command issued later than this command was received";

/// A caller-supplied predicate deciding whether a message answers an
/// in-flight command. Must be pure; it is evaluated synchronously on the
/// connection's task.
pub type Matcher = Box<dyn Fn(&Message) -> bool + Send>;

/// How to resolve an awaiter when the connection closes cleanly before
/// any matching message arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoResponseAction {
    /// Reject with a connection-closed error.
    #[default]
    Failure,
    /// Resolve successfully with no message. For commands the server
    /// never positively confirms.
    Success,
}

/// Options for [`await_response`].
pub struct ResponseOptions {
    /// Matches the reply that fulfils the command. With neither
    /// `success` nor `failure` set, the next incoming message fulfils
    /// the awaiter implicitly.
    pub success: Option<Matcher>,
    /// Matches a reply that proves the command failed.
    pub failure: Option<Matcher>,
    /// Starts counting only once the awaiter reaches the head of the
    /// queue.
    pub timeout: Option<Duration>,
    pub no_response_action: NoResponseAction,
    /// Kind of the operation-level error every rejection is wrapped in.
    pub error_kind: ErrorKind,
    /// Message prefix of that operation-level error.
    pub error_message: String,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            success: None,
            failure: None,
            timeout: None,
            no_response_action: NoResponseAction::default(),
            error_kind: ErrorKind::Generic,
            error_message: String::new(),
        }
    }
}

pub(crate) type Completion = Result<Option<Message>, ChatError>;

/// One in-flight command waiting for its correlated reply.
pub(crate) struct ResponseAwaiter {
    options: ResponseOptions,
    completion: oneshot::Sender<Completion>,
    id: u64,
}

impl ResponseAwaiter {
    pub(crate) fn new(options: ResponseOptions, completion: oneshot::Sender<Completion>) -> Self {
        Self {
            options,
            completion,
            id: 0,
        }
    }

    /// Wrap an underlying cause into this awaiter's operation-level
    /// error.
    fn wrap(&self, cause: ChatError) -> ChatError {
        ChatError::with_cause(
            self.options.error_kind,
            self.options.error_message.clone(),
            cause,
        )
    }

    fn fulfill(self, message: Option<Message>) {
        // the caller may have stopped waiting; that is not our problem
        let _ = self.completion.send(Ok(message));
    }

    fn reject(self, error: ChatError) {
        let _ = self.completion.send(Err(error));
    }

    fn matches_failure(&self, msg: &Message) -> bool {
        self.options.failure.as_ref().is_some_and(|f| f(msg))
    }

    fn matches_success(&self, msg: &Message) -> bool {
        self.options.success.as_ref().is_some_and(|s| s(msg))
    }

    fn has_no_matchers(&self) -> bool {
        self.options.success.is_none() && self.options.failure.is_none()
    }
}

/// The per-connection FIFO of pending awaiters. Owned and mutated
/// exclusively by the connection's actor task; insertion order is
/// command issuance order and is never reordered, only removed from.
///
/// Every method that rejects awaiters returns the rejection errors so
/// the connection can broadcast the connection-fatal ones.
pub(crate) struct PendingQueue {
    entries: VecDeque<ResponseAwaiter>,
    next_id: u64,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push(&mut self, mut awaiter: ResponseAwaiter) {
        self.next_id += 1;
        awaiter.id = self.next_id;
        self.entries.push_back(awaiter);
    }

    pub(crate) fn head_id(&self) -> Option<u64> {
        self.entries.front().map(|a| a.id)
    }

    /// The head's configured timeout, if any. The connection arms its
    /// delay from this exactly when the head changes.
    pub(crate) fn head_timeout(&self) -> Option<Duration> {
        self.entries.front().and_then(|a| a.options.timeout)
    }

    /// Offer an incoming message to the queue.
    ///
    /// Precedence: head failure match, head explicit success match,
    /// outpacing scan for a later awaiter's explicit success match, then
    /// the head's implicit success (no matchers at all). A message that
    /// matches nothing leaves the queue untouched — it is not a response
    /// to anyone.
    pub(crate) fn on_message(&mut self, msg: &Message) -> Vec<ChatError> {
        let mut rejections = Vec::new();
        let Some(head) = self.entries.front() else {
            return rejections;
        };

        if head.matches_failure(msg) {
            if let Some(head) = self.entries.pop_front() {
                let error = head.wrap(ChatError::new(
                    ErrorKind::Message,
                    format!("Bad response message: {}", msg.raw_source),
                ));
                rejections.push(error.clone());
                head.reject(error);
            }
        } else if head.matches_success(msg) {
            if let Some(head) = self.entries.pop_front() {
                head.fulfill(Some(msg.clone()));
            }
        } else if let Some(index) = self
            .entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, awaiter)| awaiter.matches_success(msg))
            .map(|(index, _)| index)
        {
            // a later-issued command got its answer first; everything
            // before it will never be answered
            for outpaced in self.entries.drain(..index) {
                let error = outpaced.wrap(ChatError::new(ErrorKind::Timeout, OUTPACED));
                rejections.push(error.clone());
                outpaced.reject(error);
            }
            if let Some(matched) = self.entries.pop_front() {
                matched.fulfill(Some(msg.clone()));
            }
        } else if head.has_no_matchers() {
            if let Some(head) = self.entries.pop_front() {
                head.fulfill(Some(msg.clone()));
            }
        }

        rejections
    }

    /// The head's timeout fired. An awaiter whose no-response action is
    /// `Success` resolves successfully (commands that are only waiting
    /// for a possible failure notice are considered done); everything
    /// else rejects. Returns the rejection error, if any.
    pub(crate) fn timeout_head(&mut self) -> Option<ChatError> {
        let head = self.entries.pop_front()?;
        if head.options.no_response_action == NoResponseAction::Success {
            head.fulfill(None);
            return None;
        }
        let millis = head.options.timeout.map_or(0, |t| t.as_millis());
        let error = head.wrap(ChatError::new(
            ErrorKind::Timeout,
            format!("Timed out after waiting for response for {millis} milliseconds"),
        ));
        head.reject(error.clone());
        Some(error)
    }

    /// The connection failed: reject every pending awaiter, each
    /// wrapping the triggering error.
    pub(crate) fn fail_all(&mut self, cause: &ChatError) -> Vec<ChatError> {
        let mut rejections = Vec::new();
        for awaiter in self.entries.drain(..) {
            let error = awaiter.wrap(ChatError::with_cause(
                ErrorKind::Connection,
                CLOSED_DUE_TO_ERROR,
                cause.clone(),
            ));
            rejections.push(error.clone());
            awaiter.reject(error);
        }
        rejections
    }

    /// The connection closed cleanly: resolve every pending awaiter
    /// according to its no-response action.
    pub(crate) fn close_all(&mut self) -> Vec<ChatError> {
        let mut rejections = Vec::new();
        for awaiter in self.entries.drain(..) {
            match awaiter.options.no_response_action {
                NoResponseAction::Failure => {
                    let error =
                        awaiter.wrap(ChatError::new(ErrorKind::Connection, CONNECTION_CLOSED));
                    rejections.push(error.clone());
                    awaiter.reject(error);
                }
                NoResponseAction::Success => awaiter.fulfill(None),
            }
        }
        rejections
    }
}

/// Register an awaiter on `connection` and wait for the correlated
/// response.
///
/// Resolves with the matching message, or `Ok(None)` when the connection
/// closed cleanly and the awaiter was configured with
/// [`NoResponseAction::Success`]. Every rejection is an error of
/// `options.error_kind` prefixed with `options.error_message`, wrapping
/// the underlying cause (timeout, bad response message, or connection
/// failure).
pub async fn await_response(
    connection: &Connection,
    options: ResponseOptions,
) -> Result<Option<Message>, ChatError> {
    let error_kind = options.error_kind;
    let error_message = options.error_message.clone();
    let closed = move || {
        ChatError::with_cause(
            error_kind,
            error_message.clone(),
            ChatError::new(ErrorKind::Connection, CONNECTION_CLOSED),
        )
    };

    let (tx, rx) = oneshot::channel();
    let awaiter = ResponseAwaiter::new(options, tx);
    if !connection.register(awaiter) {
        return Err(closed());
    }

    match rx.await {
        Ok(result) => result,
        // the actor dropped without resolving us; treat like a close
        Err(_) => Err(closed()),
    }
}
