//! A single connection to Twitch chat.
//!
//! [`Connection`] is a cheap-to-clone handle; all queue and transport
//! state lives in one actor task spawned at construction. Everything
//! that mutates the pending queue — registrations, incoming messages,
//! the head-of-queue timeout, close cascades — runs on that task, so
//! awaiter resolution is strictly ordered and free of races by
//! construction.
//!
//! Lifecycle: `Unconnected → Connecting → Connected → Ready → Closed`.
//! `Closed` is terminal and reached exactly once, whether through a
//! clean end of stream, a user [`Connection::close`], or a fatal error
//! cascade that first rejects every pending awaiter.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

use crate::awaiter::{PendingQueue, ResponseAwaiter, CONNECTION_CLOSED};
use crate::config::ClientConfig;
use crate::error::{ChatError, ErrorKind};
use crate::irc::Message;
use crate::operations;
use crate::timeout::EditableDelay;
use crate::transport::{transport_error, TransportKind, TransportReader, TransportWriter};
use crate::validation::validate_irc_command;

static CONNECTION_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    /// Capability negotiation and login completed.
    Ready,
    /// Terminal.
    Closed,
}

/// Everything a connection reports to its consumer.
#[derive(Debug, Clone)]
pub enum Event {
    Connecting,
    Connected,
    /// Capability negotiation and login completed.
    Ready,
    /// Every parsed incoming message, whether or not an awaiter also
    /// claimed it.
    Message(Message),
    Error(ChatError),
    /// Fired exactly once, with the causal error if the close was not
    /// clean.
    Close(Option<ChatError>),
    /// The server asked us to reconnect; an aggregator should replace
    /// this connection. Accompanied by an `Error` and a `Close`.
    Reconnect,
}

enum Command {
    Attach {
        reader: TransportReader,
        writer: TransportWriter,
        pre_setup: bool,
    },
    SendRaw(String),
    Register(ResponseAwaiter),
    Ready,
    Close,
    Fail(ChatError),
    PendingCount(oneshot::Sender<usize>),
}

struct Shared {
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    transport: Mutex<Option<TransportKind>>,
    wanted_channels: Mutex<HashSet<String>>,
    joined_channels: Mutex<HashSet<String>>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_tx: mpsc::UnboundedSender<Event>,
    connection_id: usize,
}

/// Handle to a single Twitch chat connection.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    /// Create a connection over the given transport. Nothing happens on
    /// the wire until [`connect`](Connection::connect) is called, but
    /// the returned handle can already queue commands and awaiters.
    pub fn new(
        config: ClientConfig,
        transport: TransportKind,
    ) -> (Connection, mpsc::UnboundedReceiver<Event>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(ConnectionState::Unconnected),
            transport: Mutex::new(Some(transport)),
            wanted_channels: Mutex::new(HashSet::new()),
            joined_channels: Mutex::new(HashSet::new()),
            cmd_tx,
            event_tx: event_tx.clone(),
            connection_id: CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed),
        });

        let actor = Actor {
            shared: Arc::clone(&shared),
            events: event_tx,
            cmd_rx,
            reader: None,
            writer: None,
            queue: PendingQueue::new(),
            head_delay: EditableDelay::new(),
            armed_for: None,
            pre_setup: false,
            next_ping: Instant::now(),
            line_buf: String::new(),
        };
        tokio::spawn(actor.run());

        (Connection { shared }, event_rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn connection_id(&self) -> usize {
        self.shared.connection_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    /// Establish the transport and start the protocol.
    ///
    /// Only legal on an unconnected connection. Emits `Connecting`, then
    /// `Connected` once the transport is up; unless the transport is
    /// pre-set-up, capability negotiation and login then run
    /// concurrently and their joint success emits `Ready`. A transport
    /// failure is returned and also cascades into `Error` + `Close`.
    pub async fn connect(&self) -> Result<(), ChatError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if *state != ConnectionState::Unconnected {
                return Err(ChatError::new(
                    ErrorKind::Validation,
                    "connect() may only be called on unconnected connections",
                ));
            }
            *state = ConnectionState::Connecting;
        }
        self.emit(Event::Connecting);

        let transport = self.shared.transport.lock().unwrap().take();
        let Some(transport) = transport else {
            // cannot happen: taking the transport and leaving
            // `Unconnected` go together
            return Err(ChatError::new(ErrorKind::Connection, CONNECTION_CLOSED));
        };
        let pre_setup = transport.is_pre_setup();

        match transport.connect().await {
            Ok((reader, writer)) => {
                let _ = self.shared.cmd_tx.send(Command::Attach {
                    reader,
                    writer,
                    pre_setup,
                });
            }
            Err(error) => {
                let _ = self.shared.cmd_tx.send(Command::Fail(error.clone()));
                return Err(error);
            }
        }

        if !pre_setup {
            let conn = self.clone();
            tokio::spawn(async move {
                let config = conn.config().clone();
                let capabilities = operations::request_capabilities::request_capabilities(
                    &conn,
                    config.request_membership_capability,
                );
                let login = operations::login::send_login(
                    &conn,
                    &config.username,
                    config.password.as_deref(),
                );
                // failures are fatal operation errors and cascade into
                // the close on their own
                if tokio::try_join!(capabilities, login).is_ok() {
                    let _ = conn.shared.cmd_tx.send(Command::Ready);
                }
            });
        }
        Ok(())
    }

    /// Send a raw IRC command, e.g. `JOIN #forsen`. The line terminator
    /// is appended here; commands containing `\r` or `\n` are rejected.
    pub fn send_raw(&self, command: &str) -> Result<(), ChatError> {
        validate_irc_command(command)?;
        tracing::debug!(connection_id = self.shared.connection_id, "> {command}");
        self.shared
            .cmd_tx
            .send(Command::SendRaw(command.to_string()))
            .map_err(|_| ChatError::new(ErrorKind::Connection, CONNECTION_CLOSED))
    }

    /// Request a clean close. Idempotent; pending awaiters resolve
    /// according to their no-response action.
    pub fn close(&self) {
        let _ = self.shared.cmd_tx.send(Command::Close);
    }

    /// Number of in-flight awaiters, in issuance order. Zero once the
    /// connection has closed.
    pub async fn pending_response_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.shared.cmd_tx.send(Command::PendingCount(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Channels this connection is supposed to be in. An aggregator
    /// re-issues these on a replacement connection after a reconnect.
    pub fn wanted_channels(&self) -> HashSet<String> {
        self.shared.wanted_channels.lock().unwrap().clone()
    }

    /// Channels the server has confirmed us into.
    pub fn joined_channels(&self) -> HashSet<String> {
        self.shared.joined_channels.lock().unwrap().clone()
    }

    pub(crate) fn register(&self, awaiter: ResponseAwaiter) -> bool {
        self.shared.cmd_tx.send(Command::Register(awaiter)).is_ok()
    }

    pub(crate) fn mark_wanted(&self, channel_name: &str, wanted: bool) {
        let mut channels = self.shared.wanted_channels.lock().unwrap();
        if wanted {
            channels.insert(channel_name.to_string());
        } else {
            channels.remove(channel_name);
        }
    }

    pub(crate) fn mark_joined(&self, channel_name: &str, joined: bool) {
        let mut channels = self.shared.joined_channels.lock().unwrap();
        if joined {
            channels.insert(channel_name.to_string());
        } else {
            channels.remove(channel_name);
        }
    }

    fn emit(&self, event: Event) {
        let _ = self.shared.event_tx.send(event);
    }
}

// ── Actor ───────────────────────────────────────────────────────────

struct Actor {
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<Event>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    reader: Option<TransportReader>,
    writer: Option<TransportWriter>,
    queue: PendingQueue,
    head_delay: EditableDelay,
    /// `(delay generation, awaiter id)` the head delay is armed for.
    armed_for: Option<(u64, u64)>,
    pre_setup: bool,
    next_ping: Instant,
    line_buf: String,
}

impl Actor {
    async fn run(mut self) {
        loop {
            let pings_active = self.pings_active();
            let next_ping = self.next_ping;
            tokio::select! {
                // commands drain before new lines are read: an awaiter
                // registered right after its command was written must be
                // in the queue before the response can arrive
                biased;
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command).await.is_break() {
                                break;
                            }
                        }
                        // every handle is gone; nobody can observe this
                        // connection anymore
                        None => {
                            self.finish_clean();
                            break;
                        }
                    }
                }
                line = Self::next_line(&mut self.reader, &mut self.line_buf) => {
                    match line {
                        Ok(Some(line)) => {
                            if self.handle_line(line).await.is_break() {
                                break;
                            }
                        }
                        Ok(None) => {
                            self.finish_clean();
                            break;
                        }
                        Err(io) => {
                            self.fatal(transport_error(io));
                            break;
                        }
                    }
                }
                // wait() pends forever while the delay is disarmed; a
                // wakeup from a stale arming is ignored
                fired = self.head_delay.wait() => {
                    if self.armed_for.map(|(generation, _)| generation) == Some(fired) {
                        self.armed_for = None;
                        let error = self.queue.timeout_head();
                        self.sync_head_timer();
                        if let Some(error) = error {
                            if error.is_fatal() {
                                self.fatal(error);
                                break;
                            }
                        }
                    }
                }
                _ = sleep_until(next_ping), if pings_active => {
                    self.next_ping = Instant::now() + self.shared.config.ping_interval;
                    let conn = Connection { shared: Arc::clone(&self.shared) };
                    tokio::spawn(async move {
                        // a missing PONG rejects the awaiter with a
                        // fatal ping timeout, which closes the
                        // connection; nothing to do with the result here
                        let _ = operations::ping::send_ping(&conn, None).await;
                    });
                }
            }
        }
    }

    async fn next_line(
        reader: &mut Option<TransportReader>,
        buf: &mut String,
    ) -> std::io::Result<Option<String>> {
        let Some(reader) = reader.as_mut() else {
            return std::future::pending().await;
        };
        buf.clear();
        let n = reader.read_line(buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
        }
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Attach {
                reader,
                writer,
                pre_setup,
            } => {
                self.reader = Some(reader);
                self.writer = Some(writer);
                self.pre_setup = pre_setup;
                self.set_state(ConnectionState::Connected);
                self.emit(Event::Connected);
                if pre_setup {
                    self.set_state(ConnectionState::Ready);
                    self.emit(Event::Ready);
                }
                ControlFlow::Continue(())
            }
            Command::Ready => {
                if self.state() == ConnectionState::Connected {
                    self.set_state(ConnectionState::Ready);
                    self.emit(Event::Ready);
                    self.next_ping = Instant::now() + self.shared.config.ping_interval;
                }
                ControlFlow::Continue(())
            }
            Command::SendRaw(command) => self.write_line(&command).await,
            Command::Register(awaiter) => {
                self.queue.push(awaiter);
                self.sync_head_timer();
                ControlFlow::Continue(())
            }
            Command::PendingCount(reply) => {
                let _ = reply.send(self.queue.len());
                ControlFlow::Continue(())
            }
            Command::Close => {
                self.finish_clean();
                ControlFlow::Break(())
            }
            Command::Fail(error) => {
                self.fatal(error);
                ControlFlow::Break(())
            }
        }
    }

    async fn handle_line(&mut self, line: String) -> ControlFlow<()> {
        // empty lines are allowed in IRC
        if line.is_empty() {
            return ControlFlow::Continue(());
        }

        tracing::debug!(connection_id = self.shared.connection_id, "< {line}");

        let message = match Message::parse(&line) {
            Ok(message) => message,
            Err(parse_error) => {
                // surfaced, but never kills the read loop
                self.emit(Event::Error(ChatError::with_cause(
                    ErrorKind::Protocol,
                    format!("Error while parsing IRC message from line \"{line}\""),
                    ChatError::external(&parse_error),
                )));
                return ControlFlow::Continue(());
            }
        };

        if message.command == "PING" {
            let token = message.last_param().unwrap_or("").to_string();
            if self.write_line(&format!("PONG :{token}")).await.is_break() {
                return ControlFlow::Break(());
            }
        }

        let rejections = self.queue.on_message(&message);
        self.sync_head_timer();

        let is_reconnect = message.command == "RECONNECT";
        let raw_source = message.raw_source.clone();

        // awaiters observe the stream, they never swallow it
        self.emit(Event::Message(message));

        if is_reconnect {
            self.fatal(ChatError::new(
                ErrorKind::Reconnect,
                format!("RECONNECT command received by server: {raw_source}"),
            ));
            return ControlFlow::Break(());
        }

        // operation failures stay private to their caller unless they
        // are connection-fatal
        if let Some(error) = rejections.into_iter().find(ChatError::is_fatal) {
            self.fatal(error);
            return ControlFlow::Break(());
        }

        ControlFlow::Continue(())
    }

    async fn write_line(&mut self, line: &str) -> ControlFlow<()> {
        let Some(writer) = self.writer.as_mut() else {
            self.emit(Event::Error(ChatError::new(
                ErrorKind::Validation,
                format!("Cannot send command before the transport is connected: {line}"),
            )));
            return ControlFlow::Continue(());
        };
        let mut data = line.to_string();
        data.push_str("\r\n");
        match writer.write_all(data.as_bytes()).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(io) => {
                self.fatal(transport_error(io));
                ControlFlow::Break(())
            }
        }
    }

    /// Keep the head timeout in lockstep with the queue: the delay is
    /// armed exactly when an awaiter with a timeout becomes head, and
    /// never re-armed while the same awaiter stays head.
    fn sync_head_timer(&mut self) {
        let head = self.queue.head_id();
        if self.armed_for.is_some_and(|(_, id)| Some(id) != head) {
            self.head_delay.stop();
            self.armed_for = None;
        }
        if self.armed_for.is_none() {
            if let (Some(id), Some(timeout)) = (head, self.queue.head_timeout()) {
                let generation = self.head_delay.arm(timeout);
                self.armed_for = Some((generation, id));
            }
        }
    }

    /// Fatal error cascade. Runs at most once: emits the error, rejects
    /// every pending awaiter with it as the cause, emits the terminal
    /// close, and drops the transport.
    fn fatal(&mut self, error: ChatError) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        self.emit(Event::Error(error.clone()));
        self.head_delay.stop();
        self.armed_for = None;
        // the cascade rejections all wrap this same error; emitting
        // each of them again would only repeat it
        let _ = self.queue.fail_all(&error);
        if error.any_cause_is(ErrorKind::Reconnect) {
            self.emit(Event::Reconnect);
        }
        self.set_state(ConnectionState::Closed);
        self.emit(Event::Close(Some(error)));
        self.reader = None;
        self.writer = None;
    }

    /// Clean close. Pending awaiters resolve per their no-response
    /// action; their rejections are not emitted after the close.
    fn finish_clean(&mut self) {
        if self.state() == ConnectionState::Closed {
            return;
        }
        self.head_delay.stop();
        self.armed_for = None;
        let _ = self.queue.close_all();
        self.set_state(ConnectionState::Closed);
        self.emit(Event::Close(None));
        self.reader = None;
        self.writer = None;
    }

    fn pings_active(&self) -> bool {
        self.state() == ConnectionState::Ready && !self.pre_setup
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.shared.state.lock().unwrap() = state;
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

// ── Convenience operations ──────────────────────────────────────────

impl Connection {
    /// Join a channel. See [`operations::join::join_channel`].
    pub async fn join(&self, channel_name: &str) -> Result<(), ChatError> {
        operations::join::join_channel(self, channel_name)
            .await
            .map(|_| ())
    }

    /// Leave a channel. See [`operations::part::part_channel`].
    pub async fn part(&self, channel_name: &str) -> Result<(), ChatError> {
        operations::part::part_channel(self, channel_name)
            .await
            .map(|_| ())
    }

    /// Ping the server and wait for the matching PONG.
    pub async fn ping(&self) -> Result<(), ChatError> {
        operations::ping::send_ping(self, None).await.map(|_| ())
    }

    /// Say a message in a channel and wait for the server to confirm.
    pub async fn say(&self, channel_name: &str, message: &str) -> Result<(), ChatError> {
        operations::say::say(self, channel_name, message)
            .await
            .map(|_| ())
    }

    /// Send an action (`/me`) message to a channel.
    pub async fn me(&self, channel_name: &str, message: &str) -> Result<(), ChatError> {
        operations::say::me(self, channel_name, message)
            .await
            .map(|_| ())
    }

    /// Send a raw PRIVMSG without waiting for confirmation.
    pub fn privmsg(&self, channel_name: &str, message: &str) -> Result<(), ChatError> {
        operations::privmsg::send_privmsg(self, channel_name, message)
    }

    /// Whisper a user. Twitch sends no positive confirmation, so this
    /// resolves unless a failure notice arrives in time.
    pub async fn whisper(&self, username: &str, message: &str) -> Result<(), ChatError> {
        operations::whisper::whisper(self, username, message).await
    }
}
