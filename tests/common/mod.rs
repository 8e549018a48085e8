//! Shared helpers: an in-memory connection with a scripted server side,
//! and error chain assertions.

#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;

use tmi_sdk::{ChatError, ClientConfig, Connection, ErrorKind, Event, TransportKind};

/// A connection running over an in-memory duplex stream, with the
/// server side scripted by the test.
pub struct FakeConnection {
    pub conn: Connection,
    pub events: mpsc::UnboundedReceiver<Event>,
    read: Option<BufReader<ReadHalf<DuplexStream>>>,
    write: Option<WriteHalf<DuplexStream>>,
}

impl FakeConnection {
    /// A pre-set-up connection (no capability/login traffic), with the
    /// startup events already consumed.
    pub async fn new() -> Self {
        let mut fake = Self::with_config(ClientConfig::default(), true).await;
        fake.expect_startup_events().await;
        fake
    }

    pub async fn with_config(config: ClientConfig, pre_setup: bool) -> Self {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (conn, events) = Connection::new(
            config,
            TransportKind::Duplex {
                stream: client_io,
                pre_setup,
            },
        );
        conn.connect().await.expect("connect should succeed");

        let (read, write) = tokio::io::split(server_io);
        Self {
            conn,
            events,
            read: Some(BufReader::new(read)),
            write: Some(write),
        }
    }

    /// Feed a line to the client as if the server had sent it.
    pub async fn emit(&mut self, line: &str) {
        let writer = self.write.as_mut().expect("server side already dropped");
        writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("emit failed");
    }

    /// Cleanly end the server side of the stream (EOF for the client).
    pub async fn end(&mut self) {
        if let Some(mut writer) = self.write.take() {
            writer.shutdown().await.expect("shutdown failed");
        }
    }

    pub async fn emit_and_end(&mut self, lines: &[&str]) {
        for line in lines {
            self.emit(line).await;
        }
        self.end().await;
    }

    /// Tear down the server side without a clean shutdown, so the next
    /// client write fails with a transport error.
    pub fn drop_server(&mut self) {
        self.read = None;
        self.write = None;
    }

    /// The next line the client wrote, terminator included.
    pub async fn next_data(&mut self) -> String {
        let reader = self.read.as_mut().expect("server side already dropped");
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), reader.read_line(&mut line))
            .await
            .expect("timed out waiting for wire data")
            .expect("read failed");
        assert_ne!(n, 0, "client closed its write side");
        line
    }

    pub async fn expect_data(&mut self, expected: &str) {
        assert_eq!(self.next_data().await, expected);
    }

    pub async fn next_event(&mut self) -> Event {
        timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed")
    }

    async fn expect_startup_events(&mut self) {
        assert!(matches!(self.next_event().await, Event::Connecting));
        assert!(matches!(self.next_event().await, Event::Connected));
        assert!(matches!(self.next_event().await, Event::Ready));
    }
}

/// Let spawned tasks (the connection actor, operation futures) run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Assert an error's full causal chain: `(kind, rendered message)` per
/// link, outermost first. The rendered message of a link includes its
/// causes, mirroring how the errors display.
pub fn assert_error_chain(error: &ChatError, expected: &[(ErrorKind, &str)]) {
    let mut current = Some(error);
    for (depth, (kind, message)) in expected.iter().enumerate() {
        let link = current.unwrap_or_else(|| panic!("error chain ends early at depth {depth}"));
        assert_eq!(link.kind(), *kind, "wrong kind at depth {depth}");
        assert_eq!(&link.message(), message, "wrong message at depth {depth}");
        current = link.cause();
    }
    assert!(
        current.is_none(),
        "error chain is longer than the expected {} links",
        expected.len()
    );
}

/// Unwrap the error out of an `Event::Error`.
pub fn error_event(event: Event) -> ChatError {
    match event {
        Event::Error(error) => error,
        other => panic!("expected an error event, got {other:?}"),
    }
}
