//! Transports a connection can run over.
//!
//! Twitch chat is plain TCP on 6667 and TLS on 6697; the in-memory
//! duplex variant exists for tests and for embedding (an already
//! established stream, optionally pre-set-up so the connection skips
//! capability negotiation and login).

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, BufReader, DuplexStream};
use tokio::net::TcpStream;
use tokio_rustls::{rustls, TlsConnector};

use crate::error::{ChatError, ErrorKind};

/// Message prefix for every error originating in the transport.
pub(crate) const TRANSPORT_ERROR: &str = "Error occurred in transport layer";

pub(crate) type TransportReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
pub(crate) type TransportWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where a connection's bytes come from and go to.
pub enum TransportKind {
    /// Plain TCP, e.g. `irc.chat.twitch.tv:6667`.
    Tcp { host: String, port: u16 },
    /// TLS over TCP, e.g. `irc.chat.twitch.tv:6697`.
    Tls { host: String, port: u16 },
    /// An in-process stream. With `pre_setup` the connection treats the
    /// stream as already negotiated and logged in.
    Duplex {
        stream: DuplexStream,
        pre_setup: bool,
    },
}

impl TransportKind {
    /// The default Twitch chat endpoint (TLS).
    pub fn twitch() -> Self {
        TransportKind::Tls {
            host: "irc.chat.twitch.tv".to_string(),
            port: 6697,
        }
    }

    pub(crate) fn is_pre_setup(&self) -> bool {
        matches!(self, TransportKind::Duplex { pre_setup: true, .. })
    }

    /// Establish the transport and split it into buffered reader and
    /// writer halves.
    pub(crate) async fn connect(self) -> Result<(TransportReader, TransportWriter), ChatError> {
        match self {
            TransportKind::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), port))
                    .await
                    .map_err(transport_error)?;
                Ok(split_boxed(stream))
            }
            TransportKind::Tls { host, port } => {
                let stream = TcpStream::connect((host.as_str(), port))
                    .await
                    .map_err(transport_error)?;
                let connector = TlsConnector::from(Arc::new(rustls_client_config()));
                let server_name = rustls::pki_types::ServerName::try_from(host.clone())
                    .map_err(transport_error)?;
                let tls_stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(transport_error)?;
                Ok(split_boxed(tls_stream))
            }
            TransportKind::Duplex { stream, .. } => Ok(split_boxed(stream)),
        }
    }
}

fn split_boxed<S>(stream: S) -> (TransportReader, TransportWriter)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    (
        BufReader::new(Box::new(reader) as Box<dyn AsyncRead + Send + Unpin>),
        Box::new(writer),
    )
}

pub(crate) fn transport_error(error: impl std::error::Error + 'static) -> ChatError {
    ChatError::with_cause(
        ErrorKind::Connection,
        TRANSPORT_ERROR,
        ChatError::external(&error),
    )
}

fn rustls_client_config() -> rustls::ClientConfig {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
