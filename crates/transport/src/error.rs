use std::io;

use thiserror::Error;

/// Classified transport failures surfaced by stream adapters.
///
/// Callers of the `AsyncRead`/`AsyncWrite` surface receive these as
/// `io::Error` with the kind preserved, so upstream code can tell a retryable
/// timeout from a dead connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deadline elapsed")]
    Timeout,
    #[error("connection closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"),
            TransportError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"),
            TransportError::Io(err) => err,
            TransportError::Protocol(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
        }
    }
}
