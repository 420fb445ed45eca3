//! QUIC tunnel binding: a bidirectional QUIC stream as a stream connection.

use std::net::SocketAddr;

use quinn::{Connection, RecvStream, SendStream};

use crate::stream::{JoinedStream, UNSPECIFIED_ADDR};

/// Stream connection over one bidirectional QUIC stream.
pub type QuicStream = JoinedStream<RecvStream, SendStream>;

/// Wrap an accepted or opened bidirectional stream, carrying the parent
/// connection's endpoint identity. Individual streams have no socket of
/// their own, so the local port stays unspecified when the endpoint only
/// knows its IP.
pub fn quic_stream(connection: &Connection, recv: RecvStream, send: SendStream) -> QuicStream {
    let local = connection.local_ip().map(|ip| SocketAddr::new(ip, 0)).unwrap_or(UNSPECIFIED_ADDR);
    JoinedStream::new(recv, send).with_addrs(local, connection.remote_address())
}
