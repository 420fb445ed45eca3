//! WebSocket binding for the frame seam.
//!
//! Binary frames are proxy payload; everything else on the wire is control
//! noise. Text frames are not payload and are dropped, pings are answered by
//! tungstenite itself, and a close frame ends the stream.

use std::{
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::{
    tungstenite::{Error as WsError, Message},
    WebSocketStream,
};
use tokio_util::bytes::Bytes;

use crate::frame::FrameStream;

/// `FrameIo` view of an upgraded websocket.
pub struct WsFrameIo<S> {
    ws: WebSocketStream<S>,
}

/// Stream connection over a websocket transport.
pub type WsStream<S> = FrameStream<WsFrameIo<S>>;

/// Wrap an upgraded websocket into a stream connection.
///
/// The handshake consumes the socket, so the listener or dialer captures the
/// endpoint addresses beforehand and passes them in; use
/// [`crate::UNSPECIFIED_ADDR`] when the underlying transport has none.
pub fn ws_stream<S>(ws: WebSocketStream<S>, local: SocketAddr, remote: SocketAddr) -> WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    FrameStream::new(WsFrameIo { ws }, local, remote)
}

fn ws_err(err: WsError) -> io::Error {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => io::ErrorKind::BrokenPipe.into(),
        WsError::Io(err) => err,
        other => io::Error::other(other),
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Stream for WsFrameIo<S> {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.ws).poll_next(cx) {
                Poll::Ready(Some(Ok(msg))) => match msg {
                    Message::Binary(payload) => return Poll::Ready(Some(Ok(payload))),
                    Message::Text(text) => {
                        log::warn!("[WsFrameIo] dropping {}-byte text frame, payload is binary-only", text.len());
                        continue;
                    }
                    // tungstenite queues the pong reply itself
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                    Message::Close(_) => return Poll::Ready(None),
                },
                Poll::Ready(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => return Poll::Ready(None),
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(ws_err(err)))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Sink<Bytes> for WsFrameIo<S> {
    type Error = io::Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().ws).poll_ready(cx).map_err(ws_err)
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        Pin::new(&mut self.get_mut().ws).start_send(Message::Binary(item)).map_err(ws_err)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().ws).poll_flush(cx).map_err(ws_err)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // the closing handshake racing the peer's own close is not a failure
        match Pin::new(&mut self.get_mut().ws).poll_close(cx) {
            Poll::Ready(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => Poll::Ready(Ok(())),
            Poll::Ready(res) => Poll::Ready(res.map_err(ws_err)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::SinkExt;
    use test_log::test;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio_tungstenite::{accept_async, client_async};

    use super::*;
    use crate::stream::{StreamConnection, UNSPECIFIED_ADDR};

    async fn ws_pair() -> (WsStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { accept_async(server_io).await.expect("should accept") });
        let (client_ws, _response) = client_async("ws://localhost/", client_io).await.expect("should handshake");
        let server_ws = server.await.expect("should join");
        (ws_stream(client_ws, UNSPECIFIED_ADDR, UNSPECIFIED_ADDR), server_ws)
    }

    #[test(tokio::test)]
    async fn binary_frames_concatenate_into_the_byte_stream() {
        let (mut client, mut server_ws) = ws_pair().await;
        server_ws.send(Message::Binary(Bytes::from_static(b"AAAAA"))).await.expect("should send");
        server_ws.send(Message::Binary(Bytes::new())).await.expect("should send");
        server_ws.send(Message::Binary(Bytes::from_static(b"BBBBBBB"))).await.expect("should send");

        let mut out = vec![0u8; 12];
        client.read_exact(&mut out).await.expect("should read");
        assert_eq!(out, b"AAAAABBBBBBB");
    }

    #[test(tokio::test)]
    async fn text_frames_are_not_payload() {
        let (mut client, mut server_ws) = ws_pair().await;
        server_ws.send(Message::Text("not payload".into())).await.expect("should send");
        server_ws.send(Message::Binary(Bytes::from_static(b"data"))).await.expect("should send");

        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.expect("should read");
        assert_eq!(&buf, b"data");
    }

    #[test(tokio::test)]
    async fn writes_arrive_as_single_binary_frames() {
        let (mut client, mut server_ws) = ws_pair().await;
        client.write_all(b"first").await.expect("should write");
        client.flush().await.expect("should flush");
        client.write_all(b"second-frame").await.expect("should write");
        client.flush().await.expect("should flush");

        use futures::StreamExt;
        let msg = server_ws.next().await.expect("should have frame").expect("should recv");
        assert_eq!(msg, Message::Binary(Bytes::from_static(b"first")));
        let msg = server_ws.next().await.expect("should have frame").expect("should recv");
        assert_eq!(msg, Message::Binary(Bytes::from_static(b"second-frame")));
    }

    #[test(tokio::test)]
    async fn peer_close_ends_the_stream() {
        let (mut client, mut server_ws) = ws_pair().await;
        server_ws.send(Message::Binary(Bytes::from_static(b"tail"))).await.expect("should send");
        server_ws.close(None).await.expect("should close");

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.expect("should drain");
        assert_eq!(out, b"tail");
    }

    #[test(tokio::test)]
    async fn close_completes_the_handshake_and_is_idempotent() {
        let (mut client, mut server_ws) = ws_pair().await;

        // drive the server side so the close handshake can complete
        let server = tokio::spawn(async move {
            use futures::StreamExt;
            while let Some(msg) = server_ws.next().await {
                if msg.is_err() {
                    break;
                }
            }
        });

        client.close().await.expect("first close should succeed");
        client.close().await.expect("second close should be a no-op");

        let mut buf = [0u8; 1];
        let err = client.read(&mut buf).await.expect_err("read after close should fail");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        server.await.expect("should join");
    }
}
