//! Frame-to-stream adapter: presents a message-oriented transport as a
//! continuous byte stream.
//!
//! The transport side delivers discrete, fully buffered frames in arbitrary
//! sizes; the stream side reads them in arbitrary chunks. Chunking is
//! observationally invisible: the byte sequence is the exact concatenation of
//! the frame payloads, whatever buffer sizes the reader uses.

use std::{
    io,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Sink, SinkExt, Stream};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    time::Instant,
};
use tokio_util::bytes::{Buf, Bytes};

use crate::{deadline::Deadline, error::TransportError, stream::StreamConnection, GRACEFUL_CLOSE_TIMEOUT};

/// Message-transport seam consumed by [`FrameStream`]: a source of fully
/// buffered binary frame payloads and a sink of outbound frames. Frame-type
/// tagging and control frames are the concrete binding's concern (see the
/// `ws` module); the adapter only ever sees payload bytes.
pub trait FrameIo: Stream<Item = io::Result<Bytes>> + Sink<Bytes, Error = io::Error> + Send + Unpin {}

impl<T> FrameIo for T where T: Stream<Item = io::Result<Bytes>> + Sink<Bytes, Error = io::Error> + Send + Unpin {}

/// Stream-connection view over a [`FrameIo`] transport.
///
/// Reads drain the pending frame before fetching the next one; each write is
/// sent as exactly one frame, preserving caller-intended message boundaries
/// on the wire. Single reader and single writer per instance; concurrent
/// same-direction use is not part of the contract.
pub struct FrameStream<T> {
    io: T,
    // unconsumed tail of the current inbound frame
    pending: Bytes,
    local: SocketAddr,
    remote: SocketAddr,
    read_deadline: Deadline,
    write_deadline: Deadline,
    closed: bool,
}

impl<T: FrameIo> FrameStream<T> {
    pub fn new(io: T, local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            io,
            pending: Bytes::new(),
            local,
            remote,
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
            closed: false,
        }
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: FrameIo> AsyncRead for FrameStream<T> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        // a zero-capacity buffer must not trigger a transport fetch
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        loop {
            // checked every iteration so a run of back-to-back empty frames
            // still surfaces an armed deadline instead of spinning past it
            if this.read_deadline.poll_expired(cx).is_ready() {
                return Poll::Ready(Err(TransportError::Timeout.into()));
            }
            if !this.pending.is_empty() {
                let take = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending[..take]);
                this.pending.advance(take);
                return Poll::Ready(Ok(()));
            }
            match Pin::new(&mut this.io).poll_next(cx) {
                // an empty frame carries no payload; keep fetching instead of
                // reporting a spurious end-of-stream
                Poll::Ready(Some(Ok(frame))) => this.pending = frame,
                Poll::Ready(Some(Err(err))) => {
                    this.pending = Bytes::new();
                    return Poll::Ready(Err(err));
                }
                // only a genuine transport close ends the stream
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<T: FrameIo> AsyncWrite for FrameStream<T> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        if this.write_deadline.poll_expired(cx).is_ready() {
            return Poll::Ready(Err(TransportError::Timeout.into()));
        }
        match Pin::new(&mut this.io).poll_ready(cx)? {
            Poll::Ready(()) => {
                // one write call maps to exactly one frame, all of it or an error
                Pin::new(&mut this.io).start_send(Bytes::copy_from_slice(buf))?;
                Poll::Ready(Ok(buf.len()))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        match Pin::new(&mut this.io).poll_close(cx) {
            Poll::Ready(res) => {
                this.closed = true;
                Poll::Ready(res)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[async_trait::async_trait]
impl<T: FrameIo> StreamConnection for FrameStream<T> {
    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) {
        self.read_deadline.set(deadline);
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) {
        self.write_deadline.set(deadline);
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // best-effort graceful close signal; the transport is released
        // regardless once the bounded wait runs out
        match tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, self.io.close()).await {
            Ok(res) => res,
            Err(_) => {
                log::warn!("[FrameStream] graceful close timed out, releasing transport");
                Ok(())
            }
        }
    }
}
