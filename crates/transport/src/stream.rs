//! Stream connection contract shared by every transport and protocol handler.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
    time::Instant,
};

use crate::{deadline::Deadline, error::TransportError, GRACEFUL_CLOSE_TIMEOUT};

/// Stable placeholder endpoint for transports with no native peer identity.
pub const UNSPECIFIED_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));

/// One established, bidirectional, ordered byte-stream channel.
///
/// Reads and writes go through the `AsyncRead`/`AsyncWrite` impls; a clean
/// peer close surfaces as a zero-byte read completion. After an armed
/// deadline elapses, every blocked or subsequent operation on that direction
/// fails with an `io::ErrorKind::TimedOut` error until a later deadline is
/// set; `None` disables the deadline. `close` is idempotent and never blocks
/// past a bounded graceful-close wait; once closed, reads and writes fail
/// deterministically.
#[async_trait::async_trait]
pub trait StreamConnection: AsyncRead + AsyncWrite + Send + Unpin {
    fn local_addr(&self) -> SocketAddr;
    fn remote_addr(&self) -> SocketAddr;

    fn set_read_deadline(&mut self, deadline: Option<Instant>);
    fn set_write_deadline(&mut self, deadline: Option<Instant>);

    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    async fn close(&mut self) -> io::Result<()>;
}

/// Joins an independent read half and write half into one connection, for
/// transports which hand out their directions separately (QUIC-like tunnels).
pub struct JoinedStream<R, W> {
    read: R,
    write: W,
    local: SocketAddr,
    remote: SocketAddr,
    read_deadline: Deadline,
    write_deadline: Deadline,
    closed: bool,
}

impl<R, W> JoinedStream<R, W> {
    pub fn new(read: R, write: W) -> Self {
        Self {
            read,
            write,
            local: UNSPECIFIED_ADDR,
            remote: UNSPECIFIED_ADDR,
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
            closed: false,
        }
    }

    pub fn with_addrs(mut self, local: SocketAddr, remote: SocketAddr) -> Self {
        self.local = local;
        self.remote = remote;
        self
    }
}

impl<R: AsyncRead + Unpin, W: Unpin> AsyncRead for JoinedStream<R, W> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        if this.read_deadline.poll_expired(cx).is_ready() {
            return Poll::Ready(Err(TransportError::Timeout.into()));
        }
        Pin::new(&mut this.read).poll_read(cx, buf)
    }
}

impl<R: Unpin, W: AsyncWrite + Unpin> AsyncWrite for JoinedStream<R, W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        if this.write_deadline.poll_expired(cx).is_ready() {
            return Poll::Ready(Err(TransportError::Timeout.into()));
        }
        Pin::new(&mut this.write).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.write).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        match Pin::new(&mut this.write).poll_shutdown(cx) {
            Poll::Ready(res) => {
                this.closed = true;
                Poll::Ready(res)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[async_trait::async_trait]
impl<R, W> StreamConnection for JoinedStream<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
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
        match tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, self.write.shutdown()).await {
            Ok(res) => res,
            Err(_) => {
                log::warn!("[JoinedStream] graceful shutdown timed out, releasing transport");
                Ok(())
            }
        }
    }
}

/// Lifts a plain byte-stream transport (TCP, TLS) into the connection
/// contract: deadline enforcement, endpoint identity, idempotent close.
pub struct DeadlineStream<S> {
    inner: S,
    local: SocketAddr,
    remote: SocketAddr,
    read_deadline: Deadline,
    write_deadline: Deadline,
    closed: bool,
}

impl<S> DeadlineStream<S> {
    pub fn new(inner: S, local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            inner,
            local,
            remote,
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
            closed: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl DeadlineStream<TcpStream> {
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let local = stream.local_addr()?;
        let remote = stream.peer_addr()?;
        Ok(Self::new(stream, local, remote))
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for DeadlineStream<S> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        if this.read_deadline.poll_expired(cx).is_ready() {
            return Poll::Ready(Err(TransportError::Timeout.into()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for DeadlineStream<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Err(TransportError::Closed.into()));
        }
        if this.write_deadline.poll_expired(cx).is_ready() {
            return Poll::Ready(Err(TransportError::Timeout.into()));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(res) => {
                this.closed = true;
                Poll::Ready(res)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[async_trait::async_trait]
impl<S: AsyncRead + AsyncWrite + Send + Unpin> StreamConnection for DeadlineStream<S> {
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
        match tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, self.inner.shutdown()).await {
            Ok(res) => res,
            Err(_) => {
                log::warn!("[DeadlineStream] graceful shutdown timed out, releasing transport");
                Ok(())
            }
        }
    }
}
