//! Transport core for the switchyard proxy: one uniform stream-connection
//! contract over heterogeneous wire transports.
//!
//! Protocol handlers program against [`StreamConnection`] and never see the
//! transport underneath. Byte-stream transports (TCP, TLS) enter the contract
//! through [`DeadlineStream`], split-half tunnels (QUIC) through
//! [`JoinedStream`], and message-oriented transports (WebSocket) through
//! [`FrameStream`], which flattens discrete frames into a continuous byte
//! sequence.

use std::time::Duration;

mod deadline;
mod error;
mod frame;
mod stream;

#[cfg(feature = "quic")]
pub mod quic;
pub mod ws;

pub use error::TransportError;
pub use frame::{FrameIo, FrameStream};
pub use stream::{DeadlineStream, JoinedStream, StreamConnection, UNSPECIFIED_ADDR};

/// Bounded wait for the peer to acknowledge a graceful close before the
/// underlying transport is released regardless.
pub(crate) const GRACEFUL_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
