//! Protocol layer of the switchyard proxy: polymorphic handler contracts and
//! the factory registry that constructs them from configuration.
//!
//! Concrete protocols (VMess-like, SOCKS, HTTP, ...) implement
//! [`InboundHandler`] or [`OutboundHandler`] and register a constructor under
//! their [`ProtocolId`] at initialization; the dispatcher then builds
//! handlers through [`HandlerRegistry`] without ever importing a
//! protocol-specific type.

mod handler;
mod registry;

pub use handler::{DestHost, Destination, InboundHandler, OutboundHandler};
pub use registry::{decode_config, encode_config, HandlerRegistry, InboundFactory, OutboundFactory, ProtocolId, RegistryError};
