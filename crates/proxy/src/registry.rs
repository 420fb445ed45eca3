//! Protocol-id to handler-constructor registry.
//!
//! Protocols register themselves during initialization; the dispatcher looks
//! constructors up per connection. Entries are append-only: a duplicate id is
//! a configuration error and never silently overwrites the existing entry.

use std::{collections::HashMap, sync::Arc};

use derive_more::derive::{Deref, Display, From};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::handler::{InboundHandler, OutboundHandler};

/// Opaque protocol key, unique within each registry namespace.
#[derive(Debug, Display, From, Deref, Clone, Hash, PartialEq, Eq)]
pub struct ProtocolId(String);

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Startup configuration conflict; fatal for the protocol being wired in.
    #[error("protocol {0} already registered")]
    Duplicate(ProtocolId),
    /// Lookup miss; the connection asking for this protocol cannot be served.
    #[error("unknown protocol {0}")]
    UnknownProtocol(ProtocolId),
    /// The protocol's constructor rejected its configuration.
    #[error("handler construction failed: {0}")]
    Construction(#[source] anyhow::Error),
    #[error("bad handler config: {0}")]
    BadConfig(#[source] bincode::Error),
}

pub type InboundFactory<Ctx> = Arc<dyn Fn(&Ctx, &[u8]) -> Result<Box<dyn InboundHandler>, RegistryError> + Send + Sync>;
pub type OutboundFactory<Ctx> = Arc<dyn Fn(&Ctx, &[u8]) -> Result<Box<dyn OutboundHandler>, RegistryError> + Send + Sync>;

/// Decode an opaque per-protocol config value. The registry never inspects
/// the bytes; only the constructor registered under the matching protocol id
/// knows the schema.
pub fn decode_config<T: DeserializeOwned>(raw: &[u8]) -> Result<T, RegistryError> {
    bincode::deserialize(raw).map_err(RegistryError::BadConfig)
}

pub fn encode_config<T: Serialize>(config: &T) -> Vec<u8> {
    bincode::serialize(config).expect("config should serialize")
}

/// Maps protocol identifiers to handler constructors, one namespace per
/// handler kind. Owned by the application and passed by reference to whoever
/// registers or looks up; registration takes the write lock, per-connection
/// lookups share the read lock.
pub struct HandlerRegistry<Ctx> {
    inbound: RwLock<HashMap<ProtocolId, InboundFactory<Ctx>>>,
    outbound: RwLock<HashMap<ProtocolId, OutboundFactory<Ctx>>>,
}

impl<Ctx> Default for HandlerRegistry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> HandlerRegistry<Ctx> {
    pub fn new() -> Self {
        Self {
            inbound: RwLock::new(HashMap::new()),
            outbound: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_inbound<F>(&self, id: impl Into<ProtocolId>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&Ctx, &[u8]) -> Result<Box<dyn InboundHandler>, RegistryError> + Send + Sync + 'static,
    {
        let id = id.into();
        let mut inbound = self.inbound.write();
        if inbound.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        log::debug!("[HandlerRegistry] registered inbound protocol {id}");
        inbound.insert(id, Arc::new(factory));
        Ok(())
    }

    pub fn register_outbound<F>(&self, id: impl Into<ProtocolId>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&Ctx, &[u8]) -> Result<Box<dyn OutboundHandler>, RegistryError> + Send + Sync + 'static,
    {
        let id = id.into();
        let mut outbound = self.outbound.write();
        if outbound.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        log::debug!("[HandlerRegistry] registered outbound protocol {id}");
        outbound.insert(id, Arc::new(factory));
        Ok(())
    }

    pub fn create_inbound(&self, id: &ProtocolId, ctx: &Ctx, config: &[u8]) -> Result<Box<dyn InboundHandler>, RegistryError> {
        // construct outside the table lock; constructors may do real work
        let factory = self.inbound.read().get(id).cloned().ok_or_else(|| RegistryError::UnknownProtocol(id.clone()))?;
        factory(ctx, config)
    }

    pub fn create_outbound(&self, id: &ProtocolId, ctx: &Ctx, config: &[u8]) -> Result<Box<dyn OutboundHandler>, RegistryError> {
        let factory = self.outbound.read().get(id).cloned().ok_or_else(|| RegistryError::UnknownProtocol(id.clone()))?;
        factory(ctx, config)
    }
}
