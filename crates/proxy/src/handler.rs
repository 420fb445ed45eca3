//! Handler contracts the dispatcher depends on.

use std::{fmt::Display, net::IpAddr};

use serde::{Deserialize, Serialize};
use transport::StreamConnection;

/// Target endpoint of a proxied connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub host: DestHost,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestHost {
    Domain(String),
    Ip(IpAddr),
}

impl Destination {
    pub fn domain(domain: impl Into<String>, port: u16) -> Self {
        Self {
            host: DestHost::Domain(domain.into()),
            port,
        }
    }

    pub fn ip(ip: IpAddr, port: u16) -> Self {
        Self { host: DestHost::Ip(ip), port }
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.host {
            DestHost::Domain(domain) => write!(f, "{domain}:{}", self.port),
            DestHost::Ip(ip) => write!(f, "{ip}:{}", self.port),
        }
    }
}

/// Serves the accepting side of a proxied connection.
///
/// Lifecycle: constructed via the registry, then `serve` once per accepted
/// connection (each on its own task), then `close` when the listener winds
/// down. A failed session is local to that connection; `serve` returning an
/// error must never take the process down.
#[async_trait::async_trait]
pub trait InboundHandler: Send + Sync {
    /// Serve one accepted connection until the session ends.
    async fn serve(&self, conn: Box<dyn StreamConnection>) -> anyhow::Result<()>;

    /// Stop taking new sessions; in-flight ones wind down on their own.
    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Serves the dialing side of a proxied connection.
#[async_trait::async_trait]
pub trait OutboundHandler: Send + Sync {
    /// Open the upstream leg toward `dest` for the dispatcher to relay into.
    async fn dial(&self, dest: Destination) -> anyhow::Result<Box<dyn StreamConnection>>;

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
