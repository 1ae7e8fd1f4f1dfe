//! # Broker Module
//!
//! Capability interfaces the subscription client uses to reach the
//! middleware, plus the implementations shipped with the tool.
//!
//! - `discovery`: resolves the candidate server list (static, from config).
//! - `tcp`: connector speaking the length-prefixed frame protocol in
//!   [`crate::net`].
//!
//! The traits are the seam for test doubles: anything implementing
//! [`Discovery`], [`Connector`] and [`Connection`] can stand in for a real
//! broker.

pub mod discovery;
pub mod error;
pub mod tcp;

use async_trait::async_trait;
use tracing::Span;

use crate::core::message::InboundMessage;
use crate::core::server::Server;

pub use self::discovery::StaticDiscovery;
pub use self::error::BrokerError;
pub use self::tcp::{TcpConnection, TcpConnector};

/// Resolves the candidate broker addresses for one run.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<Server>, BrokerError>;
}

/// Opens a session to one of the candidate servers.
#[async_trait]
pub trait Connector: Send + Sync {
    /// `identity` is the stable client name presented to the broker and
    /// `log` is the span connection events are recorded under.
    async fn connect(
        &self,
        servers: &[Server],
        identity: &str,
        log: Span,
    ) -> Result<Box<dyn Connection>, BrokerError>;
}

/// A live session to a single broker.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Address of the server the session is attached to.
    fn connected_server(&self) -> String;

    /// Subscribe `consumer` to `topic`.
    ///
    /// Deliveries are pushed into `delivery` by the connection's own task.
    /// An empty `queue_group` means every message on the topic is delivered
    /// to this subscriber.
    async fn queue_subscribe(
        &self,
        consumer: &str,
        topic: &str,
        queue_group: &str,
        delivery: flume::Sender<InboundMessage>,
    ) -> Result<(), BrokerError>;
}
