//! Topic subscription client.
//!
//! A run walks `Connecting → Subscribing → Streaming` and ends either on
//! cancellation (success) or on the first connect/subscribe failure. There is
//! no retry edge; reconnecting, if any, is the connector's business.

use std::io::Write;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::broker::{Connector, Discovery};
use crate::core::error::ToolError;
use crate::core::render::{render, RenderMode};

/// In-flight messages buffered between the connection and the receive loop.
pub const DEFAULT_DELIVERY_CAPACITY: usize = 100;

/// A configured, not yet running, subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    topic: String,
    mode: RenderMode,
    consumer_id: String,
    delivery_capacity: usize,
}

impl Subscription {
    /// Validate the topic and fix the render mode for the run.
    pub fn configure(topic: impl Into<String>, raw: bool) -> Result<Self, ToolError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(ToolError::Validation("a topic is required".to_string()));
        }

        Ok(Self {
            topic,
            mode: RenderMode::from_raw_flag(raw),
            consumer_id: Uuid::new_v4().simple().to_string(),
            delivery_capacity: DEFAULT_DELIVERY_CAPACITY,
        })
    }

    /// Override the delivery channel bound. Zero is clamped to one.
    pub fn with_delivery_capacity(mut self, capacity: usize) -> Self {
        self.delivery_capacity = capacity.max(1);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    pub fn delivery_capacity(&self) -> usize {
        self.delivery_capacity
    }

    /// Connect, subscribe and stream rendered messages into `out` until
    /// `cancel` fires.
    ///
    /// Returns `Ok(())` only on cancellation.
    pub async fn run<W>(
        &self,
        discovery: &dyn Discovery,
        connector: &dyn Connector,
        identity: &str,
        out: &mut W,
        cancel: CancellationToken,
    ) -> Result<(), ToolError>
    where
        W: Write + Send,
    {
        let span = info_span!("sub", topic = %self.topic);

        let servers = discovery.list_servers().await.map_err(ToolError::Connect)?;
        debug!(parent: &span, candidates = servers.len(), "resolved middleware servers");

        let conn = connector
            .connect(&servers, identity, span.clone())
            .await
            .map_err(ToolError::Connect)?;

        if !self.mode.is_raw() {
            writeln!(
                out,
                "Waiting for messages from topic {} on {}",
                self.topic,
                conn.connected_server()
            )?;
            out.flush()?;
        }

        let (tx, rx) = flume::bounded(self.delivery_capacity);

        conn.queue_subscribe(&self.consumer_id, &self.topic, "", tx)
            .await
            .map_err(|source| ToolError::Subscribe {
                topic: self.topic.clone(),
                source,
            })?;
        info!(parent: &span, consumer = %self.consumer_id, "subscribed");

        let mut delivery_open = true;
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(parent: &span, "subscription cancelled");
                    return Ok(());
                }

                received = rx.recv_async(), if delivery_open => match received {
                    Ok(msg) => {
                        let text = render(self.mode, &self.topic, &msg, Local::now().time());
                        out.write_all(text.as_bytes())?;
                        out.flush()?;
                    }
                    Err(_) => {
                        // Keep waiting for the operator rather than exiting on our own.
                        warn!(parent: &span, "delivery channel closed by the connection");
                        delivery_open = false;
                    }
                },
            }
        }
    }
}
