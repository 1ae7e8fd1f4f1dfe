//! Connector for brokers speaking the framed TCP protocol.
//!
//! After the TCP connect a background reader task owns the read half of the
//! socket. It answers pings, hands ACK/NACK replies to whoever is waiting on
//! that correlation id, and pushes PUBLISH deliveries into the delivery
//! channel registered for the subscription. Deliveries use `send_async`, so a
//! full delivery channel stalls the reader until the consumer catches up.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::broker::{BrokerError, Connection, Connector};
use crate::config::MiddlewareConfig;
use crate::core::message::InboundMessage;
use crate::core::server::Server;
use crate::net::frame::{self, HEADER_LEN, LENGTH_FIELD_LEN};
use crate::net::{
    AuthPayload, Frame, FrameType, HelloPayload, NackPayload, PublishPayload, SubscribePayload,
};

const INITIAL_BUFFER_SIZE: usize = 8 * 1024;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    api_key: Option<String>,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_config(cfg: &MiddlewareConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout,
            api_key: cfg.api_key.clone(),
        }
    }

    async fn open(
        &self,
        server: &Server,
        identity: &str,
        log: &Span,
    ) -> Result<TcpConnection, BrokerError> {
        let stream = TcpStream::connect(server.target()).await?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        let shared = Arc::new(Shared::new(writer));
        let reader_task = tokio::spawn(read_loop(shared.clone(), reader).instrument(log.clone()));

        // Dropping `conn` on a failed handshake aborts the reader.
        let conn = TcpConnection {
            server: server.clone(),
            shared,
            reader_task,
        };

        conn.shared
            .request(FrameType::Hello, HelloPayload::new(identity).encode()?)
            .await?;

        if let Some(api_key) = &self.api_key {
            let payload = AuthPayload {
                api_key: api_key.clone(),
            }
            .encode()?;
            conn.shared.request(FrameType::Auth, payload).await?;
        }

        Ok(conn)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        servers: &[Server],
        identity: &str,
        log: Span,
    ) -> Result<Box<dyn Connection>, BrokerError> {
        if servers.is_empty() {
            return Err(BrokerError::NoServers);
        }

        let mut last_error = None;
        for server in servers {
            debug!(parent: &log, %server, "connecting to middleware");

            match tokio::time::timeout(self.connect_timeout, self.open(server, identity, &log)).await
            {
                Ok(Ok(conn)) => {
                    info!(parent: &log, %server, identity, "connected to middleware");
                    return Ok(Box::new(conn));
                }
                Ok(Err(err)) => {
                    warn!(parent: &log, %server, error = %err, "middleware server unavailable");
                    last_error = Some(err);
                }
                Err(_) => {
                    warn!(parent: &log, %server, "timed out connecting to middleware");
                    last_error = Some(BrokerError::Timeout(server.to_string()));
                }
            }
        }

        Err(BrokerError::NoServerReachable {
            attempted: servers.len(),
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

/// A session on one broker, released when dropped.
pub struct TcpConnection {
    server: Server,
    shared: Arc<Shared>,
    reader_task: JoinHandle<()>,
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[async_trait]
impl Connection for TcpConnection {
    fn connected_server(&self) -> String {
        self.server.to_string()
    }

    async fn queue_subscribe(
        &self,
        consumer: &str,
        topic: &str,
        queue_group: &str,
        delivery: flume::Sender<InboundMessage>,
    ) -> Result<(), BrokerError> {
        let payload = SubscribePayload {
            topic: topic.to_string(),
            queue_group: queue_group.to_string(),
            consumer: consumer.to_string(),
        }
        .encode()?;

        // The SUBSCRIBE correlation id doubles as the subscription id the
        // broker tags deliveries with, so register before sending.
        let id = self.shared.next_id();
        self.shared.subscriptions.insert(id, delivery);

        let result = self
            .shared
            .request_with_id(id, FrameType::Subscribe, payload)
            .await;
        if result.is_err() {
            self.shared.subscriptions.remove(&id);
        }
        result
    }
}

struct Shared {
    writer: Mutex<OwnedWriteHalf>,
    pending: DashMap<u64, oneshot::Sender<Frame>>,
    subscriptions: DashMap<u64, flume::Sender<InboundMessage>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: Mutex::new(writer),
            pending: DashMap::new(),
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Mark the session dead and release everyone waiting on it.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.clear();
        self.subscriptions.clear();
    }

    async fn send(&self, frame: &Frame) -> Result<(), BrokerError> {
        let mut buf =
            BytesMut::with_capacity(LENGTH_FIELD_LEN + HEADER_LEN + frame.payload.len());
        frame::encode_frame(frame, &mut buf)?;

        let mut writer = self.writer.lock().await;
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn request(&self, msg_type: FrameType, payload: Bytes) -> Result<(), BrokerError> {
        let id = self.next_id();
        self.request_with_id(id, msg_type, payload).await
    }

    /// Send a request and wait for its ACK or NACK.
    async fn request_with_id(
        &self,
        id: u64,
        msg_type: FrameType,
        payload: Bytes,
    ) -> Result<(), BrokerError> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(BrokerError::Closed);
        }

        if let Err(err) = self.send(&Frame::new(msg_type, id, payload)).await {
            self.pending.remove(&id);
            return Err(err);
        }

        let reply = rx.await.map_err(|_| BrokerError::Closed)?;
        match reply.msg_type {
            FrameType::Ack => Ok(()),
            FrameType::Nack => {
                let nack = NackPayload::decode(&reply.payload)?;
                Err(BrokerError::Rejected {
                    code: nack.code,
                    message: nack.message,
                })
            }
            other => Err(BrokerError::UnexpectedFrame(other)),
        }
    }

    async fn route(&self, frame: Frame) -> Result<(), BrokerError> {
        match frame.msg_type {
            FrameType::Ack | FrameType::Nack => match self.pending.remove(&frame.correlation_id) {
                Some((_, waiter)) => {
                    let _ = waiter.send(frame);
                }
                None => trace!(
                    correlation_id = frame.correlation_id,
                    "reply for unknown request"
                ),
            },
            FrameType::Publish => {
                let publish = PublishPayload::decode(&frame.payload)?;
                let delivery = self
                    .subscriptions
                    .get(&frame.correlation_id)
                    .map(|entry| entry.value().clone());

                match delivery {
                    Some(tx) => {
                        let msg = InboundMessage::new(publish.subject, publish.message);
                        if tx.send_async(msg).await.is_err() {
                            debug!(
                                subscription = frame.correlation_id,
                                "subscriber went away, dropping subscription"
                            );
                            self.subscriptions.remove(&frame.correlation_id);
                        }
                    }
                    None => trace!(
                        subscription = frame.correlation_id,
                        "delivery for unknown subscription"
                    ),
                }
            }
            FrameType::Ping => {
                self.send(&Frame::new(FrameType::Pong, frame.correlation_id, Bytes::new()))
                    .await?;
            }
            FrameType::Pong => trace!("pong"),
            other => return Err(BrokerError::UnexpectedFrame(other)),
        }
        Ok(())
    }
}

async fn read_loop(shared: Arc<Shared>, mut reader: OwnedReadHalf) {
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);

    match read_frames(&shared, &mut reader, &mut buf).await {
        Ok(()) => debug!("middleware closed the connection"),
        Err(err) => warn!(error = %err, "middleware connection failed"),
    }

    shared.close();
}

async fn read_frames(
    shared: &Shared,
    reader: &mut OwnedReadHalf,
    buf: &mut BytesMut,
) -> Result<(), BrokerError> {
    loop {
        while let Some(frame) = frame::try_decode_frame(buf)? {
            shared.route(frame).await?;
        }

        if reader.read_buf(buf).await? == 0 {
            return Ok(());
        }
    }
}
