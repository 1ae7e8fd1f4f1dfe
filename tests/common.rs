#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use tracing::Span;

use mwtool::broker::{BrokerError, Connection, Connector, Discovery};
use mwtool::{InboundMessage, Server};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = mwtool::logging::init_logging_with("debug");
    });
}

/// Output sink shared between a test and the subscription writing into it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer whose every write fails, like stdout piped into a closed reader.
pub struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeCall {
    pub consumer: String,
    pub topic: String,
    pub queue_group: String,
}

#[derive(Default)]
struct FakeState {
    delivery: Mutex<Option<flume::Sender<InboundMessage>>>,
    subscribe_calls: AtomicUsize,
    connect_calls: AtomicUsize,
    last_subscribe: Mutex<Option<SubscribeCall>>,
    identity: Mutex<Option<String>>,
}

/// In-memory broker standing in for discovery, connector and connection.
#[derive(Clone, Default)]
pub struct FakeBroker {
    state: Arc<FakeState>,
    fail_discovery: bool,
    fail_connect: bool,
    reject_subscribe: bool,
    drop_delivery: bool,
    preload: Vec<InboundMessage>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn rejecting_subscribe(mut self) -> Self {
        self.reject_subscribe = true;
        self
    }

    /// Drop the delivery sender right after subscribing.
    pub fn dropping_delivery(mut self) -> Self {
        self.drop_delivery = true;
        self
    }

    /// Messages queued into the delivery channel during subscribe.
    pub fn with_preloaded(mut self, msgs: Vec<InboundMessage>) -> Self {
        self.preload = msgs;
        self
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn delivery(&self) -> Option<flume::Sender<InboundMessage>> {
        self.state.delivery.lock().unwrap().clone()
    }

    pub fn last_subscribe(&self) -> Option<SubscribeCall> {
        self.state.last_subscribe.lock().unwrap().clone()
    }

    pub fn identity(&self) -> Option<String> {
        self.state.identity.lock().unwrap().clone()
    }

    /// Push a message the way the connection's delivery task would.
    pub async fn publish(&self, subject: &str, payload: &str) {
        let tx = self.delivery().expect("no active subscription");
        tx.send_async(InboundMessage::new(subject, payload.as_bytes().to_vec()))
            .await
            .expect("delivery channel closed");
    }
}

#[async_trait]
impl Discovery for FakeBroker {
    async fn list_servers(&self) -> Result<Vec<Server>, BrokerError> {
        if self.fail_discovery {
            return Err(BrokerError::Other("discovery unavailable".into()));
        }
        Ok(vec![Server::new("fake", 4222)])
    }
}

#[async_trait]
impl Connector for FakeBroker {
    async fn connect(
        &self,
        _servers: &[Server],
        identity: &str,
        _log: Span,
    ) -> Result<Box<dyn Connection>, BrokerError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.identity.lock().unwrap() = Some(identity.to_string());

        if self.fail_connect {
            return Err(BrokerError::Other("connection refused".into()));
        }
        Ok(Box::new(FakeConnection {
            broker: self.clone(),
        }))
    }
}

struct FakeConnection {
    broker: FakeBroker,
}

#[async_trait]
impl Connection for FakeConnection {
    fn connected_server(&self) -> String {
        "fake:4222".to_string()
    }

    async fn queue_subscribe(
        &self,
        consumer: &str,
        topic: &str,
        queue_group: &str,
        delivery: flume::Sender<InboundMessage>,
    ) -> Result<(), BrokerError> {
        let state = &self.broker.state;
        state.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *state.last_subscribe.lock().unwrap() = Some(SubscribeCall {
            consumer: consumer.to_string(),
            topic: topic.to_string(),
            queue_group: queue_group.to_string(),
        });

        if self.broker.reject_subscribe {
            return Err(BrokerError::Rejected {
                code: 403,
                message: "denied".into(),
            });
        }

        for msg in &self.broker.preload {
            let _ = delivery.try_send(msg.clone());
        }

        if !self.broker.drop_delivery {
            *state.delivery.lock().unwrap() = Some(delivery);
        }
        Ok(())
    }
}
