//! In-process connector.
//!
//! The [`LoopbackServer`] half plays the broker: it answers the handshake,
//! remembers subscriptions, records every frame the client sends and lets
//! a test (or an offline demo) publish messages and drop the connection.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sortis_shared::{encode_body, Frame, SubscriptionId};

use super::{Connector, ConnectorEvent};
use crate::error::{TransportError, TransportResult};

#[derive(Debug)]
struct Broker {
    accepting: bool,
    open: bool,
    connect_attempts: u32,
    to_client: VecDeque<ConnectorEvent>,
    from_client: Vec<Frame>,
    topics: HashMap<SubscriptionId, String>,
}

impl Default for Broker {
    fn default() -> Self {
        Self {
            accepting: true,
            open: false,
            connect_attempts: 0,
            to_client: VecDeque::new(),
            from_client: Vec::new(),
            topics: HashMap::new(),
        }
    }
}

/// Client half.
#[derive(Debug)]
pub struct LoopbackConnector {
    broker: Arc<Mutex<Broker>>,
}

/// Server half.
#[derive(Clone, Debug)]
pub struct LoopbackServer {
    broker: Arc<Mutex<Broker>>,
}

/// Creates a connected pair.
#[must_use]
pub fn loopback() -> (LoopbackConnector, LoopbackServer) {
    let broker = Arc::new(Mutex::new(Broker::default()));
    (
        LoopbackConnector {
            broker: Arc::clone(&broker),
        },
        LoopbackServer { broker },
    )
}

impl Connector for LoopbackConnector {
    fn open(&mut self) -> TransportResult<()> {
        let mut b = self.broker.lock();
        b.connect_attempts += 1;
        if b.accepting {
            b.open = true;
            b.to_client.push_back(ConnectorEvent::Opened);
        } else {
            b.to_client
                .push_back(ConnectorEvent::Failed(TransportError::ConnectionRefused(
                    "loopback server not accepting".into(),
                )));
            b.to_client.push_back(ConnectorEvent::Closed);
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut b = self.broker.lock();
        b.open = false;
        b.topics.clear();
    }

    fn send(&mut self, frame: Frame) -> TransportResult<()> {
        let mut b = self.broker.lock();
        if !b.open {
            return Err(TransportError::NotConnected);
        }
        match &frame {
            Frame::Connect { .. } => b.to_client.push_back(ConnectorEvent::Frame(Frame::Connected)),
            Frame::Subscribe { id, destination } => {
                b.topics.insert(*id, destination.clone());
            }
            Frame::Unsubscribe { id } => {
                b.topics.remove(id);
            }
            Frame::Disconnect => {
                b.open = false;
                b.topics.clear();
            }
            _ => {}
        }
        b.from_client.push(frame);
        Ok(())
    }

    fn poll(&mut self) -> Option<ConnectorEvent> {
        self.broker.lock().to_client.pop_front()
    }
}

impl LoopbackServer {
    /// Accept or refuse future connection attempts.
    pub fn set_accepting(&self, accepting: bool) {
        self.broker.lock().accepting = accepting;
    }

    /// Connection attempts seen so far.
    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.broker.lock().connect_attempts
    }

    /// True while a client connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.broker.lock().open
    }

    /// Publishes a JSON payload on `topic`. Returns false if nobody is
    /// subscribed (the message is dropped, as a broker would).
    pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> bool {
        match encode_body(payload) {
            Ok(body) => self.publish_raw(topic, body),
            Err(_) => false,
        }
    }

    /// Publishes a raw body on `topic`.
    pub fn publish_raw(&self, topic: &str, body: impl Into<String>) -> bool {
        let mut b = self.broker.lock();
        if !b.open || !b.topics.values().any(|t| t == topic) {
            return false;
        }
        b.to_client.push_back(ConnectorEvent::Frame(Frame::Message {
            destination: topic.to_owned(),
            body: body.into(),
        }));
        true
    }

    /// Sends an ERROR frame.
    pub fn push_error(&self, message: impl Into<String>) {
        self.broker
            .lock()
            .to_client
            .push_back(ConnectorEvent::Frame(Frame::Error {
                message: message.into(),
            }));
    }

    /// Kills the connection from the server side.
    pub fn drop_connection(&self) {
        let mut b = self.broker.lock();
        if b.open {
            b.open = false;
            b.topics.clear();
            b.to_client.push_back(ConnectorEvent::Closed);
        }
    }

    /// Every frame the client sent.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> {
        self.broker.lock().from_client.clone()
    }

    /// Takes every frame the client sent so far.
    pub fn take_sent(&self) -> Vec<Frame> {
        std::mem::take(&mut self.broker.lock().from_client)
    }

    /// Bodies of SEND frames to `destination`, oldest first.
    #[must_use]
    pub fn bodies_sent_to(&self, destination: &str) -> Vec<String> {
        self.broker
            .lock()
            .from_client
            .iter()
            .filter_map(|f| match f {
                Frame::Send { destination: d, body } if d == destination => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    /// Topics with a live subscription.
    #[must_use]
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self.broker.lock().topics.values().cloned().collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// True if some subscription covers `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.broker.lock().topics.values().any(|t| t == topic)
    }
}
