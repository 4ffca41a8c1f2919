//! # Transport Session
//!
//! One persistent connection per client, shared by whichever synchronizer
//! is active.
//!
//! ## Design
//!
//! - The session never touches a socket itself. A [`Connector`] does the
//!   I/O and reports [`ConnectorEvent`]s; the session turns those into
//!   connection state and topic deliveries when [`TransportSession::poll`]
//!   runs. Nothing here blocks the caller.
//! - `subscribe` and `send` fail fast when not connected (`None` /
//!   [`TransportError::NotConnected`]).
//! - A dropped connection drops every subscription. Callers re-subscribe
//!   after reconnecting; the session never replays history.
//!
//! ```text
//!  Disconnected ──connect()──► Connecting ──CONNECTED frame──► Connected
//!       ▲                          │                              │
//!       └──────── refused ─────────┘◄──────── closed ─────────────┘
//! ```

pub mod loopback;
pub mod tcp;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use sortis_core::PlayerId;
use sortis_shared::{encode_body, Frame, SubscriptionId};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{TransportError, TransportResult};

pub use loopback::{loopback, LoopbackConnector, LoopbackServer};
pub use tcp::TcpConnector;

/// Transport shared between synchronizers.
pub type SharedTransport = Arc<Mutex<TransportSession>>;

/// Connection state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    #[default]
    Disconnected,
    /// Socket opening or handshake in flight.
    Connecting,
    /// Handshake done; subscribe and send work.
    Connected,
}

/// What a connector reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// Socket is up; handshake may start.
    Opened,
    /// A frame arrived.
    Frame(Frame),
    /// Socket-level failure.
    Failed(TransportError),
    /// Socket is gone.
    Closed,
}

/// Socket abstraction.
///
/// Implementations must not block: `open` starts connecting and reports
/// the outcome later through `poll`.
pub trait Connector: Send {
    /// Starts opening a connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started.
    fn open(&mut self) -> TransportResult<()>;

    /// Closes the connection, if any.
    fn close(&mut self);

    /// Queues a frame for the wire.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] without a socket.
    fn send(&mut self, frame: Frame) -> TransportResult<()>;

    /// Next pending event.
    fn poll(&mut self) -> Option<ConnectorEvent>;
}

/// A message delivered on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic.
    pub destination: String,
    /// JSON body.
    pub body: String,
}

/// Handle for one topic subscription.
///
/// Messages queue on an internal channel until drained. The handle does
/// not unsubscribe on drop; pass its id to
/// [`TransportSession::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    generation: u64,
    receiver: Receiver<InboundMessage>,
}

impl Subscription {
    /// Subscription id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Connection generation it was made on.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Next pending message.
    #[must_use]
    pub fn try_recv(&self) -> Option<InboundMessage> {
        self.receiver.try_recv().ok()
    }

    /// Every pending message.
    #[must_use]
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.receiver.try_iter().collect()
    }
}

/// Several topics feeding one queue.
///
/// Every route of the group shares one sender, so messages come out in the
/// order the connection delivered them, whatever their topic. The
/// `destination` of each [`InboundMessage`] tells the topics apart.
#[derive(Debug)]
pub struct SubscriptionGroup {
    ids: Vec<SubscriptionId>,
    generation: u64,
    receiver: Receiver<InboundMessage>,
}

impl SubscriptionGroup {
    /// Subscription ids, in the order the topics were given.
    #[must_use]
    pub fn ids(&self) -> &[SubscriptionId] {
        &self.ids
    }

    /// Number of topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True for a group with no topics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Connection generation it was made on.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Every pending message, in arrival order.
    #[must_use]
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.receiver.try_iter().collect()
    }
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Body bytes sent.
    pub bytes_sent: u64,
    /// Body bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Messages for topics nobody subscribed to.
    pub unrouted: u64,
    /// Successful connections.
    pub connections: u64,
}

struct Route {
    topic: String,
    tx: Sender<InboundMessage>,
}

/// The client's real-time session.
pub struct TransportSession {
    connector: Box<dyn Connector>,
    player_id: PlayerId,
    state: ConnectionState,
    routes: HashMap<SubscriptionId, Route>,
    next_subscription_id: SubscriptionId,
    outbound: VecDeque<Frame>,
    stats: TransportStats,
    generation: u64,
    state_tx: watch::Sender<ConnectionState>,
}

impl TransportSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(connector: Box<dyn Connector>, player_id: PlayerId) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            player_id,
            state: ConnectionState::Disconnected,
            routes: HashMap::new(),
            next_subscription_id: 1,
            outbound: VecDeque::new(),
            stats: TransportStats::default(),
            generation: 0,
            state_tx,
        }
    }

    /// Wraps the session for sharing.
    #[must_use]
    pub fn shared(self) -> SharedTransport {
        Arc::new(Mutex::new(self))
    }

    /// Player this session speaks for.
    #[must_use]
    pub const fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once the handshake completed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Bumped on every successful connection. Subscriptions from an older
    /// generation are dead.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Statistics.
    #[must_use]
    pub const fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Live subscriptions.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.routes.len()
    }

    /// Watches connection state changes (for async waiters).
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "transport state");
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    /// Starts connecting. No-op unless disconnected.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = self.connector.open() {
            warn!(error = %e, "connect failed to start");
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// Closes the connection and drops every subscription.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected {
            let _ = self.connector.send(Frame::Disconnect);
        }
        self.connector.close();
        self.drop_connection();
        info!(player_id = self.player_id, "transport disconnected");
    }

    fn drop_connection(&mut self) {
        // Dropping the senders disconnects every Subscription receiver.
        self.routes.clear();
        self.outbound.clear();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Processes every pending connector event. Returns how many ran.
    pub fn poll(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.connector.poll() {
            processed += 1;
            self.handle_event(event);
        }
        self.flush();
        processed
    }

    fn handle_event(&mut self, event: ConnectorEvent) {
        match event {
            ConnectorEvent::Opened => {
                let hello = Frame::Connect {
                    player_id: self.player_id,
                };
                if let Err(e) = self.connector.send(hello) {
                    warn!(error = %e, "handshake send failed");
                    self.stats.send_errors += 1;
                }
            }
            ConnectorEvent::Frame(frame) => self.handle_frame(frame),
            ConnectorEvent::Failed(e) => {
                warn!(error = %e, state = ?self.state, "transport failure");
            }
            ConnectorEvent::Closed => {
                if self.state != ConnectionState::Disconnected {
                    info!(dropped = self.routes.len(), "connection closed, subscriptions dropped");
                    self.connector.close();
                    self.drop_connection();
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        self.stats.frames_received += 1;
        match frame {
            Frame::Connected => {
                self.generation += 1;
                self.stats.connections += 1;
                self.set_state(ConnectionState::Connected);
                info!(
                    player_id = self.player_id,
                    generation = self.generation,
                    "transport connected"
                );
            }
            Frame::Message { destination, body } => {
                self.stats.bytes_received += body.len() as u64;
                let mut delivered = false;
                for route in self.routes.values().filter(|r| r.topic == destination) {
                    delivered |= route
                        .tx
                        .send(InboundMessage {
                            destination: destination.clone(),
                            body: body.clone(),
                        })
                        .is_ok();
                }
                if !delivered {
                    self.stats.unrouted += 1;
                    debug!(%destination, "message for unsubscribed topic");
                }
            }
            Frame::Error { message } => {
                warn!(%message, "server error frame");
            }
            other => {
                debug!(frame = ?other, "ignoring client-side frame from server");
            }
        }
    }

    fn flush(&mut self) {
        while let Some(frame) = self.outbound.pop_front() {
            let bytes = match &frame {
                Frame::Send { body, .. } => body.len() as u64,
                _ => 0,
            };
            match self.connector.send(frame) {
                Ok(()) => {
                    self.stats.frames_sent += 1;
                    self.stats.bytes_sent += bytes;
                }
                Err(e) => {
                    self.stats.send_errors += 1;
                    warn!(error = %e, "frame dropped");
                }
            }
        }
    }

    /// Subscribes to `topic`. `None` when not connected.
    pub fn subscribe(&mut self, topic: &str) -> Option<Subscription> {
        let (tx, receiver) = unbounded();
        let id = self.route(topic, tx)?;
        Some(Subscription {
            id,
            topic: topic.to_owned(),
            generation: self.generation,
            receiver,
        })
    }

    fn route(&mut self, topic: &str, tx: Sender<InboundMessage>) -> Option<SubscriptionId> {
        if !self.is_connected() {
            return None;
        }
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.routes.insert(
            id,
            Route {
                topic: topic.to_owned(),
                tx,
            },
        );
        self.outbound.push_back(Frame::Subscribe {
            id,
            destination: topic.to_owned(),
        });
        self.flush();
        debug!(id, topic, "subscribed");
        Some(id)
    }

    /// Subscribes to every topic or to none of them, all feeding one queue.
    ///
    /// On a partial failure the subscriptions already made are rolled back
    /// and `None` is returned.
    pub fn subscribe_all(&mut self, topics: &[&str]) -> Option<SubscriptionGroup> {
        let (tx, receiver) = unbounded();
        let mut ids = Vec::with_capacity(topics.len());
        for topic in topics {
            match self.route(topic, tx.clone()) {
                Some(id) => ids.push(id),
                None => {
                    for id in &ids {
                        self.unsubscribe(*id);
                    }
                    warn!(topic, rolled_back = ids.len(), "partial subscribe rolled back");
                    return None;
                }
            }
        }
        Some(SubscriptionGroup {
            ids,
            generation: self.generation,
            receiver,
        })
    }

    /// Drops a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if self.routes.remove(&id).is_none() {
            return false;
        }
        if self.is_connected() {
            self.outbound.push_back(Frame::Unsubscribe { id });
            self.flush();
        }
        debug!(id, "unsubscribed");
        true
    }

    /// Publishes `payload` as JSON to `destination`. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] when not connected, or a
    /// codec error if the payload cannot be encoded.
    pub fn send<T: Serialize>(&mut self, destination: &str, payload: &T) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let body = encode_body(payload)?;
        self.outbound.push_back(Frame::Send {
            destination: destination.to_owned(),
            body,
        });
        self.flush();
        Ok(())
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("player_id", &self.player_id)
            .field("state", &self.state)
            .field("subscriptions", &self.routes.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> (TransportSession, LoopbackServer) {
        let (connector, server) = loopback();
        (TransportSession::new(Box::new(connector), 7), server)
    }

    #[test]
    fn test_connect_is_asynchronous() {
        let (mut s, _server) = session();
        s.connect();
        assert_eq!(s.state(), ConnectionState::Connecting);
        s.poll();
        assert_eq!(s.state(), ConnectionState::Connected);
        assert_eq!(s.generation(), 1);
    }

    #[test]
    fn test_subscribe_and_send_fail_when_disconnected() {
        let (mut s, server) = session();
        assert!(s.subscribe("/user/queue/pvp/turn-start").is_none());
        assert_eq!(
            s.send("/app/pvp/battles/1/roll", &json!({"playerId": 7})),
            Err(TransportError::NotConnected)
        );
        assert!(server.sent().is_empty());
    }

    #[test]
    fn test_refused_connection_returns_to_disconnected() {
        let (mut s, server) = session();
        server.set_accepting(false);
        s.connect();
        s.poll();
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert_eq!(server.connect_attempts(), 1);
    }

    #[test]
    fn test_messages_route_by_topic() {
        let (mut s, server) = session();
        s.connect();
        s.poll();
        let turn = s.subscribe("/user/queue/pvp/turn-start").unwrap();
        let dice = s.subscribe("/user/queue/pvp/dice-result").unwrap();
        assert!(server.publish("/user/queue/pvp/turn-start", &json!({"n": 1})));
        s.poll();
        assert_eq!(turn.drain().len(), 1);
        assert!(dice.try_recv().is_none());
        assert!(!server.publish("/user/queue/other", &json!({})));
    }

    #[test]
    fn test_send_reaches_server() {
        let (mut s, server) = session();
        s.connect();
        s.poll();
        s.send("/app/pvp/battles/4/roll", &json!({"playerId": 7})).unwrap();
        assert_eq!(server.bodies_sent_to("/app/pvp/battles/4/roll"), vec![r#"{"playerId":7}"#]);
        assert_eq!(s.stats().frames_sent, 1);
    }

    #[test]
    fn test_drop_clears_subscriptions_and_reconnect_bumps_generation() {
        let (mut s, server) = session();
        s.connect();
        s.poll();
        let sub = s.subscribe("/user/queue/match-found").unwrap();
        assert_eq!(sub.generation(), 1);
        server.drop_connection();
        s.poll();
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert_eq!(s.active_subscriptions(), 0);
        assert!(server.subscribed_topics().is_empty());

        s.connect();
        s.poll();
        assert_eq!(s.generation(), 2);
        // Old handles see nothing; the server forgot them.
        assert!(!server.publish("/user/queue/match-found", &json!({})));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_subscribe_all_is_all_or_nothing() {
        let (mut s, server) = session();
        assert!(s.subscribe_all(&["/a", "/b"]).is_none());
        s.connect();
        s.poll();
        let group = s.subscribe_all(&["/a", "/b"]).unwrap();
        assert_eq!(group.len(), 2);
        assert_eq!(server.subscribed_topics(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_group_keeps_arrival_order_across_topics() {
        let (mut s, server) = session();
        s.connect();
        s.poll();
        let group = s.subscribe_all(&["/a", "/b"]).unwrap();
        server.publish("/b", &json!({"n": 1}));
        server.publish("/a", &json!({"n": 2}));
        server.publish("/b", &json!({"n": 3}));
        s.poll();
        let order: Vec<String> = group.drain().into_iter().map(|m| m.destination).collect();
        assert_eq!(order, vec!["/b", "/a", "/b"]);

        for id in group.ids() {
            assert!(s.unsubscribe(*id));
        }
        assert!(server.subscribed_topics().is_empty());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (mut s, server) = session();
        s.connect();
        s.poll();
        let sub = s.subscribe("/user/queue/draft/state").unwrap();
        assert!(s.unsubscribe(sub.id()));
        assert!(!s.unsubscribe(sub.id()));
        assert!(!server.is_subscribed("/user/queue/draft/state"));
    }

    #[test]
    fn test_watch_reports_state() {
        let (mut s, _server) = session();
        let rx = s.watch_state();
        s.connect();
        s.poll();
        assert_eq!(*rx.borrow(), ConnectionState::Connected);
    }
}
