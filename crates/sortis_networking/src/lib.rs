//! # SORTIS Networking - Server-Authoritative Sync
//!
//! Real-time plumbing between the client and the game server.
//!
//! ## Architecture
//!
//! - **Transport**: one session per client over a pluggable [`Connector`]
//!   (TCP in production, loopback in tests and demos)
//! - **Battle sync**: follows a PvP match, checks every declared hand
//! - **Draft sync**: follows the snake draft, mirrors the board
//! - **Battle API**: request/response contract for PvE and practice
//!
//! ## Authority
//!
//! ```text
//! CLIENT                           SERVER
//!   |                                 |
//!   |--- roll intent ---------------->|
//!   |                                 | <- server rolls and scores
//!   |<-- dice + hand + damage --------|
//!   |                                 |
//! ```
//!
//! The client never decides an outcome. It only checks that the declared
//! hand matches the shared table.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Instant;
//! use sortis_networking::{loopback, BattlePhase, BattleSyncConfig, BattleSynchronizer, TransportSession};
//!
//! let (connector, _server) = loopback();
//! let transport = TransportSession::new(Box::new(connector), 7).shared();
//! let mut sync = BattleSynchronizer::new(transport, BattleSyncConfig::default());
//! sync.activate(Instant::now()).unwrap();
//! assert_eq!(sync.phase(), BattlePhase::Active);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod battle;
pub mod client;
pub mod draft;
pub mod driver;
pub mod error;
pub mod events;
pub mod retry;
pub mod transport;

pub use battle::{BattleEvent, BattlePhase, BattleSyncConfig, BattleSynchronizer};
pub use client::{decode_roll, hand_result, parse_hand, BattleApi};
pub use draft::{
    DraftBoard, DraftEvent, DraftPhase, DraftRejection, DraftSyncConfig, DraftSynchronizer,
};
pub use driver::{drive, wait_connected, Synchronizer};
pub use error::{ApiError, ApiResult, SyncError, SyncResult, TransportError, TransportResult};
pub use events::EventChannel;
pub use retry::{RetryDecision, RetryPolicy, RetrySchedule};
pub use transport::{
    loopback, ConnectionState, Connector, ConnectorEvent, InboundMessage, LoopbackConnector,
    LoopbackServer, SharedTransport, Subscription, SubscriptionGroup, TcpConnector, TransportSession,
    TransportStats,
};
