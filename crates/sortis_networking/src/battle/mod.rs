//! # Battle Synchronizer
//!
//! Follows one PvP match over the shared transport.
//!
//! ## Phases
//!
//! - **Idle**: created, nothing subscribed.
//! - **Subscribing**: waiting for the transport. Retries on a fixed delay,
//!   but subscribes on the first tick that finds the transport connected.
//! - **Active**: all four battle topics subscribed.
//! - **Terminated**: battle over or torn down. Absorbing.
//!
//! The four subscriptions are made together or not at all. A dropped
//! connection sends the synchronizer back to Subscribing; it resubscribes
//! once the transport is back.
//!
//! ## Hand check
//!
//! Every dice result is re-evaluated locally. A server hand that disagrees
//! with the local table is a logic defect: the synchronizer reports it,
//! tears down and refuses to go on.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sortis_core::{evaluate, BattleId, DiceTriple, Hand, HandRank};
use sortis_shared::constants::{
    roll_destination, BATTLE_RETRY_DELAY_MS, BATTLE_TOPICS, TOPIC_BATTLE_END, TOPIC_DICE_RESULT,
    TOPIC_MATCH_FOUND, TOPIC_TURN_START,
};
use sortis_shared::{decode_body, BattleEnd, DiceResult, MatchFound, RollIntent, TurnStart};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::events::EventChannel;
use crate::retry::{RetryDecision, RetryPolicy, RetrySchedule};
use crate::transport::{InboundMessage, SharedTransport, SubscriptionGroup};

/// Battle synchronizer phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattlePhase {
    /// Not started.
    Idle,
    /// Waiting to subscribe.
    Subscribing,
    /// Subscribed and following the match.
    Active,
    /// Done.
    Terminated,
}

impl BattlePhase {
    /// Name for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Subscribing => "subscribing",
            Self::Active => "active",
            Self::Terminated => "terminated",
        }
    }
}

/// Battle synchronizer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BattleSyncConfig {
    /// Delay between connect attempts.
    pub retry_delay: Duration,
}

impl Default for BattleSyncConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(BATTLE_RETRY_DELAY_MS),
        }
    }
}

/// What the battle synchronizer reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BattleEvent {
    /// All four topics subscribed on this connection generation.
    Subscribed {
        /// Connection generation.
        generation: u64,
    },
    /// Matchmaking paired us.
    MatchFound(MatchFound),
    /// A turn began.
    TurnStarted(TurnStart),
    /// A roll resolved on the server, already checked locally.
    DiceRolled {
        /// Raw message.
        message: DiceResult,
        /// Dice in roll order.
        dice: DiceTriple,
        /// Hand, agreed by both sides.
        hand: Hand,
    },
    /// Match over.
    BattleEnded(BattleEnd),
    /// Something went wrong. Fatal faults end the session.
    Fault(SyncError),
}

/// Follows one PvP match.
#[derive(Debug)]
pub struct BattleSynchronizer {
    transport: SharedTransport,
    phase: BattlePhase,
    retry: RetrySchedule,
    /// In [`BATTLE_TOPICS`] order.
    channels: Option<SubscriptionGroup>,
    battle_id: Option<BattleId>,
    events: EventChannel<BattleEvent>,
}

impl BattleSynchronizer {
    /// Creates an idle synchronizer over `transport`.
    #[must_use]
    pub fn new(transport: SharedTransport, config: BattleSyncConfig) -> Self {
        Self {
            transport,
            phase: BattlePhase::Idle,
            retry: RetrySchedule::new(RetryPolicy::Fixed {
                delay: config.retry_delay,
            }),
            channels: None,
            battle_id: None,
            events: EventChannel::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Battle being followed, once known.
    #[must_use]
    pub const fn battle_id(&self) -> Option<BattleId> {
        self.battle_id
    }

    /// Pins the battle id. Messages for other battles are ignored.
    pub fn set_battle_id(&mut self, battle_id: BattleId) {
        self.battle_id = Some(battle_id);
    }

    /// Event stream.
    #[must_use]
    pub const fn events(&self) -> &EventChannel<BattleEvent> {
        &self.events
    }

    /// True while all four topics are subscribed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.channels.as_ref().is_some_and(|g| g.len() == BATTLE_TOPICS.len())
    }

    /// Pending retry deadline.
    #[must_use]
    pub const fn next_retry_at(&self) -> Option<Instant> {
        self.retry.next_at()
    }

    fn wrong_phase(&self, action: &'static str) -> SyncError {
        SyncError::WrongPhase {
            action,
            phase: self.phase.as_str(),
        }
    }

    /// Starts following the match.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WrongPhase`] unless idle.
    pub fn activate(&mut self, now: Instant) -> SyncResult<()> {
        if self.phase != BattlePhase::Idle {
            return Err(self.wrong_phase("activate"));
        }
        self.phase = BattlePhase::Subscribing;
        info!("battle sync subscribing");
        self.attempt(now);
        Ok(())
    }

    /// Connects if needed and subscribes if connected.
    fn attempt(&mut self, now: Instant) {
        let subscribed = {
            let mut transport = self.transport.lock();
            if !transport.is_connected() {
                transport.connect();
                transport.poll();
            }
            let generation = transport.generation();
            transport
                .subscribe_all(&BATTLE_TOPICS)
                .map(|subs| (subs, generation))
        };

        match subscribed {
            Some((subs, generation)) => {
                self.channels = Some(subs);
                self.retry.reset();
                self.phase = BattlePhase::Active;
                info!(generation, "battle sync active");
                self.events.emit(BattleEvent::Subscribed { generation });
            }
            None => {
                // Fixed policy never gives up.
                if let RetryDecision::RetryAt(at) = self.retry.record_failure(now) {
                    debug!(attempts = self.retry.attempts(), ?at, "battle sync will retry");
                }
            }
        }
    }

    /// True if the subscriptions belong to a connection that is gone.
    fn channels_dead(&self) -> bool {
        let transport = self.transport.lock();
        self.channels
            .as_ref()
            .map_or(true, |g| !transport.is_connected() || g.generation() != transport.generation())
    }

    /// Advances the synchronizer.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::HandDivergence`] if the server declared a hand
    /// the local table disagrees with. The synchronizer is terminated then.
    pub fn tick(&mut self, now: Instant) -> SyncResult<()> {
        if matches!(self.phase, BattlePhase::Idle | BattlePhase::Terminated) {
            return Ok(());
        }
        self.transport.lock().poll();

        if self.phase == BattlePhase::Active && self.channels_dead() {
            warn!("battle sync lost its subscriptions, resubscribing");
            self.channels = None;
            self.phase = BattlePhase::Subscribing;
            self.retry.reset();
        }

        if self.phase == BattlePhase::Subscribing {
            let connected = self.transport.lock().is_connected();
            if connected || self.retry.next_at().is_none() || self.retry.is_due(now) {
                self.attempt(now);
            }
            if self.phase != BattlePhase::Active {
                return Ok(());
            }
        }

        self.process()
    }

    fn process(&mut self) -> SyncResult<()> {
        let inbox = self.channels.as_ref().map(SubscriptionGroup::drain).unwrap_or_default();

        // Arrival order, across topics.
        for message in inbox {
            if self.phase == BattlePhase::Terminated {
                return Ok(());
            }
            match message.destination.as_str() {
                TOPIC_MATCH_FOUND => self.on_match_found(&message),
                TOPIC_TURN_START => self.on_turn_start(&message),
                TOPIC_DICE_RESULT => self.on_dice_result(&message)?,
                TOPIC_BATTLE_END => self.on_battle_end(&message),
                _ => {}
            }
        }
        Ok(())
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, message: &InboundMessage) -> Option<T> {
        match decode_body(&message.body) {
            Ok(v) => Some(v),
            Err(e) => {
                self.malformed(message, e.to_string());
                None
            }
        }
    }

    fn malformed(&self, message: &InboundMessage, reason: String) {
        warn!(topic = %message.destination, %reason, "malformed battle message");
        self.events.emit(BattleEvent::Fault(SyncError::MalformedPayload {
            topic: message.destination.clone(),
            reason,
        }));
    }

    fn is_foreign(&self, battle_id: BattleId) -> bool {
        let foreign = self.battle_id.is_some_and(|id| id != battle_id);
        if foreign {
            debug!(battle_id, "ignoring message for another battle");
        }
        foreign
    }

    fn on_match_found(&mut self, message: &InboundMessage) {
        let Some(found) = self.decode::<MatchFound>(message) else {
            return;
        };
        info!(battle_id = found.battle_id, "match found");
        self.battle_id = Some(found.battle_id);
        self.events.emit(BattleEvent::MatchFound(found));
    }

    fn on_turn_start(&mut self, message: &InboundMessage) {
        let Some(turn) = self.decode::<TurnStart>(message) else {
            return;
        };
        if self.is_foreign(turn.battle_id) {
            return;
        }
        debug!(turn = turn.turn_number, actor = ?turn.current_turn, "turn start");
        self.events.emit(BattleEvent::TurnStarted(turn));
    }

    fn on_dice_result(&mut self, message: &InboundMessage) -> SyncResult<()> {
        let Some(result) = self.decode::<DiceResult>(message) else {
            return Ok(());
        };
        if self.is_foreign(result.battle_id) {
            return Ok(());
        }
        let dice = match DiceTriple::new(result.dice) {
            Ok(d) => d,
            Err(e) => {
                self.malformed(message, e.to_string());
                return Ok(());
            }
        };
        let rank = match HandRank::from_str(&result.hand_rank) {
            Ok(r) => r,
            Err(e) => {
                self.malformed(message, e.to_string());
                return Ok(());
            }
        };

        let server = Hand {
            rank,
            power: result.hand_power,
        };
        let local = evaluate(&dice);
        if server != local {
            let err = SyncError::HandDivergence {
                dice,
                server,
                local,
            };
            error!(error = %err, "server hand disagrees with local table");
            self.events.emit(BattleEvent::Fault(err.clone()));
            self.teardown();
            return Err(err);
        }

        debug!(%dice, rank = %local.rank, damage = result.damage, "dice result");
        self.events.emit(BattleEvent::DiceRolled {
            message: result,
            dice,
            hand: local,
        });
        Ok(())
    }

    fn on_battle_end(&mut self, message: &InboundMessage) {
        let Some(end) = self.decode::<BattleEnd>(message) else {
            return;
        };
        if self.is_foreign(end.battle_id) {
            return;
        }
        info!(battle_id = end.battle_id, result = %end.result, "battle ended");
        self.events.emit(BattleEvent::BattleEnded(end));
        self.teardown();
    }

    /// Publishes a roll intent. The server decides whose turn it is.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WrongPhase`] once terminated, or a transport
    /// error when not connected.
    pub fn send_roll(&mut self, battle_id: BattleId) -> SyncResult<()> {
        if self.phase == BattlePhase::Terminated {
            return Err(self.wrong_phase("send_roll"));
        }
        let mut transport = self.transport.lock();
        let intent = RollIntent {
            player_id: transport.player_id(),
        };
        transport.send(&roll_destination(battle_id), &intent)?;
        debug!(battle_id, "roll sent");
        Ok(())
    }

    /// Releases every subscription and stops retrying. Idempotent.
    pub fn teardown(&mut self) {
        if self.phase == BattlePhase::Terminated {
            return;
        }
        {
            let mut transport = self.transport.lock();
            if let Some(group) = self.channels.take() {
                for id in group.ids() {
                    transport.unsubscribe(*id);
                }
            }
        }
        self.retry.cancel();
        self.phase = BattlePhase::Terminated;
        info!(battle_id = ?self.battle_id, "battle sync terminated");
    }
}

impl Drop for BattleSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}
