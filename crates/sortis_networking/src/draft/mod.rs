//! # Draft Synchronizer
//!
//! Follows the pre-battle skill draft for one player.
//!
//! ```text
//! Idle ─► Subscribing ─► Drafting ─► AllPicksMade ─► ReadyWait ─► Complete
//!              │             │             │              │
//!              └─────────────┴──── fatal ──┴──────────────┴──► Error
//! ```
//!
//! Connecting uses capped exponential backoff (1s, 2s, 4s, 8s, 10s). Once
//! the budget is spent the synchronizer lands in `Error` with
//! [`SyncError::RetryBudgetExhausted`] and stops retrying.
//!
//! Server rejections of a pick ("Not your turn", "Skill not available")
//! are passed through verbatim and leave the phase alone. Only a draft the
//! server no longer knows or has cancelled ends the session.

pub mod board;

use std::time::{Duration, Instant};

use sortis_core::{BattleId, PlayerId, SkillId};
use sortis_shared::constants::{
    pick_destination, ready_destination, DRAFT_BACKOFF_BASE_MS, DRAFT_BACKOFF_CEILING_MS,
    DRAFT_MAX_RETRIES, DRAFT_TOPICS, PICKS_PER_PLAYER, TOPIC_DRAFT_COMPLETE, TOPIC_DRAFT_ERROR,
    TOPIC_DRAFT_PICK, TOPIC_DRAFT_PICKS_COMPLETE, TOPIC_DRAFT_STATE, TOPIC_DRAFT_TIMER,
};
use sortis_shared::{
    decode_body, DraftComplete, DraftState, DraftStatus, PickRequest, PickResponse, ReadyRequest,
    TimerUpdate,
};
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::events::EventChannel;
use crate::retry::{RetryDecision, RetryPolicy, RetrySchedule};
use crate::transport::{InboundMessage, SharedTransport, SubscriptionGroup};

pub use board::{validate, DraftBoard, DraftRejection};

/// Server message for a draft it does not know.
pub const DRAFT_NOT_FOUND: &str = "Draft not found";

/// Draft synchronizer phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftPhase {
    /// Not started.
    Idle,
    /// Waiting to subscribe.
    Subscribing,
    /// Picks in progress.
    Drafting,
    /// Both seats at the cap.
    AllPicksMade,
    /// Ready sent, waiting for the other seat.
    ReadyWait,
    /// Final skill lists received.
    Complete,
    /// Fatal failure. Absorbing.
    Error,
}

impl DraftPhase {
    /// Name for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Subscribing => "subscribing",
            Self::Drafting => "drafting",
            Self::AllPicksMade => "all_picks_made",
            Self::ReadyWait => "ready_wait",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// True for `Complete` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Draft synchronizer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DraftSyncConfig {
    /// First backoff delay.
    pub backoff_base: Duration,
    /// Largest backoff delay.
    pub backoff_ceiling: Duration,
    /// Connect attempts before giving up.
    pub max_retries: u32,
}

impl Default for DraftSyncConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(DRAFT_BACKOFF_BASE_MS),
            backoff_ceiling: Duration::from_millis(DRAFT_BACKOFF_CEILING_MS),
            max_retries: DRAFT_MAX_RETRIES,
        }
    }
}

impl DraftSyncConfig {
    /// Retry policy for these settings.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::Exponential {
            base: self.backoff_base,
            ceiling: self.backoff_ceiling,
            max_retries: self.max_retries,
        }
    }
}

/// What the draft synchronizer reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftEvent {
    /// All six topics subscribed.
    Subscribed {
        /// Connection generation.
        generation: u64,
    },
    /// New server state, already validated.
    StateUpdated(DraftState),
    /// Our pick went through.
    PickConfirmed(PickResponse),
    /// The server refused a pick. Verbatim reason.
    PickRejected {
        /// Server message.
        reason: String,
    },
    /// Both seats reached the cap. Sent once.
    PicksComplete,
    /// Pick clock update.
    Timer(TimerUpdate),
    /// Both seats ready; final lists.
    Completed(DraftComplete),
    /// Something went wrong. Fatal faults end the session.
    Fault(SyncError),
}

/// Follows one draft.
#[derive(Debug)]
pub struct DraftSynchronizer {
    transport: SharedTransport,
    battle_id: BattleId,
    phase: DraftPhase,
    /// Phase to return to after a resubscribe.
    resume: Option<DraftPhase>,
    retry: RetrySchedule,
    /// All six topics on one queue.
    channels: Option<SubscriptionGroup>,
    board: Option<DraftBoard>,
    picks_complete_seen: bool,
    outcome: Option<DraftComplete>,
    closed: bool,
    events: EventChannel<DraftEvent>,
}

impl DraftSynchronizer {
    /// Creates an idle synchronizer for the draft of `battle_id`.
    #[must_use]
    pub fn new(transport: SharedTransport, battle_id: BattleId, config: DraftSyncConfig) -> Self {
        Self {
            transport,
            battle_id,
            phase: DraftPhase::Idle,
            resume: None,
            retry: RetrySchedule::new(config.retry_policy()),
            channels: None,
            board: None,
            picks_complete_seen: false,
            outcome: None,
            closed: false,
            events: EventChannel::new(),
        }
    }

    /// Battle the draft belongs to.
    #[must_use]
    pub const fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> DraftPhase {
        self.phase
    }

    /// Last validated server state.
    #[must_use]
    pub const fn board(&self) -> Option<&DraftBoard> {
        self.board.as_ref()
    }

    /// Final skill lists, once complete.
    #[must_use]
    pub const fn outcome(&self) -> Option<&DraftComplete> {
        self.outcome.as_ref()
    }

    /// Event stream.
    #[must_use]
    pub const fn events(&self) -> &EventChannel<DraftEvent> {
        &self.events
    }

    /// Connect attempts since the last successful subscribe.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.retry.attempts()
    }

    /// Pending backoff deadline.
    #[must_use]
    pub const fn next_retry_at(&self) -> Option<Instant> {
        self.retry.next_at()
    }

    /// True once torn down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn player_id(&self) -> PlayerId {
        self.transport.lock().player_id()
    }

    fn wrong_phase(&self, action: &'static str) -> SyncError {
        SyncError::WrongPhase {
            action,
            phase: self.phase.as_str(),
        }
    }

    /// Starts following the draft.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WrongPhase`] unless idle, or
    /// [`SyncError::RetryBudgetExhausted`] with a zero budget.
    pub fn activate(&mut self, now: Instant) -> SyncResult<()> {
        if self.phase != DraftPhase::Idle || self.closed {
            return Err(self.wrong_phase("activate"));
        }
        self.phase = DraftPhase::Subscribing;
        info!(battle_id = self.battle_id, "draft sync subscribing");
        self.attempt(now)
    }

    fn attempt(&mut self, now: Instant) -> SyncResult<()> {
        let subscribed = {
            let mut transport = self.transport.lock();
            if !transport.is_connected() {
                transport.connect();
                transport.poll();
            }
            let generation = transport.generation();
            transport
                .subscribe_all(&DRAFT_TOPICS)
                .map(|subs| (subs, generation))
        };

        if let Some((subs, generation)) = subscribed {
            self.channels = Some(subs);
            self.retry.reset();
            self.phase = self.resume.take().unwrap_or(DraftPhase::Drafting);
            info!(battle_id = self.battle_id, generation, phase = self.phase.as_str(), "draft sync subscribed");
            self.events.emit(DraftEvent::Subscribed { generation });
            return Ok(());
        }

        match self.retry.record_failure(now) {
            RetryDecision::RetryAt(at) => {
                warn!(
                    attempts = self.retry.attempts(),
                    delay_ms = at.saturating_duration_since(now).as_millis() as u64,
                    "draft connect failed, backing off"
                );
                Ok(())
            }
            RetryDecision::GiveUp { attempts } => {
                self.fail(SyncError::RetryBudgetExhausted { attempts })
            }
        }
    }

    /// Moves to `Error`, releases everything and returns the error.
    fn fail(&mut self, err: SyncError) -> SyncResult<()> {
        error!(battle_id = self.battle_id, error = %err, "draft sync failed");
        self.events.emit(DraftEvent::Fault(err.clone()));
        self.release();
        self.phase = DraftPhase::Error;
        Err(err)
    }

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
    /// Returns the fatal error that moved the synchronizer to `Error`.
    pub fn tick(&mut self, now: Instant) -> SyncResult<()> {
        if self.closed || self.phase == DraftPhase::Idle || self.phase.is_terminal() {
            return Ok(());
        }
        self.transport.lock().poll();

        if self.phase != DraftPhase::Subscribing && self.channels_dead() {
            warn!(battle_id = self.battle_id, phase = self.phase.as_str(), "draft subscriptions lost");
            self.channels = None;
            self.resume = Some(self.phase);
            self.phase = DraftPhase::Subscribing;
            self.retry.reset();
        }

        if self.phase == DraftPhase::Subscribing {
            let connected = self.transport.lock().is_connected();
            if connected || self.retry.next_at().is_none() || self.retry.is_due(now) {
                self.attempt(now)?;
            }
            if self.phase == DraftPhase::Subscribing {
                return Ok(());
            }
        }

        self.process()
    }

    fn process(&mut self) -> SyncResult<()> {
        let inbox = self.channels.as_ref().map(SubscriptionGroup::drain).unwrap_or_default();

        for message in inbox {
            if self.phase.is_terminal() {
                return Ok(());
            }
            match message.destination.as_str() {
                TOPIC_DRAFT_STATE => self.on_state(&message)?,
                TOPIC_DRAFT_PICK => self.on_pick(&message),
                TOPIC_DRAFT_PICKS_COMPLETE => self.on_picks_complete(&message)?,
                TOPIC_DRAFT_TIMER => self.on_timer(&message),
                TOPIC_DRAFT_ERROR => self.on_error(&message)?,
                TOPIC_DRAFT_COMPLETE => self.on_complete(&message)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, message: &InboundMessage) -> Option<T> {
        match decode_body(&message.body) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(topic = %message.destination, error = %e, "malformed draft message");
                self.events.emit(DraftEvent::Fault(SyncError::MalformedPayload {
                    topic: message.destination.clone(),
                    reason: e.to_string(),
                }));
                None
            }
        }
    }

    /// Validates a server state and stores it.
    fn absorb_state(&mut self, state: &DraftState) -> SyncResult<()> {
        if state.status == DraftStatus::Cancelled {
            return self.fail(SyncError::Aborted("draft cancelled".into()));
        }
        let applied = match self.board.as_mut() {
            Some(board) => board.apply_state(state),
            None => DraftBoard::from_state(state).map(|b| self.board = Some(b)),
        };
        if let Err(e) = applied {
            return self.fail(e);
        }
        debug!(
            battle_id = self.battle_id,
            pick = state.pick_number,
            status = ?state.status,
            "draft state"
        );
        self.events.emit(DraftEvent::StateUpdated(state.clone()));
        Ok(())
    }

    fn on_state(&mut self, message: &InboundMessage) -> SyncResult<()> {
        let Some(state) = self.decode::<DraftState>(message) else {
            return Ok(());
        };
        if state.battle_id != self.battle_id {
            debug!(battle_id = state.battle_id, "ignoring state for another draft");
            return Ok(());
        }
        self.absorb_state(&state)
    }

    fn on_pick(&mut self, message: &InboundMessage) {
        let Some(response) = self.decode::<PickResponse>(message) else {
            return;
        };
        // Rejections come without a battle id.
        if response.battle_id.is_some_and(|id| id != self.battle_id) {
            return;
        }
        if response.success {
            info!(
                skill_id = ?response.skill_id,
                pick = ?response.pick_number,
                "pick confirmed"
            );
            self.events.emit(DraftEvent::PickConfirmed(response));
        } else {
            let reason = response.error.unwrap_or_default();
            warn!(%reason, "pick rejected");
            self.events.emit(DraftEvent::PickRejected { reason });
        }
    }

    fn on_picks_complete(&mut self, message: &InboundMessage) -> SyncResult<()> {
        let Some(state) = self.decode::<DraftState>(message) else {
            return Ok(());
        };
        if state.battle_id != self.battle_id {
            return Ok(());
        }
        self.absorb_state(&state)?;
        if self.picks_complete_seen {
            debug!("duplicate picks-complete ignored");
            return Ok(());
        }
        let at_cap = self.board.as_ref().is_some_and(DraftBoard::both_at_cap);
        if !at_cap {
            return self.fail(SyncError::ProtocolViolation(format!(
                "picks-complete before both seats hold {PICKS_PER_PLAYER} skills"
            )));
        }
        self.picks_complete_seen = true;
        if self.phase == DraftPhase::Drafting {
            self.phase = DraftPhase::AllPicksMade;
        }
        info!(battle_id = self.battle_id, "all picks made");
        self.events.emit(DraftEvent::PicksComplete);
        Ok(())
    }

    fn on_timer(&mut self, message: &InboundMessage) {
        if let Some(timer) = self.decode::<TimerUpdate>(message) {
            if timer.battle_id == self.battle_id {
                self.events.emit(DraftEvent::Timer(timer));
            }
        }
    }

    fn on_error(&mut self, message: &InboundMessage) -> SyncResult<()> {
        let Some(response) = self.decode::<PickResponse>(message) else {
            return Ok(());
        };
        let reason = response.error.unwrap_or_default();
        if reason == DRAFT_NOT_FOUND {
            return self.fail(SyncError::Aborted(reason));
        }
        warn!(%reason, phase = self.phase.as_str(), "draft error from server");
        self.events.emit(DraftEvent::PickRejected { reason });
        Ok(())
    }

    fn on_complete(&mut self, message: &InboundMessage) -> SyncResult<()> {
        let Some(complete) = self.decode::<DraftComplete>(message) else {
            return Ok(());
        };
        if complete.battle_id != self.battle_id {
            return Ok(());
        }
        let overlap = complete
            .player1_skills
            .iter()
            .any(|id| complete.player2_skills.contains(id));
        if overlap
            || complete.player1_skills.len() > PICKS_PER_PLAYER
            || complete.player2_skills.len() > PICKS_PER_PLAYER
        {
            return self.fail(SyncError::ProtocolViolation(
                "final skill lists break the draft rules".into(),
            ));
        }
        info!(
            battle_id = self.battle_id,
            player1 = ?complete.player1_skills,
            player2 = ?complete.player2_skills,
            "draft complete"
        );
        self.outcome = Some(complete.clone());
        self.phase = DraftPhase::Complete;
        self.events.emit(DraftEvent::Completed(complete));
        self.release();
        Ok(())
    }

    /// Publishes a pick. The server checks turn order and availability.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WrongPhase`] outside `Drafting`, or a
    /// transport error when not connected.
    pub fn send_pick(&mut self, skill_id: SkillId) -> SyncResult<()> {
        if self.phase != DraftPhase::Drafting {
            return Err(self.wrong_phase("send_pick"));
        }
        let request = PickRequest {
            player_id: self.player_id(),
            skill_id,
        };
        self.transport
            .lock()
            .send(&pick_destination(self.battle_id), &request)?;
        debug!(skill_id, "pick sent");
        Ok(())
    }

    /// Signals ready after all picks are made.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WrongPhase`] outside `AllPicksMade`, or a
    /// transport error when not connected.
    pub fn send_ready(&mut self) -> SyncResult<()> {
        if self.phase != DraftPhase::AllPicksMade {
            return Err(self.wrong_phase("send_ready"));
        }
        let request = ReadyRequest {
            player_id: self.player_id(),
        };
        self.transport
            .lock()
            .send(&ready_destination(self.battle_id), &request)?;
        self.phase = DraftPhase::ReadyWait;
        info!(battle_id = self.battle_id, "ready sent");
        Ok(())
    }

    fn release(&mut self) {
        if let Some(group) = self.channels.take() {
            let mut transport = self.transport.lock();
            for id in group.ids() {
                transport.unsubscribe(*id);
            }
        }
        // Clearing the deadline is what cancels the backoff timer.
        self.retry.cancel();
    }

    /// Releases every subscription and the backoff timer. Idempotent.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.release();
        self.closed = true;
        info!(battle_id = self.battle_id, phase = self.phase.as_str(), "draft sync torn down");
    }
}

impl Drop for DraftSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{loopback, LoopbackServer, TransportSession};
    use sortis_shared::{Participant, SkillInfo};

    fn setup() -> (DraftSynchronizer, LoopbackServer) {
        let (connector, server) = loopback();
        let transport = TransportSession::new(Box::new(connector), 10).shared();
        let sync = DraftSynchronizer::new(transport, 5, DraftSyncConfig::default());
        (sync, server)
    }

    fn board() -> DraftBoard {
        let pool = (1..=10).map(|id| SkillInfo::new(id, format!("Skill {id}"))).collect();
        DraftBoard::new(5, 10, 20, pool)
    }

    fn complete_board() -> DraftBoard {
        let mut b = board();
        for (i, player) in [10, 20, 20, 10, 10, 20, 20, 10].iter().enumerate() {
            b.pick(*player, i as u64 + 1).unwrap();
        }
        b
    }

    #[test]
    fn test_subscribes_all_six_topics() {
        let (mut sync, server) = setup();
        sync.activate(Instant::now()).unwrap();
        assert_eq!(sync.phase(), DraftPhase::Drafting);
        for topic in DRAFT_TOPICS {
            assert!(server.is_subscribed(topic), "{topic}");
        }
    }

    #[test]
    fn test_backoff_then_fatal_error() {
        let (mut sync, server) = setup();
        server.set_accepting(false);
        let t0 = Instant::now();
        sync.activate(t0).unwrap();
        assert_eq!(sync.next_retry_at(), Some(t0 + Duration::from_millis(1000)));

        let mut now = t0;
        let mut delays = Vec::new();
        let result = loop {
            let Some(at) = sync.next_retry_at() else {
                break Ok(());
            };
            delays.push((at - now).as_millis());
            now = at;
            if let Err(e) = sync.tick(now) {
                break Err(e);
            }
        };
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000]);
        assert_eq!(result, Err(SyncError::RetryBudgetExhausted { attempts: 5 }));
        assert_eq!(sync.phase(), DraftPhase::Error);

        let attempts = server.connect_attempts();
        sync.tick(now + Duration::from_secs(120)).unwrap();
        assert_eq!(server.connect_attempts(), attempts);
        assert!(sync.next_retry_at().is_none());
    }

    #[test]
    fn test_pick_and_ready_flow() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        assert!(matches!(sync.send_ready(), Err(SyncError::WrongPhase { .. })));

        sync.send_pick(1).unwrap();
        assert_eq!(server.bodies_sent_to("/app/draft/5/pick"), vec![r#"{"playerId":10,"skillId":1}"#]);

        let done = complete_board().to_state();
        server.publish(TOPIC_DRAFT_STATE, &done);
        server.publish(TOPIC_DRAFT_PICKS_COMPLETE, &done);
        server.publish(TOPIC_DRAFT_PICKS_COMPLETE, &done);
        sync.tick(now).unwrap();
        assert_eq!(sync.phase(), DraftPhase::AllPicksMade);
        let fired = sync
            .events()
            .drain()
            .into_iter()
            .filter(|e| *e == DraftEvent::PicksComplete)
            .count();
        assert_eq!(fired, 1);
        assert!(matches!(sync.send_pick(9), Err(SyncError::WrongPhase { .. })));

        sync.send_ready().unwrap();
        assert_eq!(sync.phase(), DraftPhase::ReadyWait);

        server.publish(
            TOPIC_DRAFT_COMPLETE,
            &DraftComplete {
                battle_id: 5,
                player1_skills: vec![1, 4, 5, 8],
                player2_skills: vec![2, 3, 6, 7],
                status: "COMPLETED".into(),
            },
        );
        sync.tick(now).unwrap();
        assert_eq!(sync.phase(), DraftPhase::Complete);
        assert_eq!(sync.outcome().unwrap().player1_skills, vec![1, 4, 5, 8]);
        assert!(server.subscribed_topics().is_empty());
    }

    #[test]
    fn test_early_picks_complete_is_a_violation() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        server.publish(TOPIC_DRAFT_PICKS_COMPLETE, &board().to_state());
        assert!(matches!(sync.tick(now), Err(SyncError::ProtocolViolation(_))));
        assert_eq!(sync.phase(), DraftPhase::Error);
    }

    #[test]
    fn test_rejection_keeps_phase() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        sync.events().drain();
        server.publish(TOPIC_DRAFT_ERROR, &PickResponse::rejected("Not your turn"));
        sync.tick(now).unwrap();
        assert_eq!(
            sync.events().drain(),
            vec![DraftEvent::PickRejected {
                reason: "Not your turn".into()
            }]
        );
        assert_eq!(sync.phase(), DraftPhase::Drafting);
    }

    #[test]
    fn test_unknown_draft_is_fatal() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        server.publish(TOPIC_DRAFT_ERROR, &PickResponse::rejected(DRAFT_NOT_FOUND));
        assert!(sync.tick(now).is_err());
        assert_eq!(sync.phase(), DraftPhase::Error);
        assert!(server.subscribed_topics().is_empty());
    }

    #[test]
    fn test_server_rejections_with_null_ids() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        sync.events().drain();
        server.publish_raw(
            TOPIC_DRAFT_ERROR,
            r#"{"battleId":null,"playerId":null,"skillId":null,"skillName":null,"pickNumber":null,"nextTurn":null,"success":false,"error":"Not your turn"}"#,
        );
        sync.tick(now).unwrap();
        assert_eq!(
            sync.events().drain(),
            vec![DraftEvent::PickRejected {
                reason: "Not your turn".into()
            }]
        );
        assert_eq!(sync.phase(), DraftPhase::Drafting);

        server.publish_raw(
            TOPIC_DRAFT_ERROR,
            r#"{"battleId":null,"success":false,"error":"Draft not found"}"#,
        );
        assert!(matches!(sync.tick(now), Err(SyncError::Aborted(_))));
        assert_eq!(sync.phase(), DraftPhase::Error);
        assert!(server.subscribed_topics().is_empty());
    }

    #[test]
    fn test_events_keep_arrival_order_across_topics() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        sync.events().drain();

        let timer = TimerUpdate {
            battle_id: 5,
            time_remaining: 12_000,
            current_turn: Some(Participant::Player1),
        };
        server.publish(TOPIC_DRAFT_ERROR, &PickResponse::rejected("Not your turn"));
        server.publish(TOPIC_DRAFT_TIMER, &timer);
        server.publish(TOPIC_DRAFT_STATE, &board().to_state());
        sync.tick(now).unwrap();

        let events = sync.events().drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DraftEvent::PickRejected { .. }));
        assert_eq!(events[1], DraftEvent::Timer(timer));
        assert!(matches!(events[2], DraftEvent::StateUpdated(_)));
    }

    #[test]
    fn test_cancelled_state_is_fatal() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        let mut b = board();
        b.cancel();
        server.publish(TOPIC_DRAFT_STATE, &b.to_state());
        assert!(matches!(sync.tick(now), Err(SyncError::Aborted(_))));
    }

    #[test]
    fn test_invalid_state_is_fatal() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        let mut state = board().to_state();
        state.player1_picks.push(SkillInfo::new(1, "Skill 1"));
        server.publish(TOPIC_DRAFT_STATE, &state);
        assert!(matches!(sync.tick(now), Err(SyncError::ProtocolViolation(_))));
    }

    #[test]
    fn test_state_updates_board() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        let mut b = board();
        b.pick(10, 3).unwrap();
        server.publish(TOPIC_DRAFT_STATE, &b.to_state());
        sync.tick(now).unwrap();
        let mirror = sync.board().unwrap();
        assert_eq!(mirror.picks(Participant::Player1), vec![3]);
        assert_eq!(mirror.current_turn(), Some(Participant::Player2));
    }

    #[test]
    fn test_resubscribe_keeps_phase() {
        let (mut sync, server) = setup();
        let now = Instant::now();
        sync.activate(now).unwrap();
        server.publish(TOPIC_DRAFT_STATE, &complete_board().to_state());
        server.publish(TOPIC_DRAFT_PICKS_COMPLETE, &complete_board().to_state());
        sync.tick(now).unwrap();
        assert_eq!(sync.phase(), DraftPhase::AllPicksMade);

        server.drop_connection();
        sync.tick(now).unwrap();
        assert_eq!(sync.phase(), DraftPhase::AllPicksMade);
        assert!(server.is_subscribed(TOPIC_DRAFT_COMPLETE));
    }

    #[test]
    fn test_teardown_clears_backoff() {
        let (mut sync, server) = setup();
        server.set_accepting(false);
        let t0 = Instant::now();
        sync.activate(t0).unwrap();
        assert!(sync.next_retry_at().is_some());
        sync.teardown();
        assert!(sync.next_retry_at().is_none());
        sync.tick(t0 + Duration::from_secs(60)).unwrap();
        assert_eq!(server.connect_attempts(), 1);
        assert!(sync.is_closed());
    }
}
