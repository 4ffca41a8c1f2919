//! # PvP Match Loop
//!
//! Puts the server's rolls on the table:
//!
//! ```text
//! BattleSynchronizer ──DiceRolled──► queue ──► reconciler.aim(dice)
//!                                                   │ frames
//!                                                   ▼
//!                               dice settle ──► TurnResolved
//! BattleEnded ──► held until the last roll lands ──► MatchOver
//! ```
//!
//! One [`PvpMatchLoop::tick`] is one animation frame.

use std::collections::VecDeque;
use std::time::Instant;

use sortis_core::{BattleId, DiceTriple, Hand, PlayerId};
use sortis_networking::{
    BattleEvent, BattlePhase, BattleSynchronizer, EventChannel, SyncError, SyncResult,
    Synchronizer,
};
use sortis_shared::{BattleEnd, MatchFound, TurnStart};
use tracing::{debug, info};

use crate::error::SortisResult;
use crate::reconciler::OutcomeReconciler;

/// A server roll, ready to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTurn {
    /// Battle.
    pub battle_id: BattleId,
    /// Who rolled.
    pub player_id: PlayerId,
    /// Dice as the server rolled them.
    pub dice: DiceTriple,
    /// Hand.
    pub hand: Hand,
    /// English hand label.
    pub label_en: &'static str,
    /// Korean hand label.
    pub label_kr: &'static str,
    /// Damage dealt.
    pub damage: u32,
    /// Opponent hp after the hit.
    pub opponent_hp: u32,
}

/// What the screen should show next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    /// Paired with an opponent.
    MatchFound(MatchFound),
    /// A turn began.
    TurnStarted(TurnStart),
    /// The dice landed on a server roll.
    TurnResolved(ResolvedTurn),
    /// Match over, after the last roll landed.
    MatchOver(BattleEnd),
    /// Something went wrong underneath.
    Fault(SyncError),
}

/// Battle synchronizer plus dice animation.
pub struct PvpMatchLoop {
    sync: BattleSynchronizer,
    reconciler: OutcomeReconciler,
    queue: VecDeque<ResolvedTurn>,
    in_flight: Option<ResolvedTurn>,
    pending_end: Option<BattleEnd>,
    events: EventChannel<MatchEvent>,
}

impl PvpMatchLoop {
    /// Wraps an idle synchronizer.
    #[must_use]
    pub fn new(sync: BattleSynchronizer, reconciler: OutcomeReconciler) -> Self {
        Self {
            sync,
            reconciler,
            queue: VecDeque::new(),
            in_flight: None,
            pending_end: None,
            events: EventChannel::new(),
        }
    }

    /// Underlying synchronizer.
    #[must_use]
    pub fn sync(&self) -> &BattleSynchronizer {
        &self.sync
    }

    /// Dice.
    #[must_use]
    pub fn reconciler(&self) -> &OutcomeReconciler {
        &self.reconciler
    }

    /// Display events.
    #[must_use]
    pub fn events(&self) -> &EventChannel<MatchEvent> {
        &self.events
    }

    /// Rolls waiting for the table, including the one in flight.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    /// Starts the synchronizer.
    ///
    /// # Errors
    ///
    /// Whatever [`BattleSynchronizer::activate`] returns.
    pub fn activate(&mut self, now: Instant) -> SyncResult<()> {
        self.sync.activate(now)
    }

    /// Sends a roll intent and starts the dice tumbling while the server
    /// decides. The server's result pins the outcome when it arrives.
    ///
    /// # Errors
    ///
    /// [`SyncError::WrongPhase`] before a match is found, or whatever
    /// [`BattleSynchronizer::send_roll`] returns.
    pub fn roll(&mut self) -> SortisResult<()> {
        let Some(battle_id) = self.sync.battle_id() else {
            return Err(SyncError::WrongPhase {
                action: "roll",
                phase: "awaiting match",
            }
            .into());
        };
        self.sync.send_roll(battle_id)?;
        if !self.reconciler.is_rolling() {
            self.reconciler.roll()?;
        }
        Ok(())
    }

    /// Advances one frame: network, then dice.
    ///
    /// # Errors
    ///
    /// Fatal synchronizer errors. Events received before the error are
    /// still delivered.
    pub fn tick(&mut self, now: Instant) -> SyncResult<()> {
        let result = self.sync.tick(now);
        self.absorb();
        result?;
        self.animate();
        self.finish();
        Ok(())
    }

    fn absorb(&mut self) {
        for event in self.sync.events().drain() {
            match event {
                BattleEvent::Subscribed { generation } => {
                    debug!(generation, "match loop subscribed");
                }
                BattleEvent::MatchFound(found) => self.events.emit(MatchEvent::MatchFound(found)),
                BattleEvent::TurnStarted(turn) => self.events.emit(MatchEvent::TurnStarted(turn)),
                BattleEvent::DiceRolled {
                    message,
                    dice,
                    hand,
                } => self.queue.push_back(ResolvedTurn {
                    battle_id: message.battle_id,
                    player_id: message.player_id,
                    dice,
                    hand,
                    label_en: hand.rank.name_en(),
                    label_kr: hand.rank.name_kr(),
                    damage: message.damage,
                    opponent_hp: message.opponent_hp,
                }),
                BattleEvent::BattleEnded(end) => self.pending_end = Some(end),
                BattleEvent::Fault(err) => self.events.emit(MatchEvent::Fault(err)),
            }
        }
    }

    fn animate(&mut self) {
        if self.in_flight.is_none() {
            if let Some(next) = self.queue.pop_front() {
                self.reconciler.aim(next.dice);
                self.in_flight = Some(next);
            }
        }
        let dt = self.reconciler.config().frame_dt;
        let Some(shown) = self.reconciler.step(dt) else {
            return;
        };
        match self.in_flight.take() {
            Some(turn) => {
                debug_assert_eq!(shown, turn.dice);
                info!(player_id = turn.player_id, dice = %shown, rank = turn.label_en, "roll shown");
                self.events.emit(MatchEvent::TurnResolved(turn));
            }
            None => debug!(dice = %shown, "throw landed before any result"),
        }
    }

    fn finish(&mut self) {
        if self.in_flight.is_some() || !self.queue.is_empty() {
            return;
        }
        if let Some(end) = self.pending_end.take() {
            info!(battle_id = end.battle_id, result = %end.result, "match over");
            self.events.emit(MatchEvent::MatchOver(end));
        }
    }
}

impl Synchronizer for PvpMatchLoop {
    fn tick(&mut self, now: Instant) -> SyncResult<()> {
        Self::tick(self, now)
    }

    fn is_finished(&self) -> bool {
        self.sync.phase() == BattlePhase::Terminated
            && self.backlog() == 0
            && self.pending_end.is_none()
    }
}
