//! Local mirror of a draft.
//!
//! The client checks every server state against the draft invariants:
//!
//! - a skill sits in at most one pick list, at most once
//! - a picked skill is no longer in the pool
//! - no seat holds more than [`PICKS_PER_PLAYER`] skills
//!
//! The same board also carries the pick/ready rules (snake order, pool
//! membership, cap), which is what a referee needs to run a draft.

use std::collections::HashSet;

use sortis_core::{BattleId, PlayerId, SkillId};
use sortis_shared::constants::{PICKS_PER_PLAYER, TIME_PER_PICK_MS, TOTAL_PICKS};
use sortis_shared::{snake_turn, DraftState, DraftStatus, Participant, SkillInfo};

use crate::error::{SyncError, SyncResult};

/// Why a pick or ready was refused. Display strings match the server's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftRejection {
    /// Draft is not in the picking phase.
    NotInProgress,
    /// Player is not seated in this draft.
    NotInDraft,
    /// Wrong seat for this pick number.
    NotYourTurn,
    /// Skill already taken or never offered.
    SkillNotAvailable,
    /// Seat already holds its cap.
    PickCapReached,
    /// Ready before both seats finished picking.
    PicksNotComplete,
}

impl std::fmt::Display for DraftRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotInProgress => "Draft is not in progress",
            Self::NotInDraft => "Player not in this draft",
            Self::NotYourTurn => "Not your turn",
            Self::SkillNotAvailable => "Skill not available",
            Self::PickCapReached => "Pick limit reached",
            Self::PicksNotComplete => "Picks are not complete",
        })
    }
}

/// Draft state with invariant checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftBoard {
    battle_id: BattleId,
    player1_id: PlayerId,
    player2_id: PlayerId,
    pool: Vec<SkillInfo>,
    player1_picks: Vec<SkillInfo>,
    player2_picks: Vec<SkillInfo>,
    player1_ready: bool,
    player2_ready: bool,
    pick_number: u32,
    status: DraftStatus,
}

impl DraftBoard {
    /// Fresh draft at pick 1.
    #[must_use]
    pub fn new(
        battle_id: BattleId,
        player1_id: PlayerId,
        player2_id: PlayerId,
        pool: Vec<SkillInfo>,
    ) -> Self {
        Self {
            battle_id,
            player1_id,
            player2_id,
            pool,
            player1_picks: Vec::new(),
            player2_picks: Vec::new(),
            player1_ready: false,
            player2_ready: false,
            pick_number: 1,
            status: DraftStatus::InProgress,
        }
    }

    /// Builds a board from a server state, validating it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ProtocolViolation`] if the state breaks an invariant.
    pub fn from_state(state: &DraftState) -> SyncResult<Self> {
        validate(state)?;
        Ok(Self {
            battle_id: state.battle_id,
            player1_id: state.player1_id,
            player2_id: state.player2_id,
            pool: state.pool.clone(),
            player1_picks: state.player1_picks.clone(),
            player2_picks: state.player2_picks.clone(),
            player1_ready: state.player1_ready,
            player2_ready: state.player2_ready,
            pick_number: state.pick_number,
            status: state.status,
        })
    }

    /// Replaces the board with a newer server state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ProtocolViolation`] if the state breaks an
    /// invariant or belongs to another battle. The board is unchanged then.
    pub fn apply_state(&mut self, state: &DraftState) -> SyncResult<()> {
        if state.battle_id != self.battle_id {
            return Err(SyncError::ProtocolViolation(format!(
                "state for battle {} on draft {}",
                state.battle_id, self.battle_id
            )));
        }
        *self = Self::from_state(state)?;
        Ok(())
    }

    /// Battle id.
    #[must_use]
    pub const fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Status.
    #[must_use]
    pub const fn status(&self) -> DraftStatus {
        self.status
    }

    /// Next pick number.
    #[must_use]
    pub const fn pick_number(&self) -> u32 {
        self.pick_number
    }

    /// Seat on the clock.
    #[must_use]
    pub fn current_turn(&self) -> Option<Participant> {
        if self.status == DraftStatus::InProgress {
            snake_turn(self.pick_number)
        } else {
            None
        }
    }

    /// Seat of `player_id`.
    #[must_use]
    pub fn seat_of(&self, player_id: PlayerId) -> Option<Participant> {
        if player_id == self.player1_id {
            Some(Participant::Player1)
        } else if player_id == self.player2_id {
            Some(Participant::Player2)
        } else {
            None
        }
    }

    /// Skills still available.
    #[must_use]
    pub fn pool(&self) -> &[SkillInfo] {
        &self.pool
    }

    /// Skill ids picked by `seat`, in pick order.
    #[must_use]
    pub fn picks(&self, seat: Participant) -> Vec<SkillId> {
        self.picks_of(seat).iter().map(|s| s.skill_id).collect()
    }

    fn picks_of(&self, seat: Participant) -> &[SkillInfo] {
        match seat {
            Participant::Player1 => &self.player1_picks,
            Participant::Player2 => &self.player2_picks,
        }
    }

    /// True once both seats hold their cap.
    #[must_use]
    pub fn both_at_cap(&self) -> bool {
        self.player1_picks.len() == PICKS_PER_PLAYER && self.player2_picks.len() == PICKS_PER_PLAYER
    }

    /// Ready flag of `seat`.
    #[must_use]
    pub const fn is_ready(&self, seat: Participant) -> bool {
        match seat {
            Participant::Player1 => self.player1_ready,
            Participant::Player2 => self.player2_ready,
        }
    }

    /// Applies a pick by `player_id`. Returns the pick number it took.
    ///
    /// # Errors
    ///
    /// Returns the [`DraftRejection`] the server would send.
    pub fn pick(&mut self, player_id: PlayerId, skill_id: SkillId) -> Result<u32, DraftRejection> {
        if self.status != DraftStatus::InProgress {
            return Err(DraftRejection::NotInProgress);
        }
        let seat = self.seat_of(player_id).ok_or(DraftRejection::NotInDraft)?;
        if snake_turn(self.pick_number) != Some(seat) {
            return Err(DraftRejection::NotYourTurn);
        }
        if self.picks_of(seat).len() >= PICKS_PER_PLAYER {
            return Err(DraftRejection::PickCapReached);
        }
        let index = self
            .pool
            .iter()
            .position(|s| s.skill_id == skill_id)
            .ok_or(DraftRejection::SkillNotAvailable)?;

        let skill = self.pool.remove(index);
        match seat {
            Participant::Player1 => self.player1_picks.push(skill),
            Participant::Player2 => self.player2_picks.push(skill),
        }
        let taken = self.pick_number;
        self.pick_number += 1;
        if self.pick_number > TOTAL_PICKS {
            self.status = DraftStatus::PicksComplete;
        }
        Ok(taken)
    }

    /// Marks `player_id` ready. Returns true once both seats are ready.
    ///
    /// # Errors
    ///
    /// Returns a [`DraftRejection`] before picks are complete.
    pub fn ready(&mut self, player_id: PlayerId) -> Result<bool, DraftRejection> {
        if self.status != DraftStatus::PicksComplete {
            return Err(DraftRejection::PicksNotComplete);
        }
        match self.seat_of(player_id).ok_or(DraftRejection::NotInDraft)? {
            Participant::Player1 => self.player1_ready = true,
            Participant::Player2 => self.player2_ready = true,
        }
        if self.player1_ready && self.player2_ready {
            self.status = DraftStatus::Completed;
        }
        Ok(self.status == DraftStatus::Completed)
    }

    /// Cancels the draft.
    pub fn cancel(&mut self) {
        self.status = DraftStatus::Cancelled;
    }

    /// Snapshot in wire form.
    #[must_use]
    pub fn to_state(&self) -> DraftState {
        DraftState {
            battle_id: self.battle_id,
            player1_id: self.player1_id,
            player2_id: self.player2_id,
            current_turn: self.current_turn(),
            pick_number: self.pick_number,
            time_remaining: TIME_PER_PICK_MS,
            pool: self.pool.clone(),
            player1_picks: self.player1_picks.clone(),
            player2_picks: self.player2_picks.clone(),
            player1_ready: self.player1_ready,
            player2_ready: self.player2_ready,
            status: self.status,
        }
    }
}

/// Checks the draft invariants on a server state.
///
/// # Errors
///
/// Returns [`SyncError::ProtocolViolation`] naming the broken invariant.
pub fn validate(state: &DraftState) -> SyncResult<()> {
    let mut seen = HashSet::new();
    for seat in [Participant::Player1, Participant::Player2] {
        let picks = state.picks(seat);
        if picks.len() > PICKS_PER_PLAYER {
            return Err(SyncError::ProtocolViolation(format!(
                "{seat:?} holds {} skills (cap {PICKS_PER_PLAYER})",
                picks.len()
            )));
        }
        for skill in picks {
            if !seen.insert(skill.skill_id) {
                return Err(SyncError::ProtocolViolation(format!(
                    "skill {} picked twice",
                    skill.skill_id
                )));
            }
        }
    }
    if let Some(skill) = state.pool.iter().find(|s| seen.contains(&s.skill_id)) {
        return Err(SyncError::ProtocolViolation(format!(
            "picked skill {} still in pool",
            skill.skill_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: u64) -> Vec<SkillInfo> {
        (1..=n).map(|id| SkillInfo::new(id, format!("Skill {id}"))).collect()
    }

    fn board() -> DraftBoard {
        DraftBoard::new(1, 10, 20, pool(10))
    }

    #[test]
    fn test_full_snake_draft() {
        let mut b = board();
        let order = [10, 20, 20, 10, 10, 20, 20, 10];
        for (i, player) in order.iter().enumerate() {
            let skill = i as u64 + 1;
            assert_eq!(b.pick(*player, skill), Ok(i as u32 + 1));
        }
        assert_eq!(b.status(), DraftStatus::PicksComplete);
        assert!(b.both_at_cap());
        assert_eq!(b.picks(Participant::Player1), vec![1, 4, 5, 8]);
        assert_eq!(b.picks(Participant::Player2), vec![2, 3, 6, 7]);
        assert_eq!(b.pool().len(), 2);

        assert_eq!(b.ready(10), Ok(false));
        assert_eq!(b.status(), DraftStatus::PicksComplete);
        assert_eq!(b.ready(20), Ok(true));
        assert_eq!(b.status(), DraftStatus::Completed);
    }

    #[test]
    fn test_rejections() {
        let mut b = board();
        assert_eq!(b.pick(20, 1), Err(DraftRejection::NotYourTurn));
        assert_eq!(b.pick(99, 1), Err(DraftRejection::NotInDraft));
        assert_eq!(b.pick(10, 42), Err(DraftRejection::SkillNotAvailable));
        b.pick(10, 1).unwrap();
        assert_eq!(b.pick(20, 1), Err(DraftRejection::SkillNotAvailable));
        assert_eq!(b.ready(10), Err(DraftRejection::PicksNotComplete));
        assert_eq!(DraftRejection::NotYourTurn.to_string(), "Not your turn");
    }

    #[test]
    fn test_validate_catches_shared_skill() {
        let mut state = board().to_state();
        state.player1_picks.push(SkillInfo::new(3, "x"));
        state.player2_picks.push(SkillInfo::new(3, "x"));
        assert!(matches!(validate(&state), Err(SyncError::ProtocolViolation(_))));
    }

    #[test]
    fn test_validate_catches_overfull_seat() {
        let mut state = board().to_state();
        state.pool.clear();
        state.player1_picks = pool(5);
        assert!(validate(&state).is_err());
    }

    #[test]
    fn test_validate_catches_picked_skill_in_pool() {
        let mut state = board().to_state();
        state.player2_picks.push(SkillInfo::new(1, "Skill 1"));
        assert!(validate(&state).is_err());
    }

    #[test]
    fn test_apply_state_rejects_other_battle() {
        let mut b = board();
        let mut state = b.to_state();
        state.battle_id = 2;
        assert!(b.apply_state(&state).is_err());
        assert_eq!(b.battle_id(), 1);
    }
}
