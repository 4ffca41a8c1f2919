//! # Draft Payloads
//!
//! Records exchanged during the pre-battle skill draft, plus the snake
//! pick order both sides agree on.
//!
//! ## Pick order (8 picks, 4 each)
//!
//! ```text
//! pick:  1  2  3  4  5  6  7  8
//! turn:  P1 P2 P2 P1 P1 P2 P2 P1
//! ```

use serde::{Deserialize, Serialize};
use sortis_core::{BattleId, PlayerId, SkillId};

use crate::constants::TOTAL_PICKS;

/// Draft seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    /// First seat.
    Player1,
    /// Second seat.
    Player2,
}

impl Participant {
    /// The other seat.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }
}

/// Who picks at `pick_number` (1-based). `None` outside 1..=8.
#[must_use]
pub const fn snake_turn(pick_number: u32) -> Option<Participant> {
    match pick_number {
        1 | 4 | 5 | 8 => Some(Participant::Player1),
        2 | 3 | 6 | 7 => Some(Participant::Player2),
        _ => None,
    }
}

/// Draft lifecycle as the server reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// Picking.
    InProgress,
    /// Both at cap, waiting for ready.
    PicksComplete,
    /// Both ready.
    Completed,
    /// Abandoned by the server.
    Cancelled,
}

/// A skill offered in the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    /// Skill id.
    pub skill_id: SkillId,
    /// Stable code.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub skill_code: String,
    /// Display name.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub name: String,
    /// Description.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub description: String,
    /// Rarity tier.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub rarity: String,
    /// Trigger name.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub trigger_type: String,
}

impl SkillInfo {
    /// Minimal record with just an id and a name.
    #[must_use]
    pub fn new(skill_id: SkillId, name: impl Into<String>) -> Self {
        Self {
            skill_id,
            skill_code: String::new(),
            name: name.into(),
            description: String::new(),
            rarity: String::new(),
            trigger_type: String::new(),
        }
    }
}

/// Full draft state, pushed after every change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    /// Battle the draft belongs to.
    pub battle_id: BattleId,
    /// First seat.
    pub player1_id: PlayerId,
    /// Second seat.
    pub player2_id: PlayerId,
    /// Seat to pick, `None` once picks are done.
    #[serde(default)]
    pub current_turn: Option<Participant>,
    /// Next pick number (1-8).
    pub pick_number: u32,
    /// Time left on the current pick (ms).
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub time_remaining: u64,
    /// Skills still available.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub pool: Vec<SkillInfo>,
    /// First seat's picks.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub player1_picks: Vec<SkillInfo>,
    /// Second seat's picks.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub player2_picks: Vec<SkillInfo>,
    /// First seat ready.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub player1_ready: bool,
    /// Second seat ready.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub player2_ready: bool,
    /// Status.
    pub status: DraftStatus,
}

impl DraftState {
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

    /// Picks of one seat.
    #[must_use]
    pub fn picks(&self, seat: Participant) -> &[SkillInfo] {
        match seat {
            Participant::Player1 => &self.player1_picks,
            Participant::Player2 => &self.player2_picks,
        }
    }

    /// Ready flag of one seat.
    #[must_use]
    pub const fn is_ready(&self, seat: Participant) -> bool {
        match seat {
            Participant::Player1 => self.player1_ready,
            Participant::Player2 => self.player2_ready,
        }
    }

    /// Total picks made.
    #[must_use]
    pub fn picks_made(&self) -> usize {
        self.player1_picks.len() + self.player2_picks.len()
    }

    /// True once all picks are in.
    #[must_use]
    pub fn all_picks_made(&self) -> bool {
        self.picks_made() >= TOTAL_PICKS as usize
    }
}

/// Outbound pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    /// Picking player.
    pub player_id: PlayerId,
    /// Chosen skill.
    pub skill_id: SkillId,
}

/// Outbound ready signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    /// Ready player.
    pub player_id: PlayerId,
}

/// Pick confirmation, also used as the error payload.
///
/// Rejections only fill `success` and `error`; the rest arrives as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickResponse {
    /// Battle.
    #[serde(default)]
    pub battle_id: Option<BattleId>,
    /// Picking player.
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    /// Skill.
    #[serde(default)]
    pub skill_id: Option<SkillId>,
    /// Skill name.
    #[serde(default)]
    pub skill_name: Option<String>,
    /// Pick number this confirmed.
    #[serde(default)]
    pub pick_number: Option<u32>,
    /// Next seat, `None` when picks are done.
    #[serde(default)]
    pub next_turn: Option<Participant>,
    /// Accepted?
    pub success: bool,
    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

impl PickResponse {
    /// A rejection with `reason`, shaped the way the server sends it.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            battle_id: None,
            player_id: None,
            skill_id: None,
            skill_name: None,
            pick_number: None,
            next_turn: None,
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Both ready; final loadouts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftComplete {
    /// Battle.
    pub battle_id: BattleId,
    /// First seat's skills.
    pub player1_skills: Vec<SkillId>,
    /// Second seat's skills.
    pub player2_skills: Vec<SkillId>,
    /// `READY_TO_START`.
    #[serde(default, deserialize_with = "crate::protocol::null_as_default")]
    pub status: String,
}

/// Pick clock tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdate {
    /// Battle.
    pub battle_id: BattleId,
    /// Time left (ms).
    pub time_remaining: u64,
    /// Seat on the clock.
    #[serde(default)]
    pub current_turn: Option<Participant>,
}
