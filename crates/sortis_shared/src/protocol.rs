//! # Wire Protocol
//!
//! Two layers:
//!
//! - [`Frame`]: the envelope on the real-time socket. One JSON object per
//!   line, tagged by `command`.
//! - Payload records: the JSON bodies carried inside `SEND`/`MESSAGE`
//!   frames and returned by the REST battle endpoints.
//!
//! Payloads use the server's camelCase field names. Dice travel as raw
//! `[u8; 3]` so a bad value is caught by the receiver's validation instead
//! of failing the whole frame.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sortis_core::{BattleId, BattleStatus, PlayerId, SkillActivation, SkillId, TurnActor};

// =============================================================================
// FRAMES
// =============================================================================

/// Subscription id inside one connection.
pub type SubscriptionId = u64;

/// Envelope on the real-time socket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frame {
    /// Client hello.
    Connect {
        /// Connecting player (the server scopes `/user/queue/*` to it).
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    /// Server accepted the connection.
    Connected,
    /// Start receiving a topic.
    Subscribe {
        /// Client-chosen id.
        id: SubscriptionId,
        /// Topic.
        destination: String,
    },
    /// Stop receiving a topic.
    Unsubscribe {
        /// Id given at subscribe time.
        id: SubscriptionId,
    },
    /// Client → server publish.
    Send {
        /// Destination route.
        destination: String,
        /// JSON body.
        body: String,
    },
    /// Server → client delivery.
    Message {
        /// Topic it was published on.
        destination: String,
        /// JSON body.
        body: String,
    },
    /// Server-side fault on the connection.
    Error {
        /// Reason.
        message: String,
    },
    /// Orderly close.
    Disconnect,
}

impl Frame {
    /// Encodes as one JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Only fails if serde_json does, which a well-formed frame never does.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes one JSON line.
    ///
    /// # Errors
    ///
    /// Returns the serde error for malformed input.
    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }
}

/// Encodes a payload record as a frame body.
///
/// # Errors
///
/// Propagates serde errors.
pub fn encode_body<T: Serialize>(payload: &T) -> serde_json::Result<String> {
    serde_json::to_string(payload)
}

/// Decodes a frame body into a payload record.
///
/// # Errors
///
/// Propagates serde errors.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> serde_json::Result<T> {
    serde_json::from_str(body)
}

/// Reads an explicit `null` as the field's default.
///
/// The server serializes unset fields as `null` rather than leaving them
/// out, and `#[serde(default)]` alone only covers the missing case.
///
/// # Errors
///
/// Propagates errors for values that are neither `null` nor a `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// PVP MESSAGES
// =============================================================================

/// Opponent found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFound {
    /// New battle.
    pub battle_id: BattleId,
    /// First participant.
    pub player1_id: PlayerId,
    /// Second participant.
    pub player2_id: PlayerId,
    /// Ratings at match time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub player1_elo: i32,
    /// Ratings at match time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub player2_elo: i32,
    /// `MATCH_FOUND`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// A turn started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStart {
    /// Battle.
    pub battle_id: BattleId,
    /// `PLAYER` (you) or `ENEMY` (opponent), from the receiver's view.
    pub current_turn: TurnActor,
    /// Turn number.
    pub turn_number: u32,
    /// Time left to roll (ms).
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_remaining: u64,
}

/// Someone rolled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceResult {
    /// Battle.
    pub battle_id: BattleId,
    /// Who rolled.
    pub player_id: PlayerId,
    /// Dice in roll order.
    pub dice: [u8; 3],
    /// Wire rank name (`PAIR`, `NO_HAND`, ...).
    pub hand_rank: String,
    /// Korean label.
    #[serde(rename = "handRankKR", default)]
    pub hand_rank_kr: String,
    /// Hand power.
    pub hand_power: u32,
    /// Damage dealt after skills and shields.
    pub damage: u32,
    /// Opponent hp after the hit.
    pub opponent_hp: u32,
}

/// Reward attached to a battle end.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardInfo {
    /// Rating change.
    pub elo_change: i32,
    /// Currency awarded.
    pub soul_stones: u32,
    /// Result from the receiver's view.
    pub result: String,
}

/// The battle ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleEnd {
    /// Battle.
    pub battle_id: BattleId,
    /// Result from the receiver's view.
    pub result: BattleStatus,
    /// Reward, if any.
    #[serde(default)]
    pub reward: Option<RewardInfo>,
}

/// Outbound roll intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollIntent {
    /// Rolling player.
    pub player_id: PlayerId,
}

// =============================================================================
// REST BATTLE CONTRACT
// =============================================================================

/// Battle mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleType {
    /// Campaign / practice against AI.
    Pve,
    /// Live opponent.
    Pvp,
}

/// Start-battle request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBattleRequest {
    /// Requesting player.
    pub player_id: PlayerId,
    /// Mode.
    pub battle_type: BattleType,
    /// Campaign floor, if any.
    #[serde(default)]
    pub floor: Option<u32>,
    /// Loadout (max 4).
    #[serde(default, deserialize_with = "null_as_default")]
    pub equipped_skills: Vec<SkillId>,
}

/// Battle snapshot returned by start-battle and get-battle-status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    /// Battle.
    pub battle_id: BattleId,
    /// Player.
    pub player_id: PlayerId,
    /// Enemy.
    pub enemy_id: PlayerId,
    /// Who acts next.
    pub current_turn: TurnActor,
    /// Player hp.
    pub player_hp: u32,
    /// Enemy hp.
    pub enemy_hp: u32,
    /// Player shield.
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_shield: u32,
    /// Enemy shield.
    #[serde(default, deserialize_with = "null_as_default")]
    pub enemy_shield: u32,
    /// Round.
    pub turn_count: u32,
    /// Status.
    pub status: BattleStatus,
}

/// Hand as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandResult {
    /// Wire rank name.
    pub rank: String,
    /// Korean label.
    #[serde(rename = "rankKR", default)]
    pub rank_kr: String,
    /// Power.
    pub power: u32,
}

/// The enemy's half of a PvE round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyTurnResult {
    /// Enemy dice.
    pub dice: [u8; 3],
    /// Enemy hand.
    pub hand: HandResult,
    /// Damage to the player.
    pub damage: u32,
}

/// Roll response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollResponse {
    /// Player dice in roll order.
    pub dice: [u8; 3],
    /// Commitment hash for server rolls (`offline` for local rolls).
    #[serde(default, deserialize_with = "null_as_default")]
    pub hash: String,
    /// Player hand.
    pub hand: HandResult,
    /// Damage to the enemy.
    pub damage: u32,
    /// Player hp after the round.
    pub player_hp: u32,
    /// Enemy hp after the round.
    pub enemy_hp: u32,
    /// Player shield after the round.
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_shield: u32,
    /// Enemy shield after the round.
    #[serde(default, deserialize_with = "null_as_default")]
    pub enemy_shield: u32,
    /// Who acts next.
    pub current_turn: TurnActor,
    /// Status after the round.
    pub status: BattleStatus,
    /// Enemy sub-turn, absent if the enemy went down first.
    #[serde(default)]
    pub enemy_turn: Option<EnemyTurnResult>,
    /// Skills that fired this round.
    #[serde(default, deserialize_with = "null_as_default")]
    pub skill_activations: Vec<SkillActivation>,
}
