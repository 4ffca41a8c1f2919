//! # Battle API
//!
//! The request/response half of combat (PvE and practice). The server
//! rolls, scores and applies damage; the client only shows the result.
//!
//! Implementations: the remote service (outside this workspace) and the
//! offline practice engine, which answers the same calls locally.

use sortis_core::{BattleId, DiceTriple, Hand, HandRank};
use sortis_shared::{BattleSnapshot, HandResult, RollResponse, StartBattleRequest};

use crate::error::{ApiError, ApiResult};

/// Start, roll, inspect.
pub trait BattleApi {
    /// Starts a battle.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a bad loadout or mode.
    fn start_battle(&mut self, request: &StartBattleRequest) -> ApiResult<BattleSnapshot>;

    /// Resolves one round for `battle_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BattleNotFound`] or a rules error once the
    /// battle is over.
    fn roll(&mut self, battle_id: BattleId) -> ApiResult<RollResponse>;

    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BattleNotFound`] for an unknown id.
    fn battle_status(&self, battle_id: BattleId) -> ApiResult<BattleSnapshot>;
}

/// Wire form of a hand.
#[must_use]
pub fn hand_result(hand: Hand) -> HandResult {
    HandResult {
        rank: hand.rank.wire_name().to_owned(),
        rank_kr: hand.rank.name_kr().to_owned(),
        power: hand.power,
    }
}

/// Decodes a wire hand.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for an unknown rank name.
pub fn parse_hand(result: &HandResult) -> ApiResult<Hand> {
    let rank: HandRank = result
        .rank
        .parse()
        .map_err(|e: sortis_core::CoreError| ApiError::InvalidRequest(e.to_string()))?;
    Ok(Hand {
        rank,
        power: result.power,
    })
}

/// Dice and hand of a roll response.
///
/// # Errors
///
/// Returns an error if the dice or rank are out of range.
pub fn decode_roll(response: &RollResponse) -> ApiResult<(DiceTriple, Hand)> {
    let dice = DiceTriple::new(response.dice)?;
    Ok((dice, parse_hand(&response.hand)?))
}
