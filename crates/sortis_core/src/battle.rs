//! # Battle State
//!
//! Hp/shield per side, whose turn it is, and the terminal status.
//!
//! ## Transitions
//!
//! ```text
//! ONGOING ──(enemy hp 0)──────────► VICTORY
//!    │ ────(player hp 0)─────────► DEFEAT
//!    └─────(turn cap reached)────► DRAW
//! ```
//!
//! Terminal statuses never change again. Networked PvP never runs this
//! locally; the server's numbers are displayed as-is.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::damage::{DamageReport, Vitals};
use crate::error::{CoreError, CoreResult};

/// Battle identifier.
pub type BattleId = u64;

/// Player identifier.
pub type PlayerId = u64;

/// Default starting hp.
pub const DEFAULT_INITIAL_HP: u32 = 100;

/// Default number of rounds before a draw.
pub const DEFAULT_TURN_CAP: u32 = 10;

/// Who acts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnActor {
    /// The local player.
    Player,
    /// The opponent (AI, boss or remote player).
    Enemy,
}

impl TurnActor {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// Battle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    /// Still going.
    Ongoing,
    /// Enemy hp reached zero.
    Victory,
    /// Player hp reached zero.
    Defeat,
    /// Turn cap reached with both alive.
    Draw,
}

impl BattleStatus {
    /// True for VICTORY, DEFEAT and DRAW.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ONGOING",
            Self::Victory => "VICTORY",
            Self::Defeat => "DEFEAT",
            Self::Draw => "DRAW",
        }
    }
}

impl std::fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable battle rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRules {
    /// Starting hp for both sides.
    pub initial_hp: u32,
    /// Rounds played before a draw.
    pub turn_cap: u32,
}

impl Default for BattleRules {
    fn default() -> Self {
        Self {
            initial_hp: DEFAULT_INITIAL_HP,
            turn_cap: DEFAULT_TURN_CAP,
        }
    }
}

/// One battle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    /// Battle id.
    pub id: BattleId,
    /// Local player.
    pub player_id: PlayerId,
    /// Opponent id (enemy, boss or remote player).
    pub enemy_id: PlayerId,
    player: Vitals,
    enemy: Vitals,
    current_turn: TurnActor,
    turn_count: u32,
    status: BattleStatus,
    rules: BattleRules,
}

impl Battle {
    /// Starts a battle at turn 1 with the player to act.
    #[must_use]
    pub fn new(id: BattleId, player_id: PlayerId, enemy_id: PlayerId, rules: BattleRules) -> Self {
        Self {
            id,
            player_id,
            enemy_id,
            player: Vitals::new(rules.initial_hp, 0),
            enemy: Vitals::new(rules.initial_hp, 0),
            current_turn: TurnActor::Player,
            turn_count: 1,
            status: BattleStatus::Ongoing,
            rules,
        }
    }

    /// Sets starting shields.
    #[must_use]
    pub fn with_shields(mut self, player_shield: u32, enemy_shield: u32) -> Self {
        self.player.shield = player_shield;
        self.enemy.shield = enemy_shield;
        self
    }

    /// Vitals of one side.
    #[must_use]
    pub const fn vitals(&self, side: TurnActor) -> Vitals {
        match side {
            TurnActor::Player => self.player,
            TurnActor::Enemy => self.enemy,
        }
    }

    /// Whose turn it is.
    #[must_use]
    pub const fn current_turn(&self) -> TurnActor {
        self.current_turn
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Status.
    #[must_use]
    pub const fn status(&self) -> BattleStatus {
        self.status
    }

    /// Rules in force.
    #[must_use]
    pub const fn rules(&self) -> BattleRules {
        self.rules
    }

    fn finished(&self) -> CoreError {
        CoreError::BattleFinished {
            battle_id: self.id,
            status: self.status.to_string(),
        }
    }

    fn ensure_ongoing(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(self.finished());
        }
        Ok(())
    }

    /// `attacker` hits the other side for `damage`.
    ///
    /// Knocking the defender to zero ends the battle. Otherwise the turn
    /// passes to the defender.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BattleFinished`] if the battle already ended.
    pub fn strike(&mut self, attacker: TurnActor, damage: u32) -> CoreResult<DamageReport> {
        self.ensure_ongoing()?;
        let defender = attacker.opponent();
        let report = match defender {
            TurnActor::Player => self.player.take_damage(damage),
            TurnActor::Enemy => self.enemy.take_damage(damage),
        };
        debug!(
            battle_id = self.id,
            ?attacker,
            damage,
            absorbed = report.absorbed,
            hp_after = report.hp_after,
            "strike"
        );

        if report.hp_after == 0 {
            self.status = match defender {
                TurnActor::Enemy => BattleStatus::Victory,
                TurnActor::Player => BattleStatus::Defeat,
            };
            info!(battle_id = self.id, status = %self.status, "battle finished");
        } else {
            self.current_turn = defender;
        }
        Ok(report)
    }

    /// Closes a round: applies the turn cap, advances the counter and hands
    /// the turn back to the player.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BattleFinished`] if the battle already ended
    /// by victory. A round that ended in defeat may still be closed.
    pub fn end_round(&mut self) -> CoreResult<BattleStatus> {
        if matches!(self.status, BattleStatus::Victory | BattleStatus::Draw) {
            return Err(self.finished());
        }
        if self.status == BattleStatus::Ongoing && self.turn_count >= self.rules.turn_cap {
            self.status = BattleStatus::Draw;
            info!(battle_id = self.id, turn = self.turn_count, "turn cap reached, draw");
        }
        self.turn_count += 1;
        self.current_turn = TurnActor::Player;
        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battle() -> Battle {
        Battle::new(1, 10, 20, BattleRules::default())
    }

    #[test]
    fn test_new_battle_defaults() {
        let b = battle();
        assert_eq!(b.turn_count(), 1);
        assert_eq!(b.status(), BattleStatus::Ongoing);
        assert_eq!(b.vitals(TurnActor::Player).hp, 100);
        assert_eq!(b.current_turn(), TurnActor::Player);
    }

    #[test]
    fn test_strike_passes_turn() {
        let mut b = battle();
        b.strike(TurnActor::Player, 16).unwrap();
        assert_eq!(b.vitals(TurnActor::Enemy).hp, 84);
        assert_eq!(b.current_turn(), TurnActor::Enemy);
    }

    #[test]
    fn test_knockout_is_terminal() {
        let mut b = Battle::new(1, 10, 20, BattleRules { initial_hp: 30, turn_cap: 10 });
        b.strike(TurnActor::Player, 45).unwrap();
        assert_eq!(b.status(), BattleStatus::Victory);
        assert_eq!(b.vitals(TurnActor::Enemy).hp, 0);
        assert!(b.strike(TurnActor::Enemy, 5).is_err());
        assert!(b.end_round().is_err());
        assert_eq!(b.status(), BattleStatus::Victory);
    }

    #[test]
    fn test_defeat_round_can_close() {
        let mut b = Battle::new(1, 10, 20, BattleRules { initial_hp: 10, turn_cap: 10 });
        b.strike(TurnActor::Enemy, 17).unwrap();
        assert_eq!(b.status(), BattleStatus::Defeat);
        assert_eq!(b.end_round().unwrap(), BattleStatus::Defeat);
        assert!(b.strike(TurnActor::Player, 5).is_err());
    }

    #[test]
    fn test_turn_cap_draws() {
        let mut b = battle();
        for round in 1..=10 {
            assert_eq!(b.turn_count(), round);
            b.strike(TurnActor::Player, 3).unwrap();
            b.strike(TurnActor::Enemy, 3).unwrap();
            b.end_round().unwrap();
        }
        assert_eq!(b.status(), BattleStatus::Draw);
        assert!(b.end_round().is_err());
        assert!(b.vitals(TurnActor::Player).hp > 0);
    }

    #[test]
    fn test_shields_absorb() {
        let mut b = battle().with_shields(0, 20);
        let report = b.strike(TurnActor::Player, 24).unwrap();
        assert_eq!(report.absorbed, 20);
        assert_eq!(b.vitals(TurnActor::Enemy), Vitals::new(96, 0));
    }
}
