//! Built-in skill effects.
//!
//! | Id | Skill | Trigger | Effect |
//! |---|---|---|---|
//! | 1 | Lucky Reroll | BATTLE_START | reroll one random die |
//! | 2 | Steady Hand | DICE_ROLL | every 1 becomes 2 |
//! | 3 | Safe Bet | BEFORE_DAMAGE | NoHand damage x2 |
//! | 4 | High Roller | DICE_ROLL | lowest die below 4 rerolled into 4-6 |
//! | 5 | Pair Master | BEFORE_DAMAGE | Pair damage +7 |

use rand::{Rng, RngCore};

use super::{SkillEffect, SkillId, SkillTrigger, TurnState};
use crate::dice::{DieFace, DICE_PER_ROLL};
use crate::error::{CoreError, CoreResult};
use crate::hand::{Hand, HandRank};

fn hand_or_err(state: &TurnState, skill_id: SkillId, skill_name: &'static str) -> CoreResult<Hand> {
    state.hand.ok_or_else(|| CoreError::SkillEffect {
        skill_id,
        skill_name,
        reason: "hand must be evaluated before BEFORE_DAMAGE".into(),
    })
}

/// Rerolls one random die at battle start.
#[derive(Clone, Copy, Debug, Default)]
pub struct LuckyReroll;

impl SkillEffect for LuckyReroll {
    fn skill_id(&self) -> SkillId {
        1
    }

    fn name(&self) -> &'static str {
        "Lucky Reroll"
    }

    fn trigger(&self) -> SkillTrigger {
        SkillTrigger::BattleStart
    }

    fn apply(&self, state: &mut TurnState, rng: &mut dyn RngCore) -> CoreResult<()> {
        let index = rng.gen_range(0..DICE_PER_ROLL);
        let face = DieFace::roll(rng);
        state.dice.set(index, face);
        Ok(())
    }

    fn describe(&self, _state: &TurnState) -> String {
        format!("{}: Rerolled 1 die", self.name())
    }
}

/// Turns every 1 into a 2.
#[derive(Clone, Copy, Debug, Default)]
pub struct SteadyHand;

impl SkillEffect for SteadyHand {
    fn skill_id(&self) -> SkillId {
        2
    }

    fn name(&self) -> &'static str {
        "Steady Hand"
    }

    fn trigger(&self) -> SkillTrigger {
        SkillTrigger::DiceRoll
    }

    fn apply(&self, state: &mut TurnState, _rng: &mut dyn RngCore) -> CoreResult<()> {
        let two = DieFace::new(2)?;
        for index in 0..DICE_PER_ROLL {
            if state.dice.get(index).map(DieFace::value) == Some(1) {
                state.dice.set(index, two);
            }
        }
        Ok(())
    }

    fn describe(&self, state: &TurnState) -> String {
        let twos = state.dice.values().iter().filter(|&&v| v == 2).count();
        format!("{}: {twos} die(s) showing 2", self.name())
    }
}

/// Doubles NoHand damage.
#[derive(Clone, Copy, Debug, Default)]
pub struct SafeBet;

impl SkillEffect for SafeBet {
    fn skill_id(&self) -> SkillId {
        3
    }

    fn name(&self) -> &'static str {
        "Safe Bet"
    }

    fn trigger(&self) -> SkillTrigger {
        SkillTrigger::BeforeDamage
    }

    fn can_apply(&self, state: &TurnState) -> bool {
        state.hand.is_some_and(|h| h.rank == HandRank::NoHand)
    }

    fn apply(&self, state: &mut TurnState, _rng: &mut dyn RngCore) -> CoreResult<()> {
        let hand = hand_or_err(state, self.skill_id(), self.name())?;
        if hand.rank == HandRank::NoHand {
            state.damage = state.damage.saturating_mul(2);
        }
        Ok(())
    }

    fn describe(&self, state: &TurnState) -> String {
        format!("{}: NoHand damage x2 ({} -> {})", self.name(), state.damage / 2, state.damage)
    }
}

/// Forces the lowest die to 4 or more.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighRoller;

impl SkillEffect for HighRoller {
    fn skill_id(&self) -> SkillId {
        4
    }

    fn name(&self) -> &'static str {
        "High Roller"
    }

    fn trigger(&self) -> SkillTrigger {
        SkillTrigger::DiceRoll
    }

    fn apply(&self, state: &mut TurnState, rng: &mut dyn RngCore) -> CoreResult<()> {
        let values = state.dice.values();
        // First occurrence of the minimum.
        let (index, lowest) = values
            .iter()
            .copied()
            .enumerate()
            .fold((0, u8::MAX), |best, (i, v)| if v < best.1 { (i, v) } else { best });
        if lowest < 4 {
            state.dice.set(index, DieFace::roll_at_least(rng, 4));
        }
        Ok(())
    }

    fn describe(&self, _state: &TurnState) -> String {
        format!("{}: Ensured 1 die >= 4", self.name())
    }
}

/// Adds 7 to Pair damage.
#[derive(Clone, Copy, Debug, Default)]
pub struct PairMaster;

impl PairMaster {
    /// Flat bonus.
    pub const DAMAGE_BONUS: u32 = 7;
}

impl SkillEffect for PairMaster {
    fn skill_id(&self) -> SkillId {
        5
    }

    fn name(&self) -> &'static str {
        "Pair Master"
    }

    fn trigger(&self) -> SkillTrigger {
        SkillTrigger::BeforeDamage
    }

    fn can_apply(&self, state: &TurnState) -> bool {
        state.hand.is_some_and(|h| h.rank == HandRank::Pair)
    }

    fn apply(&self, state: &mut TurnState, _rng: &mut dyn RngCore) -> CoreResult<()> {
        let hand = hand_or_err(state, self.skill_id(), self.name())?;
        if hand.rank == HandRank::Pair {
            state.damage = state.damage.saturating_add(Self::DAMAGE_BONUS);
        }
        Ok(())
    }

    fn describe(&self, state: &TurnState) -> String {
        format!("{}: Pair damage +{} (now {})", self.name(), Self::DAMAGE_BONUS, state.damage)
    }
}
