//! # Skill Effect Engine
//!
//! Equipped skills hook into fixed points of a turn and rewrite the turn
//! state in place (dice before evaluation, damage before it is applied).
//!
//! ## Turn pipeline
//!
//! ```text
//! BATTLE_START (turn 1) → TURN_START → DICE_ROLL → evaluate
//!     → BEFORE_DAMAGE → apply damage → AFTER_DAMAGE
//! ```
//!
//! A skill fires at most once per turn. A failing skill is logged and
//! skipped; the remaining skills still run.

pub mod effects;

use std::collections::{HashMap, HashSet};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::battle::TurnActor;
use crate::dice::DiceTriple;
use crate::error::{CoreError, CoreResult};
use crate::hand::{evaluate, Hand};

pub use effects::{HighRoller, LuckyReroll, PairMaster, SafeBet, SteadyHand};

/// Skill identifier.
pub type SkillId = u64;

/// Maximum skills in a loadout.
pub const MAX_EQUIPPED_SKILLS: usize = 4;

/// Point in the turn where a skill fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillTrigger {
    /// Once, on the first turn.
    BattleStart,
    /// Start of every turn.
    TurnStart,
    /// After the dice are rolled, before evaluation.
    DiceRoll,
    /// After evaluation, before damage is applied.
    BeforeDamage,
    /// After damage is applied.
    AfterDamage,
    /// Always on.
    Passive,
}

/// Mutable state of the turn being resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnState {
    /// Current dice.
    pub dice: DiceTriple,
    /// Hand, once evaluated.
    pub hand: Option<Hand>,
    /// Damage about to be (or that was) applied.
    pub damage: u32,
    /// Acting side.
    pub actor: TurnActor,
    /// Round number.
    pub turn_count: u32,
    /// Hp of the acting side.
    pub actor_hp: u32,
    /// Hp of the other side.
    pub target_hp: u32,
    triggered: HashSet<SkillId>,
}

impl TurnState {
    /// Fresh state for one side's turn.
    #[must_use]
    pub fn new(dice: DiceTriple, actor: TurnActor, turn_count: u32) -> Self {
        Self {
            dice,
            hand: None,
            damage: 0,
            actor,
            turn_count,
            actor_hp: 0,
            target_hp: 0,
            triggered: HashSet::new(),
        }
    }

    /// Evaluates the current dice and resets damage to the hand's power.
    pub fn evaluate(&mut self) -> Hand {
        let hand = evaluate(&self.dice);
        self.hand = Some(hand);
        self.damage = hand.power;
        hand
    }

    /// True if `skill_id` already fired this turn.
    #[must_use]
    pub fn has_triggered(&self, skill_id: SkillId) -> bool {
        self.triggered.contains(&skill_id)
    }

    fn mark_triggered(&mut self, skill_id: SkillId) {
        self.triggered.insert(skill_id);
    }
}

/// One skill effect.
pub trait SkillEffect: Send + Sync {
    /// Registry id.
    fn skill_id(&self) -> SkillId;

    /// Display name.
    fn name(&self) -> &'static str;

    /// When it fires.
    fn trigger(&self) -> SkillTrigger;

    /// Extra precondition beyond the trigger.
    fn can_apply(&self, _state: &TurnState) -> bool {
        true
    }

    /// Rewrites the turn state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SkillEffect`] when the state is not what the
    /// effect expects (e.g. no hand yet at `BEFORE_DAMAGE`).
    fn apply(&self, state: &mut TurnState, rng: &mut dyn RngCore) -> CoreResult<()>;

    /// Human-readable summary after applying.
    fn describe(&self, state: &TurnState) -> String;
}

/// A skill that fired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillActivation {
    /// Skill id.
    pub skill_id: SkillId,
    /// Display name.
    pub name: String,
    /// Trigger it fired on.
    pub trigger: SkillTrigger,
    /// What it did.
    pub description: String,
}

/// Registry of skill effects.
#[derive(Default)]
pub struct SkillEngine {
    registry: HashMap<SkillId, Box<dyn SkillEffect>>,
}

impl SkillEngine {
    /// Empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the five built-in skills.
    #[must_use]
    pub fn with_builtin_effects() -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(LuckyReroll));
        engine.register(Box::new(SteadyHand));
        engine.register(Box::new(SafeBet));
        engine.register(Box::new(HighRoller));
        engine.register(Box::new(PairMaster));
        engine
    }

    /// Registers an effect, replacing any previous one with the same id.
    pub fn register(&mut self, effect: Box<dyn SkillEffect>) {
        let id = effect.skill_id();
        let name = effect.name();
        if self.registry.insert(id, effect).is_some() {
            warn!(skill_id = id, name, "skill effect re-registered, overwriting");
        } else {
            debug!(skill_id = id, name, "registered skill effect");
        }
    }

    /// True if `skill_id` has an effect.
    #[must_use]
    pub fn is_registered(&self, skill_id: SkillId) -> bool {
        self.registry.contains_key(&skill_id)
    }

    /// Number of registered effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Display name of a registered skill.
    #[must_use]
    pub fn name_of(&self, skill_id: SkillId) -> Option<&'static str> {
        self.registry.get(&skill_id).map(|e| e.name())
    }

    /// Checks a loadout size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooManySkills`] above [`MAX_EQUIPPED_SKILLS`].
    pub fn validate_loadout(equipped: &[SkillId]) -> CoreResult<()> {
        if equipped.len() > MAX_EQUIPPED_SKILLS {
            return Err(CoreError::TooManySkills {
                equipped: equipped.len(),
                max: MAX_EQUIPPED_SKILLS,
            });
        }
        Ok(())
    }

    /// Runs every equipped skill bound to `trigger`, in loadout order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooManySkills`] for an oversized loadout.
    /// Individual skill failures are logged and skipped.
    pub fn execute(
        &self,
        trigger: SkillTrigger,
        equipped: &[SkillId],
        state: &mut TurnState,
        rng: &mut dyn RngCore,
    ) -> CoreResult<Vec<SkillActivation>> {
        Self::validate_loadout(equipped)?;

        let mut fired = Vec::new();
        for effect in equipped
            .iter()
            .filter_map(|id| self.registry.get(id))
            .filter(|effect| effect.trigger() == trigger)
        {
            let id = effect.skill_id();
            if state.has_triggered(id) || !effect.can_apply(state) {
                continue;
            }

            // Effects mutate a scratch copy so a failure leaves the turn untouched.
            let mut scratch = state.clone();
            match effect.apply(&mut scratch, rng) {
                Ok(()) => {
                    *state = scratch;
                    state.mark_triggered(id);
                    let description = effect.describe(state);
                    info!(skill_id = id, ?trigger, %description, "skill activated");
                    fired.push(SkillActivation {
                        skill_id: id,
                        name: effect.name().to_owned(),
                        trigger,
                        description,
                    });
                }
                Err(e) => {
                    error!(skill_id = id, error = %e, "skill effect failed, skipping");
                }
            }
        }
        Ok(fired)
    }
}

impl std::fmt::Debug for SkillEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.registry.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("SkillEngine").field("skills", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Broken;

    impl SkillEffect for Broken {
        fn skill_id(&self) -> SkillId {
            99
        }
        fn name(&self) -> &'static str {
            "Broken"
        }
        fn trigger(&self) -> SkillTrigger {
            SkillTrigger::DiceRoll
        }
        fn apply(&self, state: &mut TurnState, _rng: &mut dyn RngCore) -> CoreResult<()> {
            state.damage = 999;
            Err(CoreError::SkillEffect {
                skill_id: 99,
                skill_name: "Broken",
                reason: "always fails".into(),
            })
        }
        fn describe(&self, _state: &TurnState) -> String {
            String::new()
        }
    }

    fn state(values: [u8; 3]) -> TurnState {
        TurnState::new(DiceTriple::new(values).unwrap(), TurnActor::Player, 1)
    }

    #[test]
    fn test_builtin_registry() {
        let engine = SkillEngine::with_builtin_effects();
        assert_eq!(engine.len(), 5);
        for id in 1..=5 {
            assert!(engine.is_registered(id));
        }
        assert_eq!(engine.name_of(5), Some("Pair Master"));
    }

    #[test]
    fn test_too_many_skills_rejected() {
        let engine = SkillEngine::with_builtin_effects();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = state([1, 1, 4]);
        let err = engine
            .execute(SkillTrigger::DiceRoll, &[1, 2, 3, 4, 5], &mut s, &mut rng)
            .unwrap_err();
        assert_eq!(err, CoreError::TooManySkills { equipped: 5, max: 4 });
    }

    #[test]
    fn test_only_matching_trigger_fires() {
        let engine = SkillEngine::with_builtin_effects();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = state([1, 1, 4]);
        let fired = engine
            .execute(SkillTrigger::DiceRoll, &[2, 3, 5], &mut s, &mut rng)
            .unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].skill_id, 2);
        assert_eq!(s.dice.values(), [2, 2, 4]);
    }

    #[test]
    fn test_skill_fires_once_per_turn() {
        let engine = SkillEngine::with_builtin_effects();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = state([2, 2, 5]);
        s.evaluate();
        let first = engine
            .execute(SkillTrigger::BeforeDamage, &[5], &mut s, &mut rng)
            .unwrap();
        let second = engine
            .execute(SkillTrigger::BeforeDamage, &[5], &mut s, &mut rng)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(s.damage, 9 + 7);
    }

    #[test]
    fn test_failing_skill_is_skipped() {
        let mut engine = SkillEngine::with_builtin_effects();
        engine.register(Box::new(Broken));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = state([1, 3, 5]);
        let fired = engine
            .execute(SkillTrigger::DiceRoll, &[99, 2], &mut s, &mut rng)
            .unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(s.damage, 0);
        assert_eq!(s.dice.values(), [2, 3, 5]);
    }

    #[test]
    fn test_unknown_skill_ids_ignored() {
        let engine = SkillEngine::with_builtin_effects();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut s = state([3, 3, 3]);
        let fired = engine
            .execute(SkillTrigger::DiceRoll, &[42], &mut s, &mut rng)
            .unwrap();
        assert!(fired.is_empty());
    }
}
