//! # Offline Practice Engine
//!
//! Answers the [`BattleApi`] calls locally when the battle service is out
//! of reach. One `roll` resolves a full round:
//!
//! ```text
//! player: BATTLE_START (round 1) → TURN_START → DICE_ROLL → evaluate
//!         → BEFORE_DAMAGE → strike → AFTER_DAMAGE
//! enemy:  same pipeline, skipped if the player already won
//! close:  defeat / turn cap / next round
//! ```
//!
//! Local rolls carry the hash `"offline"` so they are never mistaken for
//! committed server rolls.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sortis_core::{
    Battle, BattleId, BattleRules, BattleStatus, CoreError, DamageReport, DiceTriple, Hand,
    PlayerId, SkillActivation, SkillEngine, SkillId, SkillTrigger, TurnActor, TurnState,
};
use sortis_networking::{hand_result, ApiError, ApiResult, BattleApi};
use sortis_shared::{
    BattleSnapshot, BattleType, EnemyTurnResult, RollResponse, StartBattleRequest,
};
use tracing::{debug, info, warn};

/// Hash reported for locally rolled dice.
pub const OFFLINE_HASH: &str = "offline";

/// Enemy id used for practice opponents.
pub const PRACTICE_ENEMY_ID: PlayerId = 0;

#[derive(Debug)]
struct PracticeBattle {
    battle: Battle,
    player_skills: Vec<SkillId>,
}

/// One side's resolved turn.
struct TurnOutcome {
    dice: DiceTriple,
    hand: Hand,
    damage: u32,
    report: DamageReport,
}

/// Local stand-in for the battle service.
#[derive(Debug)]
pub struct OfflineEngine {
    battles: HashMap<BattleId, PracticeBattle>,
    skills: SkillEngine,
    rng: ChaCha8Rng,
    rules: BattleRules,
    enemy_skills: Vec<SkillId>,
    next_id: BattleId,
}

impl OfflineEngine {
    /// Engine with the built-in skills. `seed` drives every roll.
    #[must_use]
    pub fn new(rules: BattleRules, seed: u64) -> Self {
        Self {
            battles: HashMap::new(),
            skills: SkillEngine::with_builtin_effects(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            rules,
            enemy_skills: Vec::new(),
            next_id: 1,
        }
    }

    /// Gives the practice enemy a loadout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TooManySkills`] for an oversized loadout.
    pub fn with_enemy_skills(mut self, skills: Vec<SkillId>) -> Result<Self, CoreError> {
        SkillEngine::validate_loadout(&skills)?;
        self.enemy_skills = skills;
        Ok(self)
    }

    /// Rules new battles start with.
    #[must_use]
    pub fn rules(&self) -> BattleRules {
        self.rules
    }

    /// A battle in progress or finished.
    #[must_use]
    pub fn battle(&self, battle_id: BattleId) -> Option<&Battle> {
        self.battles.get(&battle_id).map(|b| &b.battle)
    }

    fn snapshot(battle: &Battle) -> BattleSnapshot {
        let player = battle.vitals(TurnActor::Player);
        let enemy = battle.vitals(TurnActor::Enemy);
        BattleSnapshot {
            battle_id: battle.id,
            player_id: battle.player_id,
            enemy_id: battle.enemy_id,
            current_turn: battle.current_turn(),
            player_hp: player.hp,
            enemy_hp: enemy.hp,
            player_shield: player.shield,
            enemy_shield: enemy.shield,
            turn_count: battle.turn_count(),
            status: battle.status(),
        }
    }

    fn play_turn(
        skills: &SkillEngine,
        rng: &mut ChaCha8Rng,
        battle: &mut Battle,
        actor: TurnActor,
        equipped: &[SkillId],
        fired: &mut Vec<SkillActivation>,
    ) -> ApiResult<TurnOutcome> {
        let round = battle.turn_count();
        let mut state = TurnState::new(DiceTriple::roll(rng), actor, round);
        state.actor_hp = battle.vitals(actor).hp;
        state.target_hp = battle.vitals(actor.opponent()).hp;

        // Battle start belongs to the player's opening turn only.
        if round == 1 && actor == TurnActor::Player {
            fired.extend(skills.execute(SkillTrigger::BattleStart, equipped, &mut state, rng)?);
        }
        fired.extend(skills.execute(SkillTrigger::TurnStart, equipped, &mut state, rng)?);
        fired.extend(skills.execute(SkillTrigger::DiceRoll, equipped, &mut state, rng)?);
        let hand = state.evaluate();
        fired.extend(skills.execute(SkillTrigger::BeforeDamage, equipped, &mut state, rng)?);

        let report = battle.strike(actor, state.damage)?;
        state.target_hp = report.hp_after;
        fired.extend(skills.execute(SkillTrigger::AfterDamage, equipped, &mut state, rng)?);

        debug!(
            battle_id = battle.id,
            ?actor,
            dice = %state.dice,
            rank = %hand.rank,
            damage = state.damage,
            "practice turn"
        );
        Ok(TurnOutcome {
            dice: state.dice,
            hand,
            damage: state.damage,
            report,
        })
    }
}

impl BattleApi for OfflineEngine {
    fn start_battle(&mut self, request: &StartBattleRequest) -> ApiResult<BattleSnapshot> {
        if request.battle_type == BattleType::Pvp {
            return Err(ApiError::InvalidRequest(
                "PvP battles need the live server".to_owned(),
            ));
        }
        SkillEngine::validate_loadout(&request.equipped_skills)?;
        for id in &request.equipped_skills {
            if !self.skills.is_registered(*id) {
                warn!(skill_id = id, "equipped skill has no effect offline");
            }
        }

        let battle_id = self.next_id;
        self.next_id += 1;
        let battle = Battle::new(battle_id, request.player_id, PRACTICE_ENEMY_ID, self.rules);
        let snapshot = Self::snapshot(&battle);
        self.battles.insert(
            battle_id,
            PracticeBattle {
                battle,
                player_skills: request.equipped_skills.clone(),
            },
        );
        info!(battle_id, player_id = request.player_id, "practice battle started");
        Ok(snapshot)
    }

    fn roll(&mut self, battle_id: BattleId) -> ApiResult<RollResponse> {
        let practice = self
            .battles
            .get_mut(&battle_id)
            .ok_or(ApiError::BattleNotFound(battle_id))?;
        let battle = &mut practice.battle;
        if battle.status().is_terminal() {
            return Err(ApiError::Rules(CoreError::BattleFinished {
                battle_id,
                status: battle.status().to_string(),
            }));
        }

        let mut fired = Vec::new();
        let player = Self::play_turn(
            &self.skills,
            &mut self.rng,
            battle,
            TurnActor::Player,
            &practice.player_skills,
            &mut fired,
        )?;

        let mut enemy_turn = None;
        if battle.status() != BattleStatus::Victory {
            let enemy = Self::play_turn(
                &self.skills,
                &mut self.rng,
                battle,
                TurnActor::Enemy,
                &self.enemy_skills,
                &mut fired,
            )?;
            enemy_turn = Some(EnemyTurnResult {
                dice: enemy.dice.values(),
                hand: hand_result(enemy.hand),
                damage: enemy.damage,
            });
            battle.end_round()?;
        }

        let snapshot = Self::snapshot(battle);
        if snapshot.status.is_terminal() {
            info!(battle_id, status = %snapshot.status, "practice battle over");
        }
        debug!(
            battle_id,
            hp_after = player.report.hp_after,
            absorbed = player.report.absorbed,
            "round closed"
        );
        Ok(RollResponse {
            dice: player.dice.values(),
            hash: OFFLINE_HASH.to_owned(),
            hand: hand_result(player.hand),
            damage: player.damage,
            player_hp: snapshot.player_hp,
            enemy_hp: snapshot.enemy_hp,
            player_shield: snapshot.player_shield,
            enemy_shield: snapshot.enemy_shield,
            current_turn: snapshot.current_turn,
            status: snapshot.status,
            enemy_turn,
            skill_activations: fired,
        })
    }

    fn battle_status(&self, battle_id: BattleId) -> ApiResult<BattleSnapshot> {
        self.battle(battle_id)
            .map(Self::snapshot)
            .ok_or(ApiError::BattleNotFound(battle_id))
    }
}
