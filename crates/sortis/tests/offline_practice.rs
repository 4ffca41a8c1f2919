//! Practice battles against the offline engine, played to the end.

use sortis::networking::{decode_roll, ApiError, BattleApi};
use sortis::{OfflineEngine, OutcomeReconciler, ReconcilerConfig, SkillEffectQueue, OFFLINE_HASH};
use sortis_core::{evaluate, BattleRules, BattleStatus, CoreError, SkillId, TurnActor};
use sortis_shared::{BattleType, StartBattleRequest};
use std::time::Instant;

fn start(engine: &mut OfflineEngine, skills: Vec<SkillId>) -> u64 {
    engine
        .start_battle(&StartBattleRequest {
            player_id: 3,
            battle_type: BattleType::Pve,
            floor: Some(1),
            equipped_skills: skills,
        })
        .unwrap()
        .battle_id
}

#[test]
fn test_battles_end_within_the_turn_cap() {
    for seed in 0..20 {
        let mut engine = OfflineEngine::new(BattleRules::default(), seed);
        let id = start(&mut engine, vec![]);
        let mut player_hp = 100;
        let mut enemy_hp: u32 = 100;
        let mut rounds = 0;

        let last = loop {
            let response = engine.roll(id).unwrap();
            rounds += 1;
            assert_eq!(response.hash, OFFLINE_HASH);
            let (dice, hand) = decode_roll(&response).unwrap();
            assert_eq!(hand, evaluate(&dice));
            assert_eq!(response.enemy_hp, enemy_hp.saturating_sub(hand.power));
            enemy_hp = response.enemy_hp;
            if let Some(enemy) = &response.enemy_turn {
                assert_eq!(response.player_hp, player_hp - enemy.damage.min(player_hp));
            } else {
                assert_eq!(response.status, BattleStatus::Victory);
            }
            player_hp = response.player_hp;
            assert_eq!(response.current_turn, TurnActor::Player);
            if response.status.is_terminal() {
                break response;
            }
        };

        assert!(rounds <= 10, "seed {seed}: {rounds} rounds");
        match last.status {
            BattleStatus::Victory => assert_eq!(last.enemy_hp, 0),
            BattleStatus::Defeat => assert_eq!(last.player_hp, 0),
            BattleStatus::Draw => assert_eq!(rounds, 10),
            BattleStatus::Ongoing => unreachable!(),
        }
        assert!(matches!(
            engine.roll(id),
            Err(ApiError::Rules(CoreError::BattleFinished { .. }))
        ));
        assert_eq!(engine.battle_status(id).unwrap().status, last.status);
    }
}

#[test]
fn test_skill_notices_and_dice_follow_each_roll() {
    let mut engine = OfflineEngine::new(BattleRules::default(), 12)
        .with_enemy_skills(vec![5])
        .unwrap();
    let id = start(&mut engine, vec![2, 3, 4]);
    let mut dice = OutcomeReconciler::new(ReconcilerConfig::default(), 12);
    let mut notices = SkillEffectQueue::new();
    let now = Instant::now();

    let mut fired = 0;
    for _ in 0..10 {
        let response = engine.roll(id).unwrap();
        let (rolled, _) = decode_roll(&response).unwrap();
        assert_eq!(dice.resolve_toward(rolled), rolled);
        assert!(!response.dice.contains(&1));

        fired += response.skill_activations.len();
        notices.notify_all(&response.skill_activations, now);
        if response.status.is_terminal() {
            break;
        }
    }
    assert_eq!(notices.len() + usize::from(notices.is_showing()), fired);
}
