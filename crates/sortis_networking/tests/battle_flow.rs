//! A PvP match between two clients and a scripted referee.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;
use sortis_core::{evaluate, Battle, BattleRules, BattleStatus, DiceTriple, PlayerId, TurnActor};
use sortis_networking::{
    loopback, BattleEvent, BattlePhase, BattleSyncConfig, BattleSynchronizer, LoopbackServer,
    SyncError, TransportSession,
};
use sortis_shared::constants::{
    TOPIC_BATTLE_END, TOPIC_DICE_RESULT, TOPIC_MATCH_FOUND, TOPIC_TURN_START,
};
use sortis_shared::{
    decode_body, BattleEnd, DiceResult, Frame, MatchFound, RewardInfo, RollIntent, TurnStart,
};

const BATTLE: u64 = 31;
const P1: PlayerId = 1;
const P2: PlayerId = 2;

/// Server side: applies rolls in turn order with scripted dice.
struct Referee {
    battle: Battle,
    script: VecDeque<[u8; 3]>,
    seats: Vec<(PlayerId, LoopbackServer)>,
    /// Scale the declared power, to fake a server on another table.
    power_scale: u32,
}

impl Referee {
    fn new(seats: Vec<(PlayerId, LoopbackServer)>, script: &[[u8; 3]]) -> Self {
        Self {
            battle: Battle::new(BATTLE, P1, P2, BattleRules::default()),
            script: script.iter().copied().collect(),
            seats,
            power_scale: 1,
        }
    }

    fn broadcast<T: Serialize>(&self, topic: &str, payload: &T) {
        for (_, server) in &self.seats {
            server.publish(topic, payload);
        }
    }

    fn side_of(player: PlayerId) -> TurnActor {
        if player == P1 {
            TurnActor::Player
        } else {
            TurnActor::Enemy
        }
    }

    fn start(&self) {
        self.broadcast(
            TOPIC_MATCH_FOUND,
            &MatchFound {
                battle_id: BATTLE,
                player1_id: P1,
                player2_id: P2,
                player1_elo: 1200,
                player2_elo: 1180,
                status: "ONGOING".into(),
            },
        );
        self.announce_turn();
    }

    fn announce_turn(&self) {
        self.broadcast(
            TOPIC_TURN_START,
            &TurnStart {
                battle_id: BATTLE,
                current_turn: self.battle.current_turn(),
                turn_number: self.battle.turn_count(),
                time_remaining: 30_000,
            },
        );
    }

    fn pump(&mut self) {
        for i in 0..self.seats.len() {
            let (player, server) = self.seats[i].clone();
            for frame in server.take_sent() {
                if let Frame::Send { destination, body } = frame {
                    if destination == format!("/app/pvp/battles/{BATTLE}/roll") {
                        let intent: RollIntent = decode_body(&body).unwrap();
                        assert_eq!(intent.player_id, player);
                        self.roll(player);
                    }
                }
            }
        }
    }

    fn roll(&mut self, player: PlayerId) {
        let side = Self::side_of(player);
        if self.battle.status().is_terminal() || self.battle.current_turn() != side {
            return;
        }
        let Some(values) = self.script.pop_front() else {
            return;
        };
        let hand = evaluate(&DiceTriple::new(values).unwrap());
        let report = self.battle.strike(side, hand.power).unwrap();
        self.broadcast(
            TOPIC_DICE_RESULT,
            &DiceResult {
                battle_id: BATTLE,
                player_id: player,
                dice: values,
                hand_rank: hand.rank.wire_name().into(),
                hand_rank_kr: hand.rank.name_kr().into(),
                hand_power: hand.power * self.power_scale,
                damage: report.dealt,
                opponent_hp: report.hp_after,
            },
        );

        if self.battle.status().is_terminal() {
            self.broadcast(
                TOPIC_BATTLE_END,
                &BattleEnd {
                    battle_id: BATTLE,
                    result: self.battle.status(),
                    reward: Some(RewardInfo {
                        elo_change: 16,
                        soul_stones: 5,
                        result: self.battle.status().as_str().into(),
                    }),
                },
            );
            return;
        }
        if side == TurnActor::Enemy {
            self.battle.end_round().unwrap();
        }
        self.announce_turn();
    }
}

fn client(player: PlayerId) -> (BattleSynchronizer, LoopbackServer) {
    let (connector, server) = loopback();
    let transport = TransportSession::new(Box::new(connector), player).shared();
    (
        BattleSynchronizer::new(transport, BattleSyncConfig::default()),
        server,
    )
}

#[test]
fn test_match_plays_out_to_victory() {
    let (mut one, server1) = client(P1);
    let (mut two, server2) = client(P2);
    // Player one rolls straights (38), player two rolls low.
    let script = [
        [4, 5, 6],
        [1, 2, 4],
        [6, 4, 5],
        [1, 2, 5],
        [5, 6, 4],
    ];
    let mut referee = Referee::new(vec![(P1, server1), (P2, server2)], &script);
    let now = Instant::now();

    one.activate(now).unwrap();
    two.activate(now).unwrap();
    referee.start();
    one.tick(now).unwrap();
    two.tick(now).unwrap();
    assert_eq!(one.battle_id(), Some(BATTLE));

    let mut turn = 0;
    while one.phase() != BattlePhase::Terminated && turn < 20 {
        let roller = if turn % 2 == 0 { &mut one } else { &mut two };
        roller.send_roll(BATTLE).unwrap();
        referee.pump();
        one.tick(now).unwrap();
        two.tick(now).unwrap();
        turn += 1;
    }

    assert_eq!(one.phase(), BattlePhase::Terminated);
    assert_eq!(two.phase(), BattlePhase::Terminated);
    assert_eq!(referee.battle.status(), BattleStatus::Victory);

    let events = one.events().drain();
    let rolls: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::DiceRolled { hand, .. } => Some(hand.power),
            _ => None,
        })
        .collect();
    assert_eq!(rolls, vec![38, 7, 38, 8, 38]);
    let Some(BattleEvent::BattleEnded(end)) = events.last() else {
        panic!("last event should be the battle end");
    };
    assert_eq!(end.result, BattleStatus::Victory);
    assert_eq!(end.reward.as_ref().unwrap().elo_change, 16);
    assert!(!events.iter().any(|e| matches!(e, BattleEvent::Fault(_))));
}

#[test]
fn test_out_of_turn_roll_is_left_to_the_server() {
    let (mut one, server1) = client(P1);
    let (mut two, server2) = client(P2);
    let mut referee = Referee::new(vec![(P1, server1), (P2, server2)], &[[2, 2, 3]]);
    let now = Instant::now();
    one.activate(now).unwrap();
    two.activate(now).unwrap();
    referee.start();

    // The client does not check turn ownership; the referee ignores it.
    two.send_roll(BATTLE).unwrap();
    referee.pump();
    two.tick(now).unwrap();
    assert!(!two
        .events()
        .drain()
        .iter()
        .any(|e| matches!(e, BattleEvent::DiceRolled { .. })));
    assert_eq!(referee.script.len(), 1);
}

#[test]
fn test_server_on_another_table_is_caught() {
    let (mut one, server1) = client(P1);
    let (mut two, server2) = client(P2);
    let mut referee = Referee::new(vec![(P1, server1), (P2, server2)], &[[1, 1, 1]]);
    referee.power_scale = 4;
    let now = Instant::now();
    one.activate(now).unwrap();
    two.activate(now).unwrap();
    referee.start();

    one.send_roll(BATTLE).unwrap();
    referee.pump();
    let err = one.tick(now).unwrap_err();
    assert!(matches!(err, SyncError::HandDivergence { .. }));
    assert!(err.is_fatal());
    assert_eq!(one.phase(), BattlePhase::Terminated);
    assert!(two.tick(now).is_err());
}
