//! # SORTIS Shared Types
//!
//! Types that cross the wire between client and server:
//!
//! - Topic names, destinations and protocol timings
//! - The socket frame envelope
//! - PvP, REST and draft payload records

pub mod constants;
pub mod draft;
pub mod protocol;

pub use draft::{
    snake_turn, DraftComplete, DraftState, DraftStatus, Participant, PickRequest, PickResponse,
    ReadyRequest, SkillInfo, TimerUpdate,
};
pub use protocol::{
    decode_body, encode_body, BattleEnd, BattleSnapshot, BattleType, DiceResult,
    EnemyTurnResult, Frame, HandResult, MatchFound, RewardInfo, RollIntent, RollResponse,
    StartBattleRequest, SubscriptionId, TurnStart,
};
