//! # SORTIS Core - The Rules
//!
//! Everything about a dice battle that does not touch the network:
//!
//! - **Dice**: validated faces, roll order preserved
//! - **Hands**: the rank/power table shared with the server
//! - **Damage**: shield first, saturating hp
//! - **Battle**: status machine with a turn cap
//! - **Skills**: trigger-driven effects over a turn state
//!
//! ## Determinism
//!
//! `evaluate` is a pure function. Randomness only enters through an RNG
//! the caller passes in, so seeded runs replay exactly.
//!
//! ## Example
//!
//! ```rust
//! use sortis_core::{evaluate, DiceTriple, HandRank};
//!
//! let hand = evaluate(&DiceTriple::new([4, 4, 2]).unwrap());
//! assert_eq!(hand.rank, HandRank::Pair);
//! assert_eq!(hand.power, 13);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod battle;
pub mod damage;
pub mod dice;
pub mod error;
pub mod hand;
pub mod skill;

pub use battle::{
    Battle, BattleId, BattleRules, BattleStatus, PlayerId, TurnActor, DEFAULT_INITIAL_HP,
    DEFAULT_TURN_CAP,
};
pub use damage::{DamageReport, Vitals};
pub use dice::{DiceTriple, DieFace, DICE_PER_ROLL};
pub use error::{CoreError, CoreResult};
pub use hand::{evaluate, Hand, HandRank};
pub use skill::{
    SkillActivation, SkillEffect, SkillEngine, SkillId, SkillTrigger, TurnState,
    MAX_EQUIPPED_SKILLS,
};
