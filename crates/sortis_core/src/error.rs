//! # Core Error Types
//!
//! All errors that can occur while applying game rules.

use thiserror::Error;

/// Errors that can occur in the rules layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A die value outside 1..=6.
    #[error("invalid die value: {0} (expected 1-6)")]
    InvalidDieValue(u8),

    /// Tried to apply a turn to a battle that already ended.
    #[error("battle {battle_id} already finished with status {status}")]
    BattleFinished {
        /// The battle.
        battle_id: u64,
        /// Its terminal status.
        status: String,
    },

    /// More skills equipped than the loadout allows.
    #[error("too many skills equipped: {equipped} (max {max})")]
    TooManySkills {
        /// Number of skills requested.
        equipped: usize,
        /// Loadout cap.
        max: usize,
    },

    /// A skill effect could not be applied.
    #[error("skill {skill_id} ({skill_name}) failed: {reason}")]
    SkillEffect {
        /// Skill id.
        skill_id: u64,
        /// Skill display name.
        skill_name: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// A hand rank name that is not part of the table.
    #[error("unknown hand rank: {0}")]
    UnknownRank(String),
}

/// Result type for rules operations.
pub type CoreResult<T> = Result<T, CoreError>;
