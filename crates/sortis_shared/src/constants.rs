//! # Protocol Constants
//!
//! Topic names, destinations and timings shared with the server.
//!
//! **CRITICAL:** Topic strings must match the server's routes exactly.
//! A typo here means silently never receiving a message.

use sortis_core::BattleId;

// =============================================================================
// NETWORK CONFIGURATION
// =============================================================================

/// Default real-time endpoint.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:61613";

/// Largest frame accepted from the wire (bytes).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

// =============================================================================
// BATTLE TOPICS (server → client, scoped to the connected player)
// =============================================================================

/// Opponent found; carries the new battle id.
pub const TOPIC_MATCH_FOUND: &str = "/user/queue/match-found";

/// A turn started.
pub const TOPIC_TURN_START: &str = "/user/queue/pvp/turn-start";

/// Someone rolled; carries dice, hand and damage.
pub const TOPIC_DICE_RESULT: &str = "/user/queue/pvp/dice-result";

/// The battle ended.
pub const TOPIC_BATTLE_END: &str = "/user/queue/pvp/battle-end";

/// All battle topics, subscribed together.
pub const BATTLE_TOPICS: [&str; 4] = [
    TOPIC_MATCH_FOUND,
    TOPIC_TURN_START,
    TOPIC_DICE_RESULT,
    TOPIC_BATTLE_END,
];

// =============================================================================
// DRAFT TOPICS
// =============================================================================

/// Full draft state after any change.
pub const TOPIC_DRAFT_STATE: &str = "/user/queue/draft/state";

/// Pick confirmation.
pub const TOPIC_DRAFT_PICK: &str = "/user/queue/draft/pick";

/// Both participants reached the pick cap.
pub const TOPIC_DRAFT_PICKS_COMPLETE: &str = "/user/queue/draft/picks-complete";

/// Both participants ready; final loadouts.
pub const TOPIC_DRAFT_COMPLETE: &str = "/user/queue/draft/complete";

/// Pick clock.
pub const TOPIC_DRAFT_TIMER: &str = "/user/queue/draft/timer";

/// Rejected actions and draft faults.
pub const TOPIC_DRAFT_ERROR: &str = "/user/queue/draft/error";

/// All draft topics, subscribed together.
pub const DRAFT_TOPICS: [&str; 6] = [
    TOPIC_DRAFT_STATE,
    TOPIC_DRAFT_PICK,
    TOPIC_DRAFT_PICKS_COMPLETE,
    TOPIC_DRAFT_COMPLETE,
    TOPIC_DRAFT_TIMER,
    TOPIC_DRAFT_ERROR,
];

// =============================================================================
// OUTBOUND DESTINATIONS (client → server)
// =============================================================================

/// Roll intent for a PvP battle.
#[must_use]
pub fn roll_destination(battle_id: BattleId) -> String {
    format!("/app/pvp/battles/{battle_id}/roll")
}

/// Skill pick for a draft.
#[must_use]
pub fn pick_destination(battle_id: BattleId) -> String {
    format!("/app/draft/{battle_id}/pick")
}

/// Ready signal for a draft.
#[must_use]
pub fn ready_destination(battle_id: BattleId) -> String {
    format!("/app/draft/{battle_id}/ready")
}

// =============================================================================
// TIMINGS
// =============================================================================

/// Battle synchronizer connect poll interval (ms).
pub const BATTLE_RETRY_DELAY_MS: u64 = 1_000;

/// Draft backoff base delay (ms).
pub const DRAFT_BACKOFF_BASE_MS: u64 = 1_000;

/// Draft backoff ceiling (ms).
pub const DRAFT_BACKOFF_CEILING_MS: u64 = 10_000;

/// Draft connect attempts before giving up.
pub const DRAFT_MAX_RETRIES: u32 = 5;

/// Time each participant has per pick (ms).
pub const TIME_PER_PICK_MS: u64 = 30_000;

// =============================================================================
// DRAFT RULES
// =============================================================================

/// Skills each participant drafts.
pub const PICKS_PER_PLAYER: usize = 4;

/// Picks in a full draft.
pub const TOTAL_PICKS: u32 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destinations() {
        assert_eq!(roll_destination(42), "/app/pvp/battles/42/roll");
        assert_eq!(pick_destination(7), "/app/draft/7/pick");
        assert_eq!(ready_destination(7), "/app/draft/7/ready");
    }

    #[test]
    fn test_battle_and_draft_topics_are_disjoint() {
        for topic in BATTLE_TOPICS {
            assert!(!DRAFT_TOPICS.contains(&topic));
        }
    }

    #[test]
    fn test_pick_cap_matches_total() {
        assert_eq!(PICKS_PER_PLAYER as u32 * 2, TOTAL_PICKS);
    }
}
