//! # Hand Evaluation
//!
//! Three dice → (rank, power). This table is the contract with the server:
//! every client and the server must agree on all 216 rolls, so nothing here
//! may depend on state, time or randomness.
//!
//! ## Table (sorted ascending `[a, b, c]`, first match wins)
//!
//! | Pattern | Rank | Power |
//! |---|---|---|
//! | `[1,1,1]` | Ace | 45 |
//! | `a=b=c`, `a≥2` | Triple | `8 + 4a` |
//! | `[4,5,6]` | Straight | 38 |
//! | `[3,4,5]` | Strike | 30 |
//! | `[2,3,4]` | Slash | 24 |
//! | `[1,2,3]` | Storm | 16 |
//! | two equal | Pair | `5 + 2p` |
//! | otherwise | NoHand | `a + b + c` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dice::DiceTriple;
use crate::error::CoreError;

/// Rank of a hand, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandRank {
    /// Three ones.
    Ace,
    /// Three of a kind (2-6).
    Triple,
    /// 4-5-6.
    Straight,
    /// 3-4-5.
    Strike,
    /// 2-3-4.
    Slash,
    /// 1-2-3.
    Storm,
    /// Exactly two equal.
    Pair,
    /// Nothing.
    NoHand,
}

impl HandRank {
    /// All ranks in table order.
    pub const ALL: [Self; 8] = [
        Self::Ace,
        Self::Triple,
        Self::Straight,
        Self::Strike,
        Self::Slash,
        Self::Storm,
        Self::Pair,
        Self::NoHand,
    ];

    /// English display name.
    #[must_use]
    pub const fn name_en(self) -> &'static str {
        match self {
            Self::Ace => "Ace",
            Self::Triple => "Triple",
            Self::Straight => "Straight",
            Self::Strike => "Strike",
            Self::Slash => "Slash",
            Self::Storm => "Storm",
            Self::Pair => "Pair",
            Self::NoHand => "No Hand",
        }
    }

    /// Korean label the server sends as `rankKR`.
    #[must_use]
    pub const fn name_kr(self) -> &'static str {
        match self {
            Self::Ace => "에이스",
            Self::Triple => "트리플",
            Self::Straight => "스트레이트",
            Self::Strike => "스트라이크",
            Self::Slash => "슬래시",
            Self::Storm => "스톰",
            Self::Pair => "페어",
            Self::NoHand => "노 핸드",
        }
    }

    /// Wire name (`ACE`, `NO_HAND`, ...).
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Ace => "ACE",
            Self::Triple => "TRIPLE",
            Self::Straight => "STRAIGHT",
            Self::Strike => "STRIKE",
            Self::Slash => "SLASH",
            Self::Storm => "STORM",
            Self::Pair => "PAIR",
            Self::NoHand => "NO_HAND",
        }
    }

    /// Every power this rank can produce.
    #[must_use]
    pub fn power_range(self) -> &'static [u32] {
        match self {
            Self::Ace => &[45],
            Self::Triple => &[16, 20, 24, 28, 32],
            Self::Straight => &[38],
            Self::Strike => &[30],
            Self::Slash => &[24],
            Self::Storm => &[16],
            Self::Pair => &[7, 9, 11, 13, 15, 17],
            Self::NoHand => &[3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        }
    }
}

impl FromStr for HandRank {
    type Err = CoreError;

    /// Accepts the wire name (`NO_HAND`) and the English name (`NoHand`, `No Hand`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match key.as_str() {
            "ACE" => Ok(Self::Ace),
            "TRIPLE" => Ok(Self::Triple),
            "STRAIGHT" => Ok(Self::Straight),
            "STRIKE" => Ok(Self::Strike),
            "SLASH" => Ok(Self::Slash),
            "STORM" => Ok(Self::Storm),
            "PAIR" => Ok(Self::Pair),
            "NOHAND" => Ok(Self::NoHand),
            _ => Err(CoreError::UnknownRank(s.to_owned())),
        }
    }
}

impl std::fmt::Display for HandRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name_en())
    }
}

/// A classified roll. `power` is the damage it deals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hand {
    /// Rank.
    pub rank: HandRank,
    /// Damage.
    pub power: u32,
}

impl Hand {
    /// Classifies a roll.
    #[inline]
    #[must_use]
    pub fn of(dice: &DiceTriple) -> Self {
        evaluate(dice)
    }
}

/// Classifies three dice. Total over all 216 rolls, order-independent.
#[must_use]
pub fn evaluate(dice: &DiceTriple) -> Hand {
    let [a, b, c] = dice.sorted();
    let (rank, power) = match (a, b, c) {
        (1, 1, 1) => (HandRank::Ace, 45),
        _ if a == b && b == c => (HandRank::Triple, 8 + 4 * u32::from(a)),
        (4, 5, 6) => (HandRank::Straight, 38),
        (3, 4, 5) => (HandRank::Strike, 30),
        (2, 3, 4) => (HandRank::Slash, 24),
        (1, 2, 3) => (HandRank::Storm, 16),
        // Sorted, so the middle die is always the repeated one.
        _ if a == b || b == c => (HandRank::Pair, 5 + 2 * u32::from(b)),
        _ => (HandRank::NoHand, dice.sum()),
    };
    Hand { rank, power }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(values: [u8; 3]) -> DiceTriple {
        DiceTriple::new(values).unwrap()
    }

    /// Every sorted multiset of three dice with its expected hand.
    const TABLE: [([u8; 3], HandRank, u32); 56] = [
        ([1, 1, 1], HandRank::Ace, 45),
        ([1, 1, 2], HandRank::Pair, 7),
        ([1, 1, 3], HandRank::Pair, 7),
        ([1, 1, 4], HandRank::Pair, 7),
        ([1, 1, 5], HandRank::Pair, 7),
        ([1, 1, 6], HandRank::Pair, 7),
        ([1, 2, 2], HandRank::Pair, 9),
        ([1, 2, 3], HandRank::Storm, 16),
        ([1, 2, 4], HandRank::NoHand, 7),
        ([1, 2, 5], HandRank::NoHand, 8),
        ([1, 2, 6], HandRank::NoHand, 9),
        ([1, 3, 3], HandRank::Pair, 11),
        ([1, 3, 4], HandRank::NoHand, 8),
        ([1, 3, 5], HandRank::NoHand, 9),
        ([1, 3, 6], HandRank::NoHand, 10),
        ([1, 4, 4], HandRank::Pair, 13),
        ([1, 4, 5], HandRank::NoHand, 10),
        ([1, 4, 6], HandRank::NoHand, 11),
        ([1, 5, 5], HandRank::Pair, 15),
        ([1, 5, 6], HandRank::NoHand, 12),
        ([1, 6, 6], HandRank::Pair, 17),
        ([2, 2, 2], HandRank::Triple, 16),
        ([2, 2, 3], HandRank::Pair, 9),
        ([2, 2, 4], HandRank::Pair, 9),
        ([2, 2, 5], HandRank::Pair, 9),
        ([2, 2, 6], HandRank::Pair, 9),
        ([2, 3, 3], HandRank::Pair, 11),
        ([2, 3, 4], HandRank::Slash, 24),
        ([2, 3, 5], HandRank::NoHand, 10),
        ([2, 3, 6], HandRank::NoHand, 11),
        ([2, 4, 4], HandRank::Pair, 13),
        ([2, 4, 5], HandRank::NoHand, 11),
        ([2, 4, 6], HandRank::NoHand, 12),
        ([2, 5, 5], HandRank::Pair, 15),
        ([2, 5, 6], HandRank::NoHand, 13),
        ([2, 6, 6], HandRank::Pair, 17),
        ([3, 3, 3], HandRank::Triple, 20),
        ([3, 3, 4], HandRank::Pair, 11),
        ([3, 3, 5], HandRank::Pair, 11),
        ([3, 3, 6], HandRank::Pair, 11),
        ([3, 4, 4], HandRank::Pair, 13),
        ([3, 4, 5], HandRank::Strike, 30),
        ([3, 4, 6], HandRank::NoHand, 13),
        ([3, 5, 5], HandRank::Pair, 15),
        ([3, 5, 6], HandRank::NoHand, 14),
        ([3, 6, 6], HandRank::Pair, 17),
        ([4, 4, 4], HandRank::Triple, 24),
        ([4, 4, 5], HandRank::Pair, 13),
        ([4, 4, 6], HandRank::Pair, 13),
        ([4, 5, 5], HandRank::Pair, 15),
        ([4, 5, 6], HandRank::Straight, 38),
        ([4, 6, 6], HandRank::Pair, 17),
        ([5, 5, 5], HandRank::Triple, 28),
        ([5, 5, 6], HandRank::Pair, 15),
        ([5, 6, 6], HandRank::Pair, 17),
        ([6, 6, 6], HandRank::Triple, 32),
    ];

    fn expected(values: [u8; 3]) -> (HandRank, u32) {
        let mut sorted = values;
        sorted.sort_unstable();
        TABLE
            .iter()
            .find(|(key, _, _)| *key == sorted)
            .map(|(_, rank, power)| (*rank, *power))
            .unwrap()
    }

    #[test]
    fn test_all_216_rolls_match_table() {
        let mut checked = 0;
        for a in 1..=6 {
            for b in 1..=6 {
                for c in 1..=6 {
                    let hand = evaluate(&triple([a, b, c]));
                    let (rank, power) = expected([a, b, c]);
                    assert_eq!(hand.rank, rank, "rank for [{a}, {b}, {c}]");
                    assert_eq!(hand.power, power, "power for [{a}, {b}, {c}]");
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 216);
    }

    #[test]
    fn test_powers_stay_in_rank_range() {
        for (values, _, _) in TABLE {
            let hand = evaluate(&triple(values));
            assert!(
                hand.rank.power_range().contains(&hand.power),
                "{values:?} gave {} {}",
                hand.rank,
                hand.power
            );
        }
    }

    #[test]
    fn test_named_scenarios() {
        assert_eq!(
            evaluate(&triple([4, 4, 2])),
            Hand { rank: HandRank::Pair, power: 13 }
        );
        assert_eq!(
            evaluate(&triple([1, 2, 3])),
            Hand { rank: HandRank::Storm, power: 16 }
        );
        assert_eq!(
            evaluate(&triple([4, 5, 6])),
            Hand { rank: HandRank::Straight, power: 38 }
        );
        assert_eq!(
            evaluate(&triple([6, 5, 4])),
            Hand { rank: HandRank::Straight, power: 38 }
        );
    }

    #[test]
    fn test_rank_parsing_accepts_wire_and_display_names() {
        for rank in HandRank::ALL {
            assert_eq!(rank.wire_name().parse::<HandRank>().unwrap(), rank);
            assert_eq!(rank.name_en().parse::<HandRank>().unwrap(), rank);
        }
        assert!("FULL_HOUSE".parse::<HandRank>().is_err());
    }

    #[test]
    fn test_korean_labels() {
        assert_eq!(HandRank::Ace.name_kr(), "에이스");
        assert_eq!(HandRank::NoHand.name_kr(), "노 핸드");
    }
}
