//! # Dice
//!
//! A roll is three dice. The raw order is kept because the animation needs
//! to know which physical die shows which value; scoring sorts a copy.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of dice in a roll.
pub const DICE_PER_ROLL: usize = 3;

/// A single die face in 1..=6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DieFace(u8);

impl DieFace {
    /// Lowest face.
    pub const MIN: u8 = 1;
    /// Highest face.
    pub const MAX: u8 = 6;

    /// Validates a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDieValue`] outside 1..=6.
    pub fn new(value: u8) -> CoreResult<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidDieValue(value))
        }
    }

    /// Raw value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Rolls a fair die.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(Self::MIN..=Self::MAX))
    }

    /// Rolls a die restricted to `low..=6`.
    pub fn roll_at_least<R: Rng + ?Sized>(rng: &mut R, low: u8) -> Self {
        let low = low.clamp(Self::MIN, Self::MAX);
        Self(rng.gen_range(low..=Self::MAX))
    }
}

impl TryFrom<u8> for DieFace {
    type Error = CoreError;

    fn try_from(value: u8) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl From<DieFace> for u8 {
    fn from(face: DieFace) -> Self {
        face.0
    }
}

/// Three dice in the order they were rolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 3]", into = "[u8; 3]")]
pub struct DiceTriple([DieFace; DICE_PER_ROLL]);

impl DiceTriple {
    /// Builds a triple from validated faces.
    #[must_use]
    pub const fn from_faces(faces: [DieFace; DICE_PER_ROLL]) -> Self {
        Self(faces)
    }

    /// Validates three raw values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDieValue`] for the first value outside 1..=6.
    pub fn new(values: [u8; DICE_PER_ROLL]) -> CoreResult<Self> {
        Ok(Self([
            DieFace::new(values[0])?,
            DieFace::new(values[1])?,
            DieFace::new(values[2])?,
        ]))
    }

    /// Rolls three fair dice.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self([DieFace::roll(rng), DieFace::roll(rng), DieFace::roll(rng)])
    }

    /// Faces in roll order.
    #[must_use]
    pub const fn faces(&self) -> [DieFace; DICE_PER_ROLL] {
        self.0
    }

    /// Raw values in roll order.
    #[must_use]
    pub fn values(&self) -> [u8; DICE_PER_ROLL] {
        self.0.map(DieFace::value)
    }

    /// Raw values sorted ascending. Scoring works on this view only.
    #[must_use]
    pub fn sorted(&self) -> [u8; DICE_PER_ROLL] {
        let mut values = self.values();
        values.sort_unstable();
        values
    }

    /// Face at `index` (0..3).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<DieFace> {
        self.0.get(index).copied()
    }

    /// Replaces the face at `index`, returning the old one.
    pub fn set(&mut self, index: usize, face: DieFace) -> Option<DieFace> {
        self.0
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, face))
    }

    /// Sum of the three faces.
    #[must_use]
    pub fn sum(&self) -> u32 {
        self.0.iter().map(|f| u32::from(f.value())).sum()
    }
}

impl TryFrom<[u8; DICE_PER_ROLL]> for DiceTriple {
    type Error = CoreError;

    fn try_from(values: [u8; DICE_PER_ROLL]) -> CoreResult<Self> {
        Self::new(values)
    }
}

impl From<DiceTriple> for [u8; DICE_PER_ROLL] {
    fn from(triple: DiceTriple) -> Self {
        triple.values()
    }
}

impl std::fmt::Display for DiceTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c] = self.values();
        write!(f, "[{a}, {b}, {c}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_die_face_bounds() {
        assert!(DieFace::new(0).is_err());
        assert!(DieFace::new(7).is_err());
        for v in 1..=6 {
            assert_eq!(DieFace::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn test_triple_preserves_roll_order() {
        let triple = DiceTriple::new([5, 1, 3]).unwrap();
        assert_eq!(triple.values(), [5, 1, 3]);
        assert_eq!(triple.sorted(), [1, 3, 5]);
        assert_eq!(triple.sum(), 9);
    }

    #[test]
    fn test_roll_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let triple = DiceTriple::roll(&mut rng);
            assert!(triple.values().iter().all(|v| (1..=6).contains(v)));
            let high = DieFace::roll_at_least(&mut rng, 4);
            assert!(high.value() >= 4);
        }
    }

    #[test]
    fn test_array_conversion() {
        let triple = DiceTriple::new([4, 4, 2]).unwrap();
        let raw: [u8; 3] = triple.into();
        assert_eq!(raw, [4, 4, 2]);
        assert!(DiceTriple::try_from([0, 1, 2]).is_err());
    }

    #[test]
    fn test_set_returns_previous_face() {
        let mut triple = DiceTriple::new([1, 2, 3]).unwrap();
        let old = triple.set(1, DieFace::new(6).unwrap());
        assert_eq!(old.map(DieFace::value), Some(2));
        assert_eq!(triple.values(), [1, 6, 3]);
        assert!(triple.set(3, DieFace::new(1).unwrap()).is_none());
    }
}
