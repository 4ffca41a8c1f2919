//! # Outcome Reconciler
//!
//! Lets the dice tumble freely, then makes them land on the server's
//! numbers:
//!
//! ```text
//! roll_to(target) ──► launch ──► step(dt) ... step(dt) ──► still? ──► snap to target
//!                                                  │
//!                          set_target(target) ─────┘  (may arrive mid-roll)
//! ```
//!
//! Once every die is still (or the frame budget runs out) each die is laid
//! flat with its target face up and the TARGET triple is reported. The
//! physics only decides how the dice move, never what they show. A free
//! [`OutcomeReconciler::roll`] with no target reports whatever faces the
//! physics left on top.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sortis_core::{DiceTriple, DICE_PER_ROLL};
use tracing::{debug, error, info};

use crate::error::{SortisError, SortisResult};
use crate::physics::DieBody;

/// `[reconciler]` settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Linear and angular speed under which a die counts as still.
    pub stillness_threshold: f32,
    /// Frames before the dice are settled regardless of motion.
    pub max_frames: u32,
    /// Step used by [`OutcomeReconciler::resolve_toward`].
    pub frame_dt: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            stillness_threshold: 0.1,
            max_frames: 600,
            frame_dt: 1.0 / 60.0,
        }
    }
}

/// Three dice and the outcome they must land on.
pub struct OutcomeReconciler {
    config: ReconcilerConfig,
    dice: [DieBody; DICE_PER_ROLL],
    rng: ChaCha8Rng,
    target: Option<DiceTriple>,
    rolling: bool,
    frames: u32,
    last: Option<DiceTriple>,
}

impl OutcomeReconciler {
    /// Creates a reconciler with resting dice. `seed` drives the throws.
    #[must_use]
    pub fn new(config: ReconcilerConfig, seed: u64) -> Self {
        Self {
            config,
            dice: [DieBody::default(); DICE_PER_ROLL],
            rng: ChaCha8Rng::seed_from_u64(seed),
            target: None,
            rolling: false,
            frames: 0,
            last: None,
        }
    }

    /// Settings.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Rigid bodies, for rendering.
    #[must_use]
    pub fn dice(&self) -> &[DieBody; DICE_PER_ROLL] {
        &self.dice
    }

    /// True between a throw and its settle.
    #[must_use]
    pub fn is_rolling(&self) -> bool {
        self.rolling
    }

    /// Outcome the current roll will report, if pinned.
    #[must_use]
    pub fn target(&self) -> Option<DiceTriple> {
        self.target
    }

    /// Outcome of the last settled roll.
    #[must_use]
    pub fn last_result(&self) -> Option<DiceTriple> {
        self.last
    }

    /// Frames simulated in the current roll.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Throws the dice with no pinned outcome (practice mode).
    ///
    /// # Errors
    ///
    /// [`SortisError::RollInProgress`] if the dice are still moving.
    pub fn roll(&mut self) -> SortisResult<()> {
        self.throw(None)
    }

    /// Throws the dice and pins the outcome to `target`.
    ///
    /// # Errors
    ///
    /// [`SortisError::RollInProgress`] if the dice are still moving.
    pub fn roll_to(&mut self, target: DiceTriple) -> SortisResult<()> {
        self.throw(Some(target))
    }

    /// Pins the outcome of the roll in flight. Returns false when nothing
    /// is rolling.
    pub fn set_target(&mut self, target: DiceTriple) -> bool {
        if !self.rolling {
            return false;
        }
        debug!(%target, frame = self.frames, "target pinned mid-roll");
        self.target = Some(target);
        true
    }

    fn throw(&mut self, target: Option<DiceTriple>) -> SortisResult<()> {
        if self.rolling {
            return Err(SortisError::RollInProgress);
        }
        self.launch(target);
        Ok(())
    }

    fn launch(&mut self, target: Option<DiceTriple>) {
        for (lane, die) in self.dice.iter_mut().enumerate() {
            die.launch(lane, &mut self.rng);
        }
        self.target = target;
        self.rolling = true;
        self.frames = 0;
        debug!(target = ?target.map(|t| t.values()), "dice thrown");
    }

    /// Pins the outcome to `target`, throwing first if the dice are at
    /// rest.
    pub fn aim(&mut self, target: DiceTriple) {
        if !self.set_target(target) {
            self.launch(Some(target));
        }
    }

    /// Advances the simulation by `dt` seconds. Returns the outcome on the
    /// frame the dice settle, `None` otherwise.
    pub fn step(&mut self, dt: f32) -> Option<DiceTriple> {
        if !self.rolling {
            return None;
        }
        self.frames += 1;
        for die in &mut self.dice {
            die.step(dt);
        }
        let threshold = self.config.stillness_threshold;
        let still = self.dice.iter().all(|d| d.is_still(threshold));
        if !still && self.frames < self.config.max_frames {
            return None;
        }
        if !still {
            debug!(frames = self.frames, "frame budget spent, forcing settle");
        }
        self.settle()
    }

    fn settle(&mut self) -> Option<DiceTriple> {
        self.rolling = false;
        let outcome = match self.target.take() {
            Some(target) => target,
            None => {
                let mut faces = [0; DICE_PER_ROLL];
                for (face, die) in faces.iter_mut().zip(&self.dice) {
                    *face = die.top_face();
                }
                match DiceTriple::new(faces) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(error = %e, "free roll settled on an impossible face");
                        return None;
                    }
                }
            }
        };
        for (die, face) in self.dice.iter_mut().zip(outcome.values()) {
            die.snap_to(face);
        }
        self.last = Some(outcome);
        info!(%outcome, frames = self.frames, "dice settled");
        Some(outcome)
    }

    /// Runs the dice to rest and reports `target`. Pins a roll already in
    /// flight; otherwise throws first.
    pub fn resolve_toward(&mut self, target: DiceTriple) -> DiceTriple {
        self.aim(target);
        let dt = self.config.frame_dt;
        loop {
            if let Some(outcome) = self.step(dt) {
                return outcome;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(values: [u8; 3]) -> DiceTriple {
        DiceTriple::new(values).unwrap()
    }

    fn run(reconciler: &mut OutcomeReconciler) -> DiceTriple {
        let dt = reconciler.config().frame_dt;
        loop {
            if let Some(outcome) = reconciler.step(dt) {
                return outcome;
            }
        }
    }

    #[test]
    fn test_target_wins_over_physics() {
        let mut reconciler = OutcomeReconciler::new(ReconcilerConfig::default(), 11);
        let target = triple([6, 6, 1]);
        reconciler.roll_to(target).unwrap();
        assert!(reconciler.is_rolling());
        assert_eq!(run(&mut reconciler), target);
        assert!(!reconciler.is_rolling());
        let shown: Vec<u8> = reconciler.dice().iter().map(DieBody::top_face).collect();
        assert_eq!(shown, vec![6, 6, 1]);
        assert!(reconciler.dice().iter().all(|d| d.is_still(0.1)));
    }

    #[test]
    fn test_free_roll_reports_the_faces_on_top() {
        let mut reconciler = OutcomeReconciler::new(ReconcilerConfig::default(), 5);
        reconciler.roll().unwrap();
        let outcome = run(&mut reconciler);
        let shown: Vec<u8> = reconciler.dice().iter().map(DieBody::top_face).collect();
        assert_eq!(outcome.values().to_vec(), shown);
        assert_eq!(reconciler.last_result(), Some(outcome));
    }

    #[test]
    fn test_no_second_throw_while_rolling() {
        let mut reconciler = OutcomeReconciler::new(ReconcilerConfig::default(), 1);
        reconciler.roll().unwrap();
        assert_eq!(reconciler.roll(), Err(SortisError::RollInProgress));
        assert_eq!(
            reconciler.roll_to(triple([1, 2, 3])),
            Err(SortisError::RollInProgress)
        );
    }

    #[test]
    fn test_target_can_arrive_mid_roll() {
        let mut reconciler = OutcomeReconciler::new(ReconcilerConfig::default(), 9);
        reconciler.roll().unwrap();
        for _ in 0..5 {
            assert!(reconciler.step(1.0 / 60.0).is_none());
        }
        let target = triple([4, 5, 6]);
        assert_eq!(reconciler.resolve_toward(target), target);
        assert!(reconciler.frames() > 5);
    }

    #[test]
    fn test_set_target_needs_a_roll() {
        let mut reconciler = OutcomeReconciler::new(ReconcilerConfig::default(), 2);
        assert!(!reconciler.set_target(triple([2, 2, 2])));
        assert!(reconciler.step(0.1).is_none());
    }

    #[test]
    fn test_frame_budget_forces_settle() {
        let config = ReconcilerConfig {
            max_frames: 3,
            ..ReconcilerConfig::default()
        };
        let mut reconciler = OutcomeReconciler::new(config, 4);
        reconciler.roll_to(triple([3, 3, 5])).unwrap();
        assert!(reconciler.step(1.0 / 60.0).is_none());
        assert!(reconciler.step(1.0 / 60.0).is_none());
        assert_eq!(reconciler.step(1.0 / 60.0), Some(triple([3, 3, 5])));
        assert_eq!(reconciler.frames(), 3);
    }
}
