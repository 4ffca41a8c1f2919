//! # Damage
//!
//! Shield absorbs first, the rest goes to hp. Both saturate at zero.

use serde::{Deserialize, Serialize};

/// Hp and shield of one side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    /// Hit points.
    pub hp: u32,
    /// Shield points.
    pub shield: u32,
}

/// What a hit did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DamageReport {
    /// Damage requested.
    pub incoming: u32,
    /// Taken by the shield.
    pub absorbed: u32,
    /// Taken by hp (capped at the hp that was left).
    pub dealt: u32,
    /// Hp after the hit.
    pub hp_after: u32,
}

impl Vitals {
    /// Creates vitals.
    #[must_use]
    pub const fn new(hp: u32, shield: u32) -> Self {
        Self { hp, shield }
    }

    /// True once hp reaches zero.
    #[inline]
    #[must_use]
    pub const fn is_down(&self) -> bool {
        self.hp == 0
    }

    /// Applies `amount` damage, shield first.
    pub fn take_damage(&mut self, amount: u32) -> DamageReport {
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let overflow = amount - absorbed;
        let dealt = overflow.min(self.hp);
        self.hp -= dealt;
        DamageReport {
            incoming: amount,
            absorbed,
            dealt,
            hp_after: self.hp,
        }
    }
}
