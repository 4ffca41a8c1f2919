//! Skill effect notifications: one on screen at a time, each for its own
//! duration, the rest waiting in arrival order.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use sortis_core::{SkillActivation, SkillId};
use tracing::{debug, warn};

/// How long a notification stays up unless told otherwise.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_millis(3_000);

/// Waiting notifications kept before new ones are dropped.
const MAX_PENDING_NOTICES: usize = 64;

/// A notification about a skill that fired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkillNotice {
    /// Skill.
    pub skill_id: SkillId,
    /// Display name.
    pub name: String,
    /// What the skill did.
    pub description: String,
    /// Time on screen.
    pub duration: Duration,
}

impl SkillNotice {
    /// Notice for an activation, shown for the default duration.
    #[must_use]
    pub fn from_activation(activation: &SkillActivation) -> Self {
        Self {
            skill_id: activation.skill_id,
            name: activation.name.clone(),
            description: activation.description.clone(),
            duration: DEFAULT_NOTICE_DURATION,
        }
    }
}

/// FIFO of skill notices, driven by [`SkillEffectQueue::tick`].
#[derive(Debug, Default)]
pub struct SkillEffectQueue {
    pending: VecDeque<SkillNotice>,
    /// Notice on screen and the instant it comes down.
    current: Option<(SkillNotice, Instant)>,
}

impl SkillEffectQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notice. Shown right away if nothing is up.
    pub fn push(&mut self, notice: SkillNotice, now: Instant) {
        if self.pending.len() >= MAX_PENDING_NOTICES {
            warn!(skill_id = notice.skill_id, "notice queue full, dropping");
            return;
        }
        self.pending.push_back(notice);
        if self.current.is_none() {
            self.advance(now);
        }
    }

    /// Queues a notice for every activation, in order.
    pub fn notify_all(&mut self, activations: &[SkillActivation], now: Instant) {
        for activation in activations {
            self.push(SkillNotice::from_activation(activation), now);
        }
    }

    fn advance(&mut self, start: Instant) {
        self.current = self
            .pending
            .pop_front()
            .map(|notice| {
                let until = start + notice.duration;
                (notice, until)
            });
        if let Some((notice, _)) = &self.current {
            debug!(skill_id = notice.skill_id, name = %notice.name, "showing skill notice");
        }
    }

    /// Retires expired notices and returns the one on screen.
    ///
    /// The next notice starts when the previous one expired, not when
    /// `tick` happened to run.
    pub fn tick(&mut self, now: Instant) -> Option<&SkillNotice> {
        while let Some((_, until)) = self.current {
            if until > now {
                break;
            }
            self.advance(until);
        }
        self.current()
    }

    /// Notice on screen.
    #[must_use]
    pub fn current(&self) -> Option<&SkillNotice> {
        self.current.as_ref().map(|(notice, _)| notice)
    }

    /// True while a notice is up.
    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.current.is_some()
    }

    /// Notices waiting behind the current one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops everything, including the notice on screen.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }
}
