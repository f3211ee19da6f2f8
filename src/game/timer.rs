//! Delayed one-shot actions
//!
//! Replaces engine timer callbacks that capture `this`. A scheduled timer is
//! plain data: the owning entity plus a `TimerAction` the runtime interprets
//! when it comes due. Nothing here holds a reference to an entity, so a
//! despawned owner just means the action is cancelled or resolves to nothing.
//!
//! Timers only fire from `advance()`, which the runtime calls at the start of
//! a tick. A timer scheduled during tick N therefore fires in tick N+1 at the
//! earliest, never in the middle of the tick that scheduled it.

use super::entity::Entity;
use super::player::PowerUpKind;

/// Slack for float accumulation when comparing due times.
const DUE_EPSILON: f64 = 1e-6;

/// Identifies one scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// What to do when a timer comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Clear a power-up flag on the owner
    ExpirePowerUp(PowerUpKind),
    /// Destroy the owner (deferred destruction after effects)
    Despawn,
}

/// A timer that came due during `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub owner: Entity,
    pub action: TimerAction,
}

#[derive(Debug, Clone)]
struct PendingTimer {
    handle: TimerHandle,
    owner: Entity,
    due_at: f64,
    action: TimerAction,
}

/// Table of pending one-shot timers on the gameplay clock.
#[derive(Debug, Default)]
pub struct Timers {
    /// Gameplay clock in seconds (stops while paused)
    now: f64,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` on `owner` to run `delay` seconds from now.
    /// Negative or NaN delays are treated as zero.
    pub fn schedule(&mut self, owner: Entity, delay: f32, action: TimerAction) -> TimerHandle {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingTimer {
            handle,
            owner,
            due_at: self.now + delay as f64,
            action,
        });
        handle
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Cancel every timer owned by `owner`. Called when the owner is despawned.
    pub fn cancel_owned_by(&mut self, owner: Entity) -> usize {
        let before = self.pending.len();
        self.pending.retain(|t| t.owner != owner);
        before - self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Seconds until `handle` fires, if it is still pending.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.pending
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| (t.due_at - self.now).max(0.0) as f32)
    }

    /// Move the clock forward and return every timer that came due, in due
    /// order (ties broken by scheduling order).
    pub fn advance(&mut self, delta_time: f32) -> Vec<FiredTimer> {
        if delta_time.is_finite() && delta_time > 0.0 {
            self.now += delta_time as f64;
        }

        let now = self.now;
        let (mut due, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|t| t.due_at <= now + DUE_EPSILON);
        self.pending = keep;

        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter()
            .map(|t| FiredTimer { handle: t.handle, owner: t.owner, action: t.action })
            .collect()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
