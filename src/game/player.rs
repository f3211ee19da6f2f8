//! Player Character
//!
//! The runner itself: health, lane, a tiny kinematic motor for jumps and
//! knockback, timed power-ups and the score. The character state is derived
//! once per tick from health and ground contact:
//!
//! 1. health at zero → `Dead` (terminal)
//! 2. airborne → `Jumping`
//! 3. already `Hit` → stays `Hit` until the next airborne transition
//! 4. otherwise → `Running`
//!
//! Every state change is reported as `(new, old)` on the event queue.
//!
//! The runner never travels along X itself; auto-run only advances the
//! odometer. Knockback pushes it off its track while airborne and landing
//! puts it back on the run line in the center of its lane.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::PlayerSettings;
use crate::math::Vec3;
use super::collision::Collider;
use super::entity::Entity;
use super::event::{CharacterStateChangedEvent, HealthChangedEvent, ScoreChangedEvent};
use super::services::FrameContext;
use super::timer::{TimerAction, TimerHandle};

/// Number of lanes (0 = left, 1 = center, 2 = right)
pub const LANE_COUNT: u8 = 3;
pub const CENTER_LANE: u8 = 1;

/// Below this height above the ground the motor counts as touching it
const GROUND_TOLERANCE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    Idle,
    Running,
    Jumping,
    Hit,
    Dead,
}

impl CharacterState {
    pub fn label(&self) -> &'static str {
        match self {
            CharacterState::Idle => "Idle",
            CharacterState::Running => "Running",
            CharacterState::Jumping => "Jumping",
            CharacterState::Hit => "Hit",
            CharacterState::Dead => "Dead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Invulnerability,
    SpeedBoost,
}

/// Vertical/knockback motion. Stands in for the engine's character movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motor {
    pub velocity: Vec3,
    pub grounded: bool,
    /// Cleared on death
    pub movement_enabled: bool,
    /// Current run speed, base speed times any boost
    pub max_speed: f32,
    /// Distance covered by auto-run
    pub distance: f32,
}

pub struct PlayerCharacter {
    id: Entity,
    settings: PlayerSettings,
    position: Vec3,
    /// Run line and lane center the runner lands back on
    track: Vec3,
    health: f32,
    state: CharacterState,
    lane: u8,
    score: u32,
    motor: Motor,
    /// Pending expiry timer; Some means the power-up is active
    invulnerability: Option<TimerHandle>,
    speed_boost: Option<TimerHandle>,
}

impl PlayerCharacter {
    pub fn new(id: Entity, position: Vec3, settings: PlayerSettings) -> Self {
        let grounded = position.z <= settings.ground_height + GROUND_TOLERANCE;
        Self {
            id,
            position,
            track: position,
            health: settings.max_health,
            state: CharacterState::Running,
            lane: CENTER_LANE,
            score: 0,
            motor: Motor {
                velocity: Vec3::ZERO,
                grounded,
                movement_enabled: true,
                max_speed: settings.movement_speed,
                distance: 0.0,
            },
            invulnerability: None,
            speed_boost: None,
            settings,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Entity {
        self.id
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Where the runner stands once grounded: the run line at its lane center
    pub fn track_position(&self) -> Vec3 {
        Vec3::new(self.track.x, self.track.y, self.settings.ground_height)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.settings.max_health
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn lane(&self) -> u8 {
        self.lane
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn is_grounded(&self) -> bool {
        self.motor.grounded
    }

    pub fn is_dead(&self) -> bool {
        self.state == CharacterState::Dead
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_some()
    }

    pub fn is_speed_boosted(&self) -> bool {
        self.speed_boost.is_some()
    }

    pub fn collider(&self) -> Collider {
        Collider::sphere(self.settings.collision_radius)
    }

    /// Pending expiry timer for a power-up, if active
    pub fn power_up_timer(&self, kind: PowerUpKind) -> Option<TimerHandle> {
        match kind {
            PowerUpKind::Invulnerability => self.invulnerability,
            PowerUpKind::SpeedBoost => self.speed_boost,
        }
    }

    // =========================================================================
    // Damage
    // =========================================================================

    /// Apply damage. Ignored while invulnerable or dead; negative amounts
    /// count as zero.
    pub fn take_damage(&mut self, amount: f32, ctx: &mut FrameContext) {
        if self.is_invulnerable() || self.is_dead() {
            return;
        }
        let amount = if amount.is_nan() { 0.0 } else { amount.max(0.0) };

        let old_health = self.health;
        self.health = (self.health - amount).max(0.0);
        ctx.events.health_changed.send(HealthChangedEvent {
            new_health: self.health,
            old_health,
        });
        ctx.play(self.settings.hit_cue.as_deref(), self.position);
        debug!(player = %self.id, old_health, health = self.health, "player took damage");

        if self.health <= 0.0 {
            self.die(ctx);
        } else {
            self.set_state(CharacterState::Hit, ctx);
        }
    }

    fn die(&mut self, ctx: &mut FrameContext) {
        self.motor.movement_enabled = false;
        self.motor.velocity = Vec3::ZERO;

        // Power-ups can't outlive the runner
        for handle in [self.invulnerability.take(), self.speed_boost.take()].into_iter().flatten() {
            ctx.timers.cancel(handle);
        }
        self.motor.max_speed = self.settings.movement_speed;

        self.set_state(CharacterState::Dead, ctx);
    }

    // =========================================================================
    // Power-ups
    // =========================================================================

    /// Start (or restart) a timed power-up. Re-applying a kind replaces its
    /// pending expiry rather than adding to it.
    pub fn apply_power_up(&mut self, kind: PowerUpKind, duration: f32, ctx: &mut FrameContext) {
        if self.is_dead() || duration.is_nan() || duration <= 0.0 {
            return;
        }
        ctx.play(self.settings.power_up_cue.as_deref(), self.position);

        let slot = match kind {
            PowerUpKind::Invulnerability => &mut self.invulnerability,
            PowerUpKind::SpeedBoost => &mut self.speed_boost,
        };
        if let Some(previous) = slot.take() {
            ctx.timers.cancel(previous);
        }
        *slot = Some(ctx.timers.schedule(self.id, duration, TimerAction::ExpirePowerUp(kind)));

        if kind == PowerUpKind::SpeedBoost {
            self.motor.max_speed = self.settings.movement_speed * self.settings.speed_boost_multiplier;
        }
        debug!(player = %self.id, ?kind, duration, "power-up applied");
    }

    /// Timer callback. Only the currently pending timer of `kind` may clear
    /// it; a superseded handle is ignored.
    pub fn expire_power_up(&mut self, kind: PowerUpKind, handle: TimerHandle) -> bool {
        let slot = match kind {
            PowerUpKind::Invulnerability => &mut self.invulnerability,
            PowerUpKind::SpeedBoost => &mut self.speed_boost,
        };
        if *slot != Some(handle) {
            return false;
        }
        *slot = None;

        if kind == PowerUpKind::SpeedBoost {
            self.motor.max_speed = self.settings.movement_speed;
        }
        debug!(player = %self.id, ?kind, "power-up expired");
        true
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Shift one lane left (-1) or right (+1). Returns whether the runner moved.
    pub fn move_lane(&mut self, direction: i32) -> bool {
        if self.is_dead() || !self.motor.movement_enabled {
            return false;
        }
        let target = match direction {
            -1 if self.lane > 0 => self.lane - 1,
            1 if self.lane + 1 < LANE_COUNT => self.lane + 1,
            _ => return false,
        };
        let shift = direction as f32 * self.settings.lane_width;
        self.lane = target;
        self.position.y += shift;
        self.track.y += shift;
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.move_lane(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.move_lane(1)
    }

    /// Jump if standing on the ground. Returns whether the jump happened.
    pub fn jump(&mut self, ctx: &mut FrameContext) -> bool {
        if !self.motor.grounded || !self.motor.movement_enabled || self.is_dead() {
            return false;
        }
        self.motor.velocity.z = self.settings.jump_force;
        self.motor.grounded = false;

        let old_state = self.state;
        self.state = CharacterState::Jumping;
        ctx.play(self.settings.jump_cue.as_deref(), self.position);
        ctx.events.character_state_changed.send(CharacterStateChangedEvent {
            new_state: CharacterState::Jumping,
            old_state,
        });
        true
    }

    /// Replace the motor velocity, e.g. for obstacle knockback. Horizontal
    /// drift only lasts until the runner lands.
    pub fn launch(&mut self, velocity: Vec3) {
        if !self.motor.movement_enabled || !velocity.is_finite() {
            return;
        }
        self.motor.velocity = velocity;
        if velocity.z > 0.0 {
            self.motor.grounded = false;
        }
    }

    /// Put the runner back at `position` in the center lane, at rest.
    pub fn reset_to(&mut self, position: Vec3) {
        self.position = position;
        self.track = position;
        self.lane = CENTER_LANE;
        self.motor.velocity = Vec3::ZERO;
        self.motor.grounded = position.z <= self.settings.ground_height + GROUND_TOLERANCE;
    }

    // =========================================================================
    // Score
    // =========================================================================

    pub fn add_score(&mut self, amount: u32, ctx: &mut FrameContext) {
        self.score = self.score.saturating_add(amount);
        ctx.events.score_changed.send(ScoreChangedEvent { score: self.score });
    }

    /// Explicit reset, the only way the score goes down
    pub fn reset_score(&mut self, ctx: &mut FrameContext) {
        if self.score != 0 {
            self.score = 0;
            ctx.events.score_changed.send(ScoreChangedEvent { score: 0 });
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    pub fn tick(&mut self, delta_time: f32, ctx: &mut FrameContext) {
        if self.motor.movement_enabled {
            self.motor.distance += self.motor.max_speed * delta_time;
            self.integrate(delta_time);
        }
        self.update_state(ctx);
    }

    fn integrate(&mut self, delta_time: f32) {
        let ground = self.settings.ground_height;

        if self.motor.grounded && self.position.z > ground + GROUND_TOLERANCE {
            self.motor.grounded = false;
        }
        if self.motor.grounded {
            return;
        }

        self.motor.velocity.z -= self.settings.gravity * delta_time;
        self.position += self.motor.velocity * delta_time;

        if self.position.z <= ground {
            // Back onto the run line in the lane center
            self.position = Vec3::new(self.track.x, self.track.y, ground);
            self.motor.velocity = Vec3::ZERO;
            self.motor.grounded = true;
        }
    }

    fn update_state(&mut self, ctx: &mut FrameContext) {
        let next = if self.health <= 0.0 {
            CharacterState::Dead
        } else if !self.motor.grounded {
            CharacterState::Jumping
        } else if self.state == CharacterState::Hit {
            CharacterState::Hit
        } else {
            CharacterState::Running
        };
        self.set_state(next, ctx);
    }

    fn set_state(&mut self, next: CharacterState, ctx: &mut FrameContext) {
        if next == self.state {
            return;
        }
        let old_state = self.state;
        self.state = next;
        ctx.events.character_state_changed.send(CharacterStateChangedEvent {
            new_state: next,
            old_state,
        });
        debug!(player = %self.id, from = old_state.label(), to = next.label(), "character state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::event::Events;
    use crate::game::services::EffectLog;
    use crate::game::timer::Timers;

    struct Harness {
        events: Events,
        timers: Timers,
        effects: EffectLog,
    }

    impl Harness {
        fn new() -> Self {
            Self { events: Events::new(), timers: Timers::new(), effects: EffectLog::default() }
        }

        fn ctx(&mut self) -> FrameContext<'_> {
            FrameContext::new(&mut self.events, &mut self.timers, &mut self.effects)
        }

        /// Advance the clock and deliver power-up expiries like the runtime does
        fn advance(&mut self, player: &mut PlayerCharacter, dt: f32) {
            for fired in self.timers.advance(dt) {
                if let TimerAction::ExpirePowerUp(kind) = fired.action {
                    player.expire_power_up(kind, fired.handle);
                }
            }
        }
    }

    fn player() -> PlayerCharacter {
        PlayerCharacter::new(Entity::new(0, 0), Vec3::ZERO, PlayerSettings::default())
    }

    #[test]
    fn test_damage_to_hit() {
        let mut h = Harness::new();
        let mut p = player();

        p.take_damage(30.0, &mut h.ctx());

        assert_eq!(p.health(), 70.0);
        assert_eq!(p.state(), CharacterState::Hit);
        let health: Vec<_> = h.events.health_changed.drain().collect();
        assert_eq!(health, vec![HealthChangedEvent { new_health: 70.0, old_health: 100.0 }]);
        assert_eq!(h.effects.count("sfx/hit"), 1);
    }

    #[test]
    fn test_lethal_damage() {
        let mut h = Harness::new();
        let mut p = player();
        p.take_damage(80.0, &mut h.ctx());
        h.events.clear_all();

        p.take_damage(25.0, &mut h.ctx());

        assert_eq!(p.health(), 0.0);
        assert_eq!(p.state(), CharacterState::Dead);
        let health: Vec<_> = h.events.health_changed.drain().collect();
        assert_eq!(health, vec![HealthChangedEvent { new_health: 0.0, old_health: 20.0 }]);
        let states: Vec<_> = h.events.character_state_changed.drain().collect();
        assert_eq!(
            states,
            vec![CharacterStateChangedEvent {
                new_state: CharacterState::Dead,
                old_state: CharacterState::Hit,
            }]
        );
        assert!(!p.motor().movement_enabled);
    }

    #[test]
    fn test_invulnerable_ignores_damage() {
        let mut h = Harness::new();
        let mut p = player();
        p.apply_power_up(PowerUpKind::Invulnerability, 3.0, &mut h.ctx());

        for amount in [0.0, 1.0, 30.0, 1000.0] {
            p.take_damage(amount, &mut h.ctx());
        }

        assert_eq!(p.health(), 100.0);
        assert!(h.events.health_changed.is_empty());
    }

    #[test]
    fn test_health_never_negative() {
        let mut h = Harness::new();
        let mut p = player();
        for _ in 0..10 {
            p.take_damage(45.0, &mut h.ctx());
            assert!(p.health() >= 0.0 && p.health() <= p.max_health());
        }
        assert_eq!(p.health(), 0.0);
        // Only three hits landed: 55, 10, 0
        assert_eq!(h.events.health_changed.len(), 3);
    }

    #[test]
    fn test_negative_damage_is_zero() {
        let mut h = Harness::new();
        let mut p = player();
        p.take_damage(-50.0, &mut h.ctx());
        assert_eq!(p.health(), 100.0);
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut h = Harness::new();
        let mut p = player();
        p.take_damage(500.0, &mut h.ctx());
        h.events.clear_all();
        let lane = p.lane();

        p.take_damage(10.0, &mut h.ctx());
        p.apply_power_up(PowerUpKind::SpeedBoost, 5.0, &mut h.ctx());
        p.apply_power_up(PowerUpKind::Invulnerability, 5.0, &mut h.ctx());
        assert!(!p.move_left());
        assert!(!p.move_right());
        assert!(!p.jump(&mut h.ctx()));
        p.tick(0.016, &mut h.ctx());

        assert_eq!(p.state(), CharacterState::Dead);
        assert_eq!(p.lane(), lane);
        assert!(!p.is_speed_boosted());
        assert!(!p.is_invulnerable());
        assert!(h.events.is_empty());
        assert!(h.timers.is_empty());
    }

    #[test]
    fn test_lane_bounds() {
        let mut p = player();
        assert!(p.move_left());
        assert_eq!(p.lane(), 0);
        let y = p.position().y;
        assert!(!p.move_lane(-1));
        assert_eq!(p.lane(), 0);
        assert_eq!(p.position().y, y);

        assert!(p.move_right());
        assert!(p.move_right());
        assert_eq!(p.lane(), 2);
        let y = p.position().y;
        assert!(!p.move_lane(1));
        assert_eq!(p.position().y, y);
        assert_eq!(y, 200.0);
    }

    #[test]
    fn test_lane_direction_must_be_unit() {
        let mut p = player();
        assert!(!p.move_lane(0));
        assert!(!p.move_lane(2));
        assert_eq!(p.lane(), CENTER_LANE);
    }

    #[test]
    fn test_speed_boost_restart() {
        let mut h = Harness::new();
        let mut p = player();

        p.apply_power_up(PowerUpKind::SpeedBoost, 5.0, &mut h.ctx());
        assert_eq!(p.motor().max_speed, 900.0);
        h.advance(&mut p, 3.0);

        // Second application at t=3 → expires at t=8, not t=5
        p.apply_power_up(PowerUpKind::SpeedBoost, 5.0, &mut h.ctx());
        h.advance(&mut p, 2.0);
        assert!(p.is_speed_boosted());
        h.advance(&mut p, 2.0);
        assert!(p.is_speed_boosted());
        h.advance(&mut p, 1.0);
        assert!(!p.is_speed_boosted());
        assert_eq!(p.motor().max_speed, 600.0);
        assert!(h.timers.is_empty());
    }

    #[test]
    fn test_power_ups_have_independent_timers() {
        let mut h = Harness::new();
        let mut p = player();

        p.apply_power_up(PowerUpKind::Invulnerability, 2.0, &mut h.ctx());
        p.apply_power_up(PowerUpKind::SpeedBoost, 10.0, &mut h.ctx());
        h.advance(&mut p, 2.0);

        assert!(!p.is_invulnerable());
        assert!(p.is_speed_boosted());
    }

    #[test]
    fn test_stale_expiry_ignored() {
        let mut h = Harness::new();
        let mut p = player();
        p.apply_power_up(PowerUpKind::Invulnerability, 2.0, &mut h.ctx());
        let first = p.power_up_timer(PowerUpKind::Invulnerability).unwrap();
        p.apply_power_up(PowerUpKind::Invulnerability, 2.0, &mut h.ctx());

        assert!(!p.expire_power_up(PowerUpKind::Invulnerability, first));
        assert!(p.is_invulnerable());
    }

    #[test]
    fn test_zero_duration_power_up_rejected() {
        let mut h = Harness::new();
        let mut p = player();
        p.apply_power_up(PowerUpKind::SpeedBoost, 0.0, &mut h.ctx());
        assert!(!p.is_speed_boosted());
        assert!(h.effects.played.is_empty());
    }

    #[test]
    fn test_jump_and_land() {
        let mut h = Harness::new();
        let mut p = player();

        assert!(p.jump(&mut h.ctx()));
        assert_eq!(p.state(), CharacterState::Jumping);
        assert!(!p.jump(&mut h.ctx()), "no double jump");
        assert_eq!(h.events.character_state_changed.len(), 1);
        assert_eq!(h.effects.count("sfx/jump"), 1);

        // 800 up against 980 gravity lands well within two seconds
        for _ in 0..125 {
            p.tick(0.016, &mut h.ctx());
        }
        assert!(p.is_grounded());
        assert_eq!(p.position().z, 0.0);
        assert_eq!(p.state(), CharacterState::Running);
    }

    #[test]
    fn test_hit_is_sticky_until_airborne() {
        let mut h = Harness::new();
        let mut p = player();
        p.take_damage(10.0, &mut h.ctx());

        for _ in 0..100 {
            p.tick(0.016, &mut h.ctx());
        }
        assert_eq!(p.state(), CharacterState::Hit);

        p.launch(Vec3::new(0.0, 0.0, 300.0));
        p.tick(0.016, &mut h.ctx());
        assert_eq!(p.state(), CharacterState::Jumping);
    }

    #[test]
    fn test_knockback_drift_ends_on_landing() {
        let mut h = Harness::new();
        let mut p = player();

        for _ in 0..4 {
            p.launch(Vec3::new(-500.0, 0.0, 300.0));
            p.tick(0.016, &mut h.ctx());
            assert!(p.position().x < 0.0);
            for _ in 0..60 {
                p.tick(0.016, &mut h.ctx());
            }
            assert!(p.is_grounded());
            assert_eq!(p.position(), Vec3::ZERO);
        }
    }

    #[test]
    fn test_lane_change_mid_air_lands_in_new_lane() {
        let mut h = Harness::new();
        let mut p = player();

        p.launch(Vec3::new(-500.0, 80.0, 300.0));
        p.tick(0.016, &mut h.ctx());
        assert!(p.move_right());
        for _ in 0..60 {
            p.tick(0.016, &mut h.ctx());
        }

        assert!(p.is_grounded());
        assert_eq!(p.position(), Vec3::new(0.0, 100.0, 0.0));
        assert_eq!(p.track_position(), p.position());
    }

    #[test]
    fn test_score_events() {
        let mut h = Harness::new();
        let mut p = player();
        p.add_score(10, &mut h.ctx());
        p.add_score(50, &mut h.ctx());

        assert_eq!(p.score(), 60);
        let totals: Vec<_> = h.events.score_changed.drain().map(|e| e.score).collect();
        assert_eq!(totals, vec![10, 60]);

        p.reset_score(&mut h.ctx());
        assert_eq!(p.score(), 0);
    }

    #[test]
    fn test_auto_run_distance() {
        let mut h = Harness::new();
        let mut p = player();
        p.tick(1.0, &mut h.ctx());
        assert_eq!(p.motor().distance, 600.0);
    }
}
