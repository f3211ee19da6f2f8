//! Obstacles
//!
//! Hazards scroll toward the player along -X. The first overlap with the
//! player damages it, knocks it back and reports an `ObstacleHitEvent`; the
//! `has_collided` latch makes every later overlap a no-op.

use tracing::debug;

use crate::config::ObstacleSettings;
use crate::math::Vec3;
use super::collision::Collider;
use super::entity::Entity;
use super::event::ObstacleHitEvent;
use super::player::PlayerCharacter;
use super::services::FrameContext;

/// What the world should do with a hazard after its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardStep {
    Active,
    /// Crossed the despawn boundary
    OutOfBounds,
}

/// When to destroy a hazard after its one-shot effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestroyRequest {
    Now,
    After(f32),
}

impl DestroyRequest {
    /// Map a configured delay to a request (zero or less means now)
    pub fn from_delay(delay: f32) -> Self {
        if delay > 0.0 {
            DestroyRequest::After(delay)
        } else {
            DestroyRequest::Now
        }
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub position: Vec3,
    pub collider: Collider,
    pub movement_speed: f32,
    pub damage: f32,
    pub despawn_x: f32,
    pub knockback_strength: f32,
    pub knockback_lift: f32,
    pub destroy_delay: Option<f32>,
    pub collision_cue: Option<String>,
    /// Time since spawn
    elapsed: f32,
    has_collided: bool,
}

impl Obstacle {
    pub fn new(position: Vec3, settings: &ObstacleSettings) -> Self {
        Self {
            position,
            collider: Collider::cuboid(settings.half_extents),
            movement_speed: settings.movement_speed,
            damage: settings.damage,
            despawn_x: settings.despawn_x,
            knockback_strength: settings.knockback_strength,
            knockback_lift: settings.knockback_lift,
            destroy_delay: settings.destroy_delay,
            collision_cue: settings.collision_cue.clone(),
            elapsed: 0.0,
            has_collided: false,
        }
    }

    pub fn has_collided(&self) -> bool {
        self.has_collided
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn tick(&mut self, delta_time: f32) -> HazardStep {
        self.position.x -= self.movement_speed * delta_time;
        self.elapsed += delta_time;

        if self.position.x < self.despawn_x {
            HazardStep::OutOfBounds
        } else {
            HazardStep::Active
        }
    }

    /// React to touching the player. Fires at most once per obstacle;
    /// returns the destruction request if this call fired and the obstacle
    /// is configured to go away after a hit.
    pub fn on_player_overlap(
        &mut self,
        this: Entity,
        player: &mut PlayerCharacter,
        ctx: &mut FrameContext,
    ) -> Option<DestroyRequest> {
        if self.has_collided {
            return None;
        }
        self.has_collided = true;

        ctx.events.obstacle_hit.send(ObstacleHitEvent {
            obstacle: this,
            other: player.id(),
        });
        player.take_damage(self.damage, ctx);
        ctx.play(self.collision_cue.as_deref(), self.position);

        let away = (player.position() - self.position).normalize();
        player.launch(away * self.knockback_strength + Vec3::UP * self.knockback_lift);

        debug!(obstacle = %this, player = %player.id(), damage = self.damage, "obstacle hit player");
        self.destroy_delay.map(DestroyRequest::from_delay)
    }
}
