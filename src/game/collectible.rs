//! Collectibles
//!
//! Pickups scroll along with the obstacles and spin for show. Touching one
//! marks it collected (once), reports the points and asks to be destroyed.
//! The score itself is applied by whoever observes the pickup, which keeps
//! this module free of any player mutation.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::CollectibleSettings;
use crate::math::Vec3;
use super::collision::Collider;
use super::entity::Entity;
use super::event::CollectibleCollectedEvent;
use super::obstacle::HazardStep;
use super::player::PowerUpKind;
use super::services::FrameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleKind {
    Coin,
    Gem,
    Shield,
    SpeedBoost,
}

impl CollectibleKind {
    pub const ALL: [CollectibleKind; 4] = [
        CollectibleKind::Coin,
        CollectibleKind::Gem,
        CollectibleKind::Shield,
        CollectibleKind::SpeedBoost,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CollectibleKind::Coin => "Coin",
            CollectibleKind::Gem => "Gem",
            CollectibleKind::Shield => "Shield",
            CollectibleKind::SpeedBoost => "Speed Boost",
        }
    }

    pub fn points(&self, settings: &CollectibleSettings) -> u32 {
        match self {
            CollectibleKind::Coin => settings.coin_points,
            CollectibleKind::Gem => settings.gem_points,
            CollectibleKind::Shield => settings.shield_points,
            CollectibleKind::SpeedBoost => settings.speed_boost_points,
        }
    }

    /// Power-up granted on pickup, with its duration
    pub fn power_up(&self, settings: &CollectibleSettings) -> Option<(PowerUpKind, f32)> {
        match self {
            CollectibleKind::Shield => Some((PowerUpKind::Invulnerability, settings.shield_duration)),
            CollectibleKind::SpeedBoost => Some((PowerUpKind::SpeedBoost, settings.speed_boost_duration)),
            CollectibleKind::Coin | CollectibleKind::Gem => None,
        }
    }
}

/// Reward handed to the observer of a pickup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub points: u32,
    pub power_up: Option<(PowerUpKind, f32)>,
}

#[derive(Debug, Clone)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub position: Vec3,
    pub collider: Collider,
    pub point_value: u32,
    pub power_up: Option<(PowerUpKind, f32)>,
    pub movement_speed: f32,
    /// Degrees per second; cosmetic only
    pub rotation_speed: f32,
    pub despawn_x: f32,
    pub collect_cue: Option<String>,
    /// Cosmetic spin angle in degrees
    yaw: f32,
    has_been_collected: bool,
}

impl Collectible {
    pub fn new(kind: CollectibleKind, position: Vec3, settings: &CollectibleSettings) -> Self {
        Self {
            kind,
            position,
            collider: Collider::sphere(settings.radius),
            point_value: kind.points(settings),
            power_up: kind.power_up(settings),
            movement_speed: settings.movement_speed,
            rotation_speed: settings.rotation_speed,
            despawn_x: settings.despawn_x,
            collect_cue: settings.collect_cue.clone(),
            yaw: 0.0,
            has_been_collected: false,
        }
    }

    pub fn has_been_collected(&self) -> bool {
        self.has_been_collected
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn tick(&mut self, delta_time: f32) -> HazardStep {
        self.position.x -= self.movement_speed * delta_time;
        self.yaw = (self.yaw + self.rotation_speed * delta_time).rem_euclid(360.0);

        if self.position.x < self.despawn_x {
            HazardStep::OutOfBounds
        } else {
            HazardStep::Active
        }
    }

    /// Collect this pickup. Returns the reward the first time only; the
    /// caller applies it to the player and destroys the pickup.
    pub fn collect(&mut self, this: Entity, ctx: &mut FrameContext) -> Option<Pickup> {
        if self.has_been_collected {
            return None;
        }
        self.has_been_collected = true;

        ctx.events.collectible_collected.send(CollectibleCollectedEvent {
            collectible: this,
            kind: self.kind,
            points: self.point_value,
        });
        ctx.play(self.collect_cue.as_deref(), self.position);
        debug!(collectible = %this, kind = self.kind.label(), points = self.point_value, "collected");

        Some(Pickup {
            points: self.point_value,
            power_up: self.power_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::event::Events;
    use crate::game::services::EffectLog;
    use crate::game::timer::Timers;

    #[test]
    fn test_collect_once() {
        let mut events = Events::new();
        let mut timers = Timers::new();
        let mut effects = EffectLog::default();
        let settings = CollectibleSettings::default();
        let mut gem = Collectible::new(CollectibleKind::Gem, Vec3::ZERO, &settings);
        let me = Entity::new(2, 1);

        let mut ctx = FrameContext::new(&mut events, &mut timers, &mut effects);
        let first = gem.collect(me, &mut ctx);
        let second = gem.collect(me, &mut ctx);

        assert_eq!(first, Some(Pickup { points: 50, power_up: None }));
        assert_eq!(second, None);
        assert!(gem.has_been_collected());
        let collected: Vec<_> = events.collectible_collected.drain().collect();
        assert_eq!(
            collected,
            vec![CollectibleCollectedEvent { collectible: me, kind: CollectibleKind::Gem, points: 50 }]
        );
        assert_eq!(effects.count("sfx/collect"), 1);
    }

    #[test]
    fn test_power_up_kinds() {
        let settings = CollectibleSettings::default();
        assert_eq!(
            CollectibleKind::Shield.power_up(&settings),
            Some((PowerUpKind::Invulnerability, 5.0))
        );
        assert_eq!(
            CollectibleKind::SpeedBoost.power_up(&settings),
            Some((PowerUpKind::SpeedBoost, 5.0))
        );
        assert_eq!(CollectibleKind::Coin.power_up(&settings), None);
        assert_eq!(CollectibleKind::Coin.points(&settings), 10);
    }

    #[test]
    fn test_spin_is_cosmetic() {
        let settings = CollectibleSettings::default();
        let mut coin = Collectible::new(CollectibleKind::Coin, Vec3::new(100.0, 0.0, 0.0), &settings);
        assert_eq!(coin.tick(1.0), HazardStep::Active);
        assert_eq!(coin.yaw(), 180.0);
        coin.tick(1.0);
        assert_eq!(coin.yaw(), 0.0);
        assert_eq!(coin.position.x, -900.0);
        assert_eq!(coin.collider, Collider::sphere(50.0));
    }
}
