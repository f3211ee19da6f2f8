//! Game Runtime
//!
//! Owns the world, the event queues, the timer table, the game manager and
//! the injected collaborators, and runs the fixed-step simulation.
//!
//! One tick, in order:
//! 1. Fire due timers (power-up expiry, delayed destruction)
//! 2. Game manager (elapsed time, difficulty, health poll)
//! 3. Player (auto-run, motor, state)
//! 4. Obstacles and collectibles (motion, despawn boundary)
//! 5. Overlap tests and one-shot collision effects
//! 6. Flush despawns
//!
//! While the world is paused only the manager runs (and does nothing outside
//! Playing), so timers and entities are frozen. Events accumulate until the
//! embedder drains them.

use tracing::{debug, trace, warn};

use crate::config::GameConfig;
use crate::math::Vec3;
use super::collectible::CollectibleKind;
use super::collision::overlaps;
use super::entity::Entity;
use super::event::Events;
use super::manager::{GameManager, GameState};
use super::obstacle::{DestroyRequest, HazardStep};
use super::player::PlayerCharacter;
use super::services::{
    EffectPlayer, FrameContext, HighScoreStore, NullEffects, NullHighScores, NullScenes, SceneLoader,
};
use super::timer::{TimerAction, Timers};
use super::world::World;

/// Slack when comparing the accumulator against the step length
const STEP_EPSILON: f32 = 1e-6;

/// Capabilities the embedding application provides.
///
/// `Default` wires the null implementations: effects go nowhere, scene
/// requests are dropped and the high score always loads as 0.
pub struct Collaborators {
    /// Plays sound/visual cues at a world location
    pub effects: Box<dyn EffectPlayer>,
    /// Opens scenes for restart and return-to-menu
    pub scenes: Box<dyn SceneLoader>,
    /// Loads and saves the best score
    pub high_scores: Box<dyn HighScoreStore>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            effects: Box::new(NullEffects),
            scenes: Box::new(NullScenes),
            high_scores: Box::new(NullHighScores),
        }
    }
}

/// A running game: entities, events, timers and the state machine on top.
pub struct Runtime {
    /// Every entity and its components
    pub world: World,
    /// Outward events; the embedder drains or clears these between frames
    pub events: Events,
    /// Delayed one-shot actions, fired at the start of a tick
    pub timers: Timers,
    /// Game state, difficulty and high score
    pub manager: GameManager,
    collaborators: Collaborators,
    config: GameConfig,
    /// Real time not yet consumed by fixed steps
    accumulator: f32,
    ticks: u64,
}

impl Runtime {
    /// Create a runtime in `MainMenu` with an empty world.
    ///
    /// The high score is loaded from the collaborators' store right away.
    /// No player exists yet; call `spawn_player` before `start_game`.
    pub fn new(config: GameConfig, mut collaborators: Collaborators) -> Self {
        let mut manager = GameManager::new(config.manager.clone());
        manager.initialize(collaborators.high_scores.as_mut(), None);

        Self {
            world: World::new(),
            events: Events::new(),
            timers: Timers::new(),
            manager,
            collaborators,
            config,
            accumulator: 0.0,
            ticks: 0,
        }
    }

    /// Configuration this runtime was built with
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Fixed steps run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current game state (shorthand for `manager.state()`)
    pub fn state(&self) -> GameState {
        self.manager.state()
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Spawn the runner at the configured start and bind it to the manager.
    pub fn spawn_player(&mut self) -> Entity {
        let player = self
            .world
            .spawn_player(self.config.manager.player_start, self.config.player.clone());
        self.manager.bind_player(Some(player));
        player
    }

    /// Spawn an obstacle with the configured obstacle settings.
    pub fn spawn_obstacle(&mut self, position: Vec3) -> Entity {
        self.world.spawn_obstacle(position, &self.config.obstacle)
    }

    /// Spawn a pickup with the configured collectible settings.
    pub fn spawn_collectible(&mut self, kind: CollectibleKind, position: Vec3) -> Entity {
        self.world.spawn_collectible(kind, position, &self.config.collectible)
    }

    /// Id of the bound player, if any
    pub fn player_entity(&self) -> Option<Entity> {
        self.manager.player()
    }

    /// The bound player, if it is still alive
    pub fn player(&self) -> Option<&PlayerCharacter> {
        self.manager.player().and_then(|p| self.world.player(p))
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Run `f` against the bound player with a frame context. Returns None
    /// when there is no live player.
    pub fn with_player<R>(&mut self, f: impl FnOnce(&mut PlayerCharacter, &mut FrameContext) -> R) -> Option<R> {
        let entity = self.manager.player()?;
        let player = self.world.player_mut(entity)?;
        let mut ctx = FrameContext::new(&mut self.events, &mut self.timers, self.collaborators.effects.as_mut());
        Some(f(player, &mut ctx))
    }

    /// Lane input. All three return whether the input took effect and are
    /// ignored while the world is paused.
    pub fn move_left(&mut self) -> bool {
        !self.world.is_paused() && self.with_player(|p, _| p.move_left()).unwrap_or(false)
    }

    pub fn move_right(&mut self) -> bool {
        !self.world.is_paused() && self.with_player(|p, _| p.move_right()).unwrap_or(false)
    }

    pub fn jump(&mut self) -> bool {
        !self.world.is_paused() && self.with_player(|p, ctx| p.jump(ctx)).unwrap_or(false)
    }

    // =========================================================================
    // Game state
    // =========================================================================

    /// Start a run: reset elapsed time and difficulty, put the runner on the
    /// start line and unpause. Returns false if already Playing.
    pub fn start_game(&mut self) -> bool {
        self.manager.start_game(&mut self.world, &mut self.events)
    }

    /// Playing → Paused. Freezes timers and entities.
    pub fn pause_game(&mut self) -> bool {
        self.manager.pause_game(&mut self.world, &mut self.events)
    }

    /// Paused → Playing.
    pub fn resume_game(&mut self) -> bool {
        self.manager.resume_game(&mut self.world, &mut self.events)
    }

    /// End the run, saving a beaten high score. Returns false when the run
    /// was already over.
    pub fn game_over(&mut self) -> bool {
        self.manager
            .game_over(&mut self.world, &mut self.events, self.collaborators.high_scores.as_mut())
    }

    /// Ask the scene loader to reload the level. The embedder rebuilds the
    /// runtime once the scene is back.
    pub fn restart_game(&mut self) {
        self.manager.restart_game(self.collaborators.scenes.as_mut());
    }

    /// Ask the scene loader for the main menu.
    pub fn return_to_menu(&mut self) {
        self.manager.return_to_menu(self.collaborators.scenes.as_mut());
    }

    // =========================================================================
    // Collisions
    // =========================================================================

    /// Report an overlap detected outside the runtime (e.g. by an engine's
    /// physics). Only hazard/player pairs have an effect.
    pub fn notify_overlap(&mut self, hazard: Entity, other: Entity) {
        if self.manager.player() != Some(other) {
            return;
        }
        if self.world.obstacle(hazard).is_some() {
            self.resolve_obstacle_hit(hazard, other);
        } else if self.world.collectible(hazard).is_some() {
            self.resolve_pickup(hazard, other);
        }
    }

    /// Damage and knock back the player, then apply the obstacle's destroy
    /// request if it has one.
    fn resolve_obstacle_hit(&mut self, obstacle: Entity, player: Entity) {
        if !self.world.is_alive(obstacle) || !self.world.is_alive(player) {
            return;
        }
        let request = {
            let (Some(hazard), Some(runner)) =
                (self.world.obstacles.get_mut(obstacle), self.world.players.get_mut(player))
            else {
                return;
            };
            let mut ctx = FrameContext::new(&mut self.events, &mut self.timers, self.collaborators.effects.as_mut());
            hazard.on_player_overlap(obstacle, runner, &mut ctx)
        };
        if let Some(request) = request {
            self.world.destroy(obstacle, request, &mut self.timers);
        }
    }

    /// Hand the pickup's reward to the player and destroy it this tick.
    fn resolve_pickup(&mut self, collectible: Entity, player: Entity) {
        if !self.world.is_alive(collectible) || !self.world.is_alive(player) {
            return;
        }
        let collected = {
            let (Some(pickup), Some(runner)) =
                (self.world.collectibles.get_mut(collectible), self.world.players.get_mut(player))
            else {
                return;
            };
            let mut ctx = FrameContext::new(&mut self.events, &mut self.timers, self.collaborators.effects.as_mut());
            match pickup.collect(collectible, &mut ctx) {
                Some(reward) => {
                    runner.add_score(reward.points, &mut ctx);
                    if let Some((kind, duration)) = reward.power_up {
                        runner.apply_power_up(kind, duration, &mut ctx);
                    }
                    true
                }
                None => false,
            }
        };
        if collected {
            self.world.destroy(collectible, DestroyRequest::Now, &mut self.timers);
        }
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Feed real elapsed time; runs as many fixed steps as fit, up to the
    /// configured cap. Returns the number of steps run.
    pub fn advance(&mut self, real_delta: f32) -> u32 {
        if !real_delta.is_finite() || real_delta <= 0.0 {
            return 0;
        }
        let step = self.config.runtime.tick_interval;
        let max_steps = self.config.runtime.max_steps_per_advance;

        self.accumulator += real_delta;
        let mut steps = 0;
        while self.accumulator + STEP_EPSILON >= step && steps < max_steps {
            self.tick(step);
            self.accumulator = (self.accumulator - step).max(0.0);
            steps += 1;
        }

        if self.accumulator + STEP_EPSILON >= step {
            warn!(backlog = self.accumulator, "simulation falling behind, dropping time");
            self.accumulator = 0.0;
        }
        steps
    }

    /// Run exactly one step of `delta_time` seconds.
    ///
    /// Normally driven by `advance`; tests and tools call it directly to step
    /// by hand. Non-finite or non-positive steps are ignored.
    pub fn tick(&mut self, delta_time: f32) {
        if !delta_time.is_finite() || delta_time <= 0.0 {
            return;
        }
        self.ticks += 1;

        if !self.world.is_paused() {
            self.fire_timers(delta_time);
        }

        self.manager.tick(
            delta_time,
            &mut self.world,
            &mut self.events,
            self.collaborators.high_scores.as_mut(),
        );

        if !self.world.is_paused() {
            self.tick_player(delta_time);
            self.tick_hazards(delta_time);
            self.resolve_overlaps();
        }

        self.world.flush_despawns(&mut self.timers);
    }

    fn fire_timers(&mut self, delta_time: f32) {
        for fired in self.timers.advance(delta_time) {
            trace!(owner = %fired.owner, action = ?fired.action, "timer fired");
            match fired.action {
                TimerAction::ExpirePowerUp(kind) => {
                    if let Some(player) = self.world.player_mut(fired.owner) {
                        player.expire_power_up(kind, fired.handle);
                    }
                }
                TimerAction::Despawn => {
                    self.world.fire_scheduled_despawn(fired.owner, fired.handle);
                }
            }
        }
    }

    fn tick_player(&mut self, delta_time: f32) {
        let Some(entity) = self.manager.player() else { return };
        let Some(player) = self.world.player_mut(entity) else { return };
        let mut ctx = FrameContext::new(&mut self.events, &mut self.timers, self.collaborators.effects.as_mut());
        player.tick(delta_time, &mut ctx);
    }

    /// Move obstacles and pickups; queue the ones past their despawn line.
    fn tick_hazards(&mut self, delta_time: f32) {
        for idx in self.world.obstacles.indices() {
            let Some(entity) = self.world.entity_at(idx) else { continue };
            let step = match self.world.obstacle_mut(entity) {
                Some(obstacle) => obstacle.tick(delta_time),
                None => continue,
            };
            if step == HazardStep::OutOfBounds {
                self.world.despawn(entity);
            }
        }

        for idx in self.world.collectibles.indices() {
            let Some(entity) = self.world.entity_at(idx) else { continue };
            let step = match self.world.collectible_mut(entity) {
                Some(collectible) => collectible.tick(delta_time),
                None => continue,
            };
            if step == HazardStep::OutOfBounds {
                self.world.despawn(entity);
            }
        }
    }

    /// Test every hazard against the player and apply the first-contact
    /// effects.
    fn resolve_overlaps(&mut self) {
        let Some(player) = self.manager.player() else { return };
        let (position, collider) = match self.world.player(player) {
            // A dead runner no longer collides
            Some(p) if !p.is_dead() => (p.position(), p.collider()),
            _ => return,
        };

        let hits: Vec<Entity> = self
            .world
            .obstacles
            .iter()
            .filter(|(_, o)| !o.has_collided() && overlaps(position, &collider, o.position, &o.collider))
            .filter_map(|(idx, _)| self.world.entity_at(idx))
            .collect();
        for obstacle in hits {
            self.resolve_obstacle_hit(obstacle, player);
        }

        let pickups: Vec<Entity> = self
            .world
            .collectibles
            .iter()
            .filter(|(_, c)| !c.has_been_collected() && overlaps(position, &collider, c.position, &c.collider))
            .filter_map(|(idx, _)| self.world.entity_at(idx))
            .collect();
        for collectible in pickups {
            self.resolve_pickup(collectible, player);
        }

        if !self.events.obstacle_hit.is_empty() || !self.events.collectible_collected.is_empty() {
            debug!(tick = self.ticks, "overlaps resolved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collectible::Collectible;
    use crate::game::player::{CharacterState, PowerUpKind};

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(GameConfig::default(), Collaborators::default());
        rt.spawn_player();
        rt.start_game();
        rt.events.clear_all();
        rt
    }

    #[test]
    fn test_advance_runs_fixed_steps() {
        let mut rt = runtime();
        assert_eq!(rt.advance(0.016), 1);
        assert_eq!(rt.advance(0.008), 0);
        assert_eq!(rt.advance(0.008), 1);
        assert_eq!(rt.ticks(), 2);
        assert_eq!(rt.advance(f32::NAN), 0);
    }

    #[test]
    fn test_advance_caps_steps() {
        let mut rt = runtime();
        assert_eq!(rt.advance(10.0), 8);
        // The backlog was dropped
        assert_eq!(rt.advance(0.001), 0);
    }

    #[test]
    fn test_obstacle_hit_through_tick() {
        let mut rt = runtime();
        let rock = rt.spawn_obstacle(Vec3::new(60.0, 0.0, 0.0));

        rt.tick(0.016);
        rt.tick(0.016);

        let player = rt.player().unwrap();
        assert_eq!(player.health(), 80.0);
        assert_eq!(rt.events.obstacle_hit.len(), 1);
        assert!(rt.world.obstacle(rock).unwrap().has_collided());
    }

    #[test]
    fn test_obstacle_in_other_lane_misses() {
        let mut rt = runtime();
        rt.spawn_obstacle(Vec3::new(60.0, 200.0, 0.0));
        rt.tick(0.016);
        assert!(rt.events.obstacle_hit.is_empty());
        assert_eq!(rt.player().unwrap().health(), 100.0);
    }

    #[test]
    fn test_pickup_scores_and_despawns() {
        let mut rt = runtime();
        let gem = rt.spawn_collectible(CollectibleKind::Gem, Vec3::new(20.0, 0.0, 0.0));

        rt.tick(0.016);

        assert_eq!(rt.player().unwrap().score(), 50);
        assert!(!rt.world.is_alive(gem));
        assert_eq!(rt.events.score_changed.last().map(|e| e.score), Some(50));
    }

    #[test]
    fn test_shield_pickup_grants_invulnerability() {
        let mut rt = runtime();
        rt.spawn_collectible(CollectibleKind::Shield, Vec3::new(20.0, 0.0, 0.0));
        rt.tick(0.016);
        assert!(rt.player().unwrap().is_invulnerable());

        // Expires after its 5 s duration
        for _ in 0..320 {
            rt.tick(0.016);
        }
        assert!(!rt.player().unwrap().is_invulnerable());
    }

    #[test]
    fn test_out_of_bounds_despawn() {
        let mut rt = runtime();
        let rock = rt.spawn_obstacle(Vec3::new(-990.0, 600.0, 0.0));
        rt.tick(0.016);
        rt.tick(0.016);
        assert!(!rt.world.is_alive(rock));
    }

    #[test]
    fn test_collectible_out_of_bounds_despawn() {
        let mut rt = runtime();
        let coin = rt.spawn_collectible(CollectibleKind::Coin, Vec3::new(-995.0, 600.0, 0.0));

        rt.tick(0.016);
        assert!(!rt.world.is_alive(coin));
        assert!(rt.events.collectible_collected.is_empty());
        assert_eq!(rt.player().unwrap().score(), 0);

        let mut gem = Collectible::new(CollectibleKind::Gem, Vec3::new(-995.0, 0.0, 0.0), &rt.config().collectible);
        assert_eq!(gem.tick(0.016), HazardStep::OutOfBounds);
    }

    #[test]
    fn test_pause_freezes_world() {
        let mut rt = runtime();
        let rock = rt.spawn_obstacle(Vec3::new(2000.0, 0.0, 0.0));
        rt.with_player(|p, ctx| p.apply_power_up(PowerUpKind::SpeedBoost, 0.5, ctx));
        rt.pause_game();

        for _ in 0..100 {
            rt.tick(0.016);
        }
        assert_eq!(rt.world.obstacle(rock).unwrap().position.x, 2000.0);
        assert!(rt.player().unwrap().is_speed_boosted());
        assert!(!rt.jump());

        rt.resume_game();
        for _ in 0..40 {
            rt.tick(0.016);
        }
        assert!(!rt.player().unwrap().is_speed_boosted());
    }

    #[test]
    fn test_notify_overlap_ignores_non_player() {
        let mut rt = runtime();
        let rock = rt.spawn_obstacle(Vec3::new(5000.0, 0.0, 0.0));
        let coin = rt.spawn_collectible(CollectibleKind::Coin, Vec3::new(5000.0, 0.0, 0.0));

        rt.notify_overlap(rock, coin);
        assert!(!rt.world.obstacle(rock).unwrap().has_collided());

        let player = rt.player_entity().unwrap();
        rt.notify_overlap(rock, player);
        rt.notify_overlap(rock, player);
        assert_eq!(rt.events.obstacle_hit.len(), 1);
        assert_eq!(rt.player().unwrap().state(), CharacterState::Hit);
    }
}
