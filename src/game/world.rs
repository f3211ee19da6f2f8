//! Game World
//!
//! The World owns every runner entity and its components:
//! - Entity allocation and lifetime tracking
//! - One component storage per entity kind (player, obstacle, collectible)
//! - Deferred despawn (to avoid invalidating a system mid-iteration)
//! - Delayed destruction through the timer table
//!
//! Storage is indexed by slot, so every lookup checks the id's generation
//! first. A stale id simply resolves to nothing.

use tracing::debug;

use crate::config::{CollectibleSettings, ObstacleSettings, PlayerSettings};
use crate::math::Vec3;
use super::collectible::{Collectible, CollectibleKind};
use super::component::ComponentStorage;
use super::entity::{Entity, EntityAllocator};
use super::obstacle::{DestroyRequest, Obstacle};
use super::player::PlayerCharacter;
use super::timer::{TimerAction, TimerHandle, Timers};

/// Container for all runner entities and their components.
pub struct World {
    /// Allocates ids and tracks which are alive
    entities: EntityAllocator,

    /// Entities queued for despawn at end of tick
    despawn_queue: Vec<Entity>,

    /// Pending delayed destruction, at most one per entity
    scheduled_despawns: ComponentStorage<TimerHandle>,

    // Component storages, one per entity kind. Systems walk these directly;
    // everything else should go through the generation-checked lookups.
    pub players: ComponentStorage<PlayerCharacter>,
    pub obstacles: ComponentStorage<Obstacle>,
    pub collectibles: ComponentStorage<Collectible>,

    /// Set by the game manager; freezes entity ticks and timers
    paused: bool,
}

impl World {
    /// Create an empty, unpaused world
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            despawn_queue: Vec::new(),
            scheduled_despawns: ComponentStorage::new(),
            players: ComponentStorage::new(),
            obstacles: ComponentStorage::new(),
            collectibles: ComponentStorage::new(),
            paused: false,
        }
    }

    // =========================================================================
    // Spawners
    // =========================================================================

    /// Spawn the runner at `position` with its own copy of the settings.
    /// The world does not enforce a single player; the runtime binds one.
    pub fn spawn_player(&mut self, position: Vec3, settings: PlayerSettings) -> Entity {
        let entity = self.entities.allocate();
        self.players.insert(entity, PlayerCharacter::new(entity, position, settings));
        debug!(entity = %entity, "spawned player");
        entity
    }

    /// Spawn an obstacle that will scroll toward -X from `position`
    pub fn spawn_obstacle(&mut self, position: Vec3, settings: &ObstacleSettings) -> Entity {
        let entity = self.entities.allocate();
        self.obstacles.insert(entity, Obstacle::new(position, settings));
        entity
    }

    /// Spawn a pickup of `kind`; points and power-up come from `settings`
    pub fn spawn_collectible(
        &mut self,
        kind: CollectibleKind,
        position: Vec3,
        settings: &CollectibleSettings,
    ) -> Entity {
        let entity = self.entities.allocate();
        self.collectibles.insert(entity, Collectible::new(kind, position, settings));
        entity
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Check if an entity id is alive (generation matches)
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities of every kind
    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    /// Live id occupying a storage slot
    pub fn entity_at(&self, index: u32) -> Option<Entity> {
        self.entities.entity_at(index)
    }

    /// Player component of a live entity
    pub fn player(&self, entity: Entity) -> Option<&PlayerCharacter> {
        if !self.is_alive(entity) {
            return None;
        }
        self.players.get(entity)
    }

    pub fn player_mut(&mut self, entity: Entity) -> Option<&mut PlayerCharacter> {
        if !self.is_alive(entity) {
            return None;
        }
        self.players.get_mut(entity)
    }

    /// Obstacle component of a live entity
    pub fn obstacle(&self, entity: Entity) -> Option<&Obstacle> {
        if !self.is_alive(entity) {
            return None;
        }
        self.obstacles.get(entity)
    }

    pub fn obstacle_mut(&mut self, entity: Entity) -> Option<&mut Obstacle> {
        if !self.is_alive(entity) {
            return None;
        }
        self.obstacles.get_mut(entity)
    }

    /// Collectible component of a live entity
    pub fn collectible(&self, entity: Entity) -> Option<&Collectible> {
        if !self.is_alive(entity) {
            return None;
        }
        self.collectibles.get(entity)
    }

    pub fn collectible_mut(&mut self, entity: Entity) -> Option<&mut Collectible> {
        if !self.is_alive(entity) {
            return None;
        }
        self.collectibles.get_mut(entity)
    }

    /// World position of any live entity, whatever its kind
    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.player(entity)
            .map(|p| p.position())
            .or_else(|| self.obstacle(entity).map(|o| o.position))
            .or_else(|| self.collectible(entity).map(|c| c.position))
    }

    /// Move an entity. The player is also recentred in its lane and put at
    /// rest. Returns false for a dead id.
    pub fn reposition(&mut self, entity: Entity, position: Vec3) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        if let Some(player) = self.players.get_mut(entity) {
            player.reset_to(position);
        } else if let Some(obstacle) = self.obstacles.get_mut(entity) {
            obstacle.position = position;
        } else if let Some(collectible) = self.collectibles.get_mut(entity) {
            collectible.position = position;
        } else {
            return false;
        }
        true
    }

    // =========================================================================
    // Pause
    // =========================================================================

    /// Freeze or unfreeze entity ticks and timers. Driven by the game
    /// manager's Paused and GameOver states.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Whether the simulation is currently frozen
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // =========================================================================
    // Despawn
    // =========================================================================

    /// Queue an entity for despawn at end of tick.
    ///
    /// The entity stays alive (and visible to lookups) until
    /// `flush_despawns` runs, so systems iterating a storage never see a slot
    /// vanish under them. Queuing twice, or queuing a dead id, does nothing.
    pub fn despawn(&mut self, entity: Entity) {
        if self.is_alive(entity) && !self.despawn_queue.contains(&entity) {
            self.despawn_queue.push(entity);
        }
    }

    /// Whether the entity is waiting for the end-of-tick flush
    pub fn is_despawn_queued(&self, entity: Entity) -> bool {
        self.despawn_queue.contains(&entity)
    }

    /// Is a delayed destruction scheduled for this entity?
    pub fn is_destroy_pending(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.scheduled_despawns.contains(entity)
    }

    /// Destroy now (end of tick) or after a delay. A request while another
    /// is already pending or queued is ignored. Returns whether this call
    /// took effect.
    pub fn destroy(&mut self, entity: Entity, request: DestroyRequest, timers: &mut Timers) -> bool {
        if !self.is_alive(entity) || self.is_despawn_queued(entity) || self.is_destroy_pending(entity) {
            return false;
        }
        match request {
            DestroyRequest::Now => self.despawn(entity),
            DestroyRequest::After(delay) => {
                let handle = timers.schedule(entity, delay, TimerAction::Despawn);
                self.scheduled_despawns.insert(entity, handle);
                debug!(entity = %entity, delay, "destroy scheduled");
            }
        }
        true
    }

    /// Timer callback for `TimerAction::Despawn`. Only the currently
    /// scheduled handle may queue the despawn.
    pub fn fire_scheduled_despawn(&mut self, entity: Entity, handle: TimerHandle) -> bool {
        if !self.is_alive(entity) || self.scheduled_despawns.get(entity) != Some(&handle) {
            return false;
        }
        self.scheduled_despawns.remove(entity);
        self.despawn(entity);
        true
    }

    /// Immediately despawn an entity, clear its components and cancel every
    /// timer it owns. Prefer `despawn()` while systems are running.
    pub fn despawn_immediate(&mut self, entity: Entity, timers: &mut Timers) -> bool {
        if !self.entities.free(entity) {
            return false; // Already dead
        }

        let idx = entity.index();
        self.scheduled_despawns.clear_slot(idx);
        self.players.clear_slot(idx);
        self.obstacles.clear_slot(idx);
        self.collectibles.clear_slot(idx);

        let cancelled = timers.cancel_owned_by(entity);
        debug!(entity = %entity, cancelled, "despawned");
        true
    }

    /// Process all queued despawns. Called at end of tick.
    pub fn flush_despawns(&mut self, timers: &mut Timers) {
        let queue = std::mem::take(&mut self.despawn_queue);
        for entity in queue {
            self.despawn_immediate(entity, timers);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
