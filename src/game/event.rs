//! Event System
//!
//! Gameplay code never calls into UI, audio or analytics. It pushes events
//! into typed queues instead, and whoever embeds the runtime drains them once
//! per frame:
//! 1. Obstacle overlap → `ObstacleHitEvent`
//! 2. Player takes damage → `HealthChangedEvent` + `CharacterStateChangedEvent`
//! 3. Manager sees health at zero → `GameStateChangedEvent`
//!
//! Delivery is synchronous (same frame) and handlers run outside the core,
//! so a handler can't re-enter a transition that is still in progress.

use super::entity::Entity;
use super::collectible::CollectibleKind;
use super::manager::GameState;
use super::player::CharacterState;

/// A queue for events of a single type, filled during a tick.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Iterate over events without clearing
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Drain all events (returns iterator and clears queue)
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn last(&self) -> Option<&T> {
        self.events.last()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every outward-facing event the gameplay core produces.
#[derive(Debug, Default)]
pub struct Events {
    pub character_state_changed: EventQueue<CharacterStateChangedEvent>,
    pub health_changed: EventQueue<HealthChangedEvent>,
    pub score_changed: EventQueue<ScoreChangedEvent>,
    pub collectible_collected: EventQueue<CollectibleCollectedEvent>,
    pub obstacle_hit: EventQueue<ObstacleHitEvent>,
    pub game_state_changed: EventQueue<GameStateChangedEvent>,
    pub difficulty_changed: EventQueue<DifficultyChangedEvent>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all event queues. The embedder calls this after draining.
    pub fn clear_all(&mut self) {
        self.character_state_changed.clear();
        self.health_changed.clear();
        self.score_changed.clear();
        self.collectible_collected.clear();
        self.obstacle_hit.clear();
        self.game_state_changed.clear();
        self.difficulty_changed.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.character_state_changed.is_empty()
            && self.health_changed.is_empty()
            && self.score_changed.is_empty()
            && self.collectible_collected.is_empty()
            && self.obstacle_hit.is_empty()
            && self.game_state_changed.is_empty()
            && self.difficulty_changed.is_empty()
    }
}

// =============================================================================
// Event Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterStateChangedEvent {
    pub new_state: CharacterState,
    pub old_state: CharacterState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChangedEvent {
    pub new_health: f32,
    pub old_health: f32,
}

/// Carries the new running total, not the delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChangedEvent {
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectibleCollectedEvent {
    /// The pickup (despawned right after)
    pub collectible: Entity,
    pub kind: CollectibleKind,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleHitEvent {
    pub obstacle: Entity,
    /// What ran into it
    pub other: Entity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateChangedEvent {
    pub state: GameState,
    pub previous: GameState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyChangedEvent {
    pub difficulty: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue() {
        let mut queue: EventQueue<u32> = EventQueue::new();

        queue.send(10);
        queue.send(25);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.last(), Some(&25));

        let collected: Vec<_> = queue.drain().collect();
        assert_eq!(collected, vec![10, 25]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_events_container_clear() {
        let mut events = Events::new();
        assert!(events.is_empty());

        events.score_changed.send(ScoreChangedEvent { score: 10 });
        events.difficulty_changed.send(DifficultyChangedEvent { difficulty: 1.5 });
        assert!(!events.is_empty());

        events.clear_all();
        assert!(events.is_empty());
    }
}
