//! Entity Ids with Generational Indices
//!
//! Every runner object (the player, each obstacle, each pickup) is addressed
//! by an `Entity`: a slot index plus a generation counter.
//! - Despawning frees the slot and bumps its generation
//! - A freed slot is reused by the next spawn
//! - Old ids stop resolving because their generation no longer matches
//!
//! Timers and the game manager hold ids, never references, so a despawned
//! obstacle can't be reached through a stale callback.

use serde::{Serialize, Deserialize};

/// Handle to a runner entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index, used to address component storage.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Id that never resolves. Used as the "other actor" of events
    /// that have no counterpart.
    pub const NULL: Entity = Entity { index: u32::MAX, generation: 0 };

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::NULL
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "#null")
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Hands out entity ids and tracks which are alive.
pub struct EntityAllocator {
    generations: Vec<u32>,
    occupied: Vec<bool>,
    /// Freed slots, reused LIFO
    free_indices: Vec<u32>,
    alive_count: u32,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            occupied: Vec::new(),
            free_indices: Vec::new(),
            alive_count: 0,
        }
    }

    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        match self.free_indices.pop() {
            // Generation was already bumped when the slot was freed
            Some(index) => {
                self.occupied[index as usize] = true;
                Entity::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.occupied.push(true);
                Entity::new(index, 0)
            }
        }
    }

    /// Free an entity. Returns false if it was already dead.
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let idx = entity.index as usize;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.occupied[idx] = false;
        self.free_indices.push(entity.index);
        self.alive_count -= 1;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        if entity.is_null() {
            return false;
        }
        let idx = entity.index as usize;
        idx < self.generations.len()
            && self.occupied[idx]
            && self.generations[idx] == entity.generation
    }

    /// Resolve a bare slot index to the live id occupying it.
    pub fn entity_at(&self, index: u32) -> Option<Entity> {
        let generation = *self.generations.get(index as usize)?;
        let entity = Entity::new(index, generation);
        self.is_alive(entity).then_some(entity)
    }

    pub fn alive_count(&self) -> u32 {
        self.alive_count
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
