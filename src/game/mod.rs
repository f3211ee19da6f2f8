//! Game Foundation Module
//!
//! A small ECS-inspired core for the endless runner. No engine types leak in:
//! rendering, audio and scene loading are traits the embedder implements.
//!
//! Key concepts:
//! - Entity: Generational index for safe entity references
//! - Component: Plain data structs (player, obstacle, collectible) per entity
//! - World: Container for all entities and their components
//! - Event: Typed queues the embedder drains each frame
//! - Timer: Delayed actions keyed by owning entity
//!
//! Design philosophy:
//! - Simple over flexible (we know what game we're making)
//! - Entities hold ids, never references to each other
//! - One fixed-order tick in `Runtime`, no system scheduler

pub mod entity;
pub mod component;
pub mod world;
pub mod event;
pub mod timer;
pub mod services;
pub mod collision;
pub mod player;
pub mod obstacle;
pub mod collectible;
pub mod manager;
pub mod runtime;

// Re-export main types
pub use entity::Entity;
pub use world::World;
pub use event::Events;
pub use timer::{TimerAction, TimerHandle, Timers};
pub use services::{EffectPlayer, FrameContext, HighScoreStore, SceneLoader};
pub use player::{CharacterState, PlayerCharacter, PowerUpKind};
pub use obstacle::{DestroyRequest, Obstacle};
pub use collectible::{Collectible, CollectibleKind};
pub use manager::{GameManager, GameState};
pub use runtime::{Collaborators, Runtime};
