//! Cosmic Runner: gameplay core for a three-lane endless runner
//!
//! The crate is engine-agnostic. It simulates the runner, its hazards and
//! pickups, and the game-state machine at a fixed step, and reports what
//! happened through event queues:
//! - Lane changes, jumps and knockback (simple kinematic motor)
//! - Health, damage and timed power-ups
//! - Score, difficulty ramp and high score
//!
//! Rendering, audio and scene loading stay with the embedder, see
//! [`game::services`].

pub mod config;
pub mod game;
pub mod math;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{GameConfig, ConfigError};
pub use game::{Runtime, Collaborators, Events, GameState};
pub use math::Vec3;
