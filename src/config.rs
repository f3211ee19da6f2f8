//! Gameplay configuration
//!
//! Tuning lives in RON files, like the rest of the project's data. Every
//! field has a default, so a config file only needs the values it changes:
//!
//! ```ron
//! (
//!     player: (max_health: 150.0),
//!     manager: (difficulty_increase_rate: 0.05),
//! )
//! ```

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::math::Vec3;

/// Validation limits for loaded values
pub mod limits {
    /// Largest speed/force value accepted from a config file
    pub const MAX_MAGNITUDE: f32 = 1_000_000.0;
    /// Upper bound for a single fixed step (seconds)
    pub const MAX_TICK_INTERVAL: f32 = 0.25;
    /// Upper bound on catch-up steps per `advance()` call
    pub const MAX_STEPS_PER_ADVANCE: u32 = 64;
}

/// Error type for config loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(e) => Some(e),
            ConfigError::SerializeError(e) => Some(e),
            ConfigError::ValidationError(_) => None,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Player character tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub max_health: f32,
    /// Base auto-run speed (units/s)
    pub movement_speed: f32,
    /// Upward velocity applied by a jump
    pub jump_force: f32,
    /// Downward acceleration while airborne
    pub gravity: f32,
    /// Lateral distance between neighbouring lanes
    pub lane_width: f32,
    /// Run speed multiplier while SpeedBoost is active
    pub speed_boost_multiplier: f32,
    /// Height of the running surface
    pub ground_height: f32,
    /// Radius of the player's overlap sphere
    pub collision_radius: f32,
    pub jump_cue: Option<String>,
    pub hit_cue: Option<String>,
    pub power_up_cue: Option<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            movement_speed: 600.0,
            jump_force: 800.0,
            gravity: 980.0,
            lane_width: 200.0,
            speed_boost_multiplier: 1.5,
            ground_height: 0.0,
            collision_radius: 40.0,
            jump_cue: Some("sfx/jump".to_string()),
            hit_cue: Some("sfx/hit".to_string()),
            power_up_cue: Some("sfx/power_up".to_string()),
        }
    }
}

/// Obstacle tuning (applied at spawn, may be overridden per instance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleSettings {
    pub damage: f32,
    pub movement_speed: f32,
    /// Obstacles behind this X are destroyed
    pub despawn_x: f32,
    pub knockback_strength: f32,
    pub knockback_lift: f32,
    pub half_extents: Vec3,
    /// Destroy after the hit: None keeps the obstacle, 0 destroys at once,
    /// a positive value waits that many seconds
    pub destroy_delay: Option<f32>,
    pub collision_cue: Option<String>,
}

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self {
            damage: 20.0,
            movement_speed: 500.0,
            despawn_x: -1000.0,
            knockback_strength: 500.0,
            knockback_lift: 300.0,
            half_extents: Vec3::new(50.0, 80.0, 60.0),
            destroy_delay: None,
            collision_cue: Some("sfx/obstacle_hit".to_string()),
        }
    }
}

/// Collectible tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleSettings {
    pub movement_speed: f32,
    /// Cosmetic spin (degrees/s)
    pub rotation_speed: f32,
    pub despawn_x: f32,
    pub radius: f32,
    pub coin_points: u32,
    pub gem_points: u32,
    pub shield_points: u32,
    pub speed_boost_points: u32,
    /// Invulnerability granted by a Shield pickup (seconds)
    pub shield_duration: f32,
    /// SpeedBoost granted by a SpeedBoost pickup (seconds)
    pub speed_boost_duration: f32,
    pub collect_cue: Option<String>,
}

impl Default for CollectibleSettings {
    fn default() -> Self {
        Self {
            movement_speed: 500.0,
            rotation_speed: 180.0,
            despawn_x: -1000.0,
            radius: 50.0,
            coin_points: 10,
            gem_points: 50,
            shield_points: 10,
            speed_boost_points: 10,
            shield_duration: 5.0,
            speed_boost_duration: 5.0,
            collect_cue: Some("sfx/collect".to_string()),
        }
    }
}

/// Game manager tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Difficulty gained per second of play
    pub difficulty_increase_rate: f32,
    pub max_difficulty: f32,
    /// Where `start_game` puts the player
    pub player_start: Vec3,
    /// Scene reopened by `restart_game`
    pub level_scene: String,
    /// Scene opened by `return_to_menu`
    pub main_menu_scene: String,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            difficulty_increase_rate: 0.1,
            max_difficulty: 5.0,
            player_start: Vec3::ZERO,
            level_scene: "CosmicRunner".to_string(),
            main_menu_scene: "MainMenu".to_string(),
        }
    }
}

/// Frame stepping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Fixed step length (seconds)
    pub tick_interval: f32,
    /// Cap on catch-up steps per `advance()` so a long stall can't spiral
    pub max_steps_per_advance: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval: 0.016,
            max_steps_per_advance: 8,
        }
    }
}

/// All gameplay configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player: PlayerSettings,
    pub obstacle: ObstacleSettings,
    pub collectible: CollectibleSettings,
    pub manager: ManagerSettings,
    pub runtime: RuntimeSettings,
}

// =============================================================================
// Validation
// =============================================================================

fn check_positive(value: f32, name: &str) -> Result<(), String> {
    if value.is_finite() && value > 0.0 && value <= limits::MAX_MAGNITUDE {
        Ok(())
    } else {
        Err(format!("{} must be in (0, {}], got {}", name, limits::MAX_MAGNITUDE, value))
    }
}

fn check_non_negative(value: f32, name: &str) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 && value <= limits::MAX_MAGNITUDE {
        Ok(())
    } else {
        Err(format!("{} must be in [0, {}], got {}", name, limits::MAX_MAGNITUDE, value))
    }
}

fn check_finite(value: f32, name: &str) -> Result<(), String> {
    if value.is_finite() && value.abs() <= limits::MAX_MAGNITUDE {
        Ok(())
    } else {
        Err(format!("{} must be finite, got {}", name, value))
    }
}

fn check_vec(v: Vec3, name: &str) -> Result<(), String> {
    check_finite(v.x, &format!("{}.x", name))?;
    check_finite(v.y, &format!("{}.y", name))?;
    check_finite(v.z, &format!("{}.z", name))
}

/// Reject values the simulation can't run with
pub fn validate_config(config: &GameConfig) -> Result<(), ConfigError> {
    validate_inner(config).map_err(ConfigError::ValidationError)
}

fn validate_inner(config: &GameConfig) -> Result<(), String> {
    let p = &config.player;
    check_positive(p.max_health, "player.max_health")?;
    check_non_negative(p.movement_speed, "player.movement_speed")?;
    check_non_negative(p.jump_force, "player.jump_force")?;
    check_positive(p.gravity, "player.gravity")?;
    check_positive(p.lane_width, "player.lane_width")?;
    check_positive(p.speed_boost_multiplier, "player.speed_boost_multiplier")?;
    check_finite(p.ground_height, "player.ground_height")?;
    check_positive(p.collision_radius, "player.collision_radius")?;

    let o = &config.obstacle;
    check_non_negative(o.damage, "obstacle.damage")?;
    check_non_negative(o.movement_speed, "obstacle.movement_speed")?;
    check_finite(o.despawn_x, "obstacle.despawn_x")?;
    check_non_negative(o.knockback_strength, "obstacle.knockback_strength")?;
    check_non_negative(o.knockback_lift, "obstacle.knockback_lift")?;
    check_vec(o.half_extents, "obstacle.half_extents")?;
    if o.half_extents.x <= 0.0 || o.half_extents.y <= 0.0 || o.half_extents.z <= 0.0 {
        return Err("obstacle.half_extents must be positive on every axis".to_string());
    }
    if let Some(delay) = o.destroy_delay {
        check_non_negative(delay, "obstacle.destroy_delay")?;
    }

    let c = &config.collectible;
    check_non_negative(c.movement_speed, "collectible.movement_speed")?;
    check_finite(c.rotation_speed, "collectible.rotation_speed")?;
    check_finite(c.despawn_x, "collectible.despawn_x")?;
    check_positive(c.radius, "collectible.radius")?;
    check_positive(c.shield_duration, "collectible.shield_duration")?;
    check_positive(c.speed_boost_duration, "collectible.speed_boost_duration")?;

    let m = &config.manager;
    check_non_negative(m.difficulty_increase_rate, "manager.difficulty_increase_rate")?;
    check_finite(m.max_difficulty, "manager.max_difficulty")?;
    if m.max_difficulty < 1.0 {
        return Err(format!("manager.max_difficulty must be >= 1.0, got {}", m.max_difficulty));
    }
    check_vec(m.player_start, "manager.player_start")?;
    if m.main_menu_scene.is_empty() || m.level_scene.is_empty() {
        return Err("manager scene names must not be empty".to_string());
    }

    let r = &config.runtime;
    if !(r.tick_interval.is_finite()
        && r.tick_interval > 0.0
        && r.tick_interval <= limits::MAX_TICK_INTERVAL)
    {
        return Err(format!(
            "runtime.tick_interval must be in (0, {}], got {}",
            limits::MAX_TICK_INTERVAL,
            r.tick_interval
        ));
    }
    if r.max_steps_per_advance == 0 || r.max_steps_per_advance > limits::MAX_STEPS_PER_ADVANCE {
        return Err(format!(
            "runtime.max_steps_per_advance must be in [1, {}], got {}",
            limits::MAX_STEPS_PER_ADVANCE,
            r.max_steps_per_advance
        ));
    }

    Ok(())
}

// =============================================================================
// Loading / Saving
// =============================================================================

/// Load a config from a RON string
pub fn load_config_from_str(s: &str) -> Result<GameConfig, ConfigError> {
    let config: GameConfig = ron::from_str(s)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load a config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GameConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents).map_err(|e| {
        warn!(path = %path.display(), error = %e, "rejected config file");
        e
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Serialize a config as pretty RON
pub fn config_to_string(config: &GameConfig) -> Result<String, ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());
    Ok(ron::ser::to_string_pretty(config, pretty)?)
}

/// Write a config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &GameConfig, path: P) -> Result<(), ConfigError> {
    fs::write(path, config_to_string(config)?)?;
    Ok(())
}
