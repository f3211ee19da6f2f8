//! Game Manager
//!
//! Top-level state machine for a run:
//!
//! ```text
//! MainMenu ──start──► Playing ◄──resume── Paused
//!     ▲                 │  └────pause────────┘
//!     │                 ▼ (player health 0, or game_over())
//!  menu (scene)      GameOver ──start──► Playing
//! ```
//!
//! While Playing the manager ramps difficulty and watches the player's
//! health. It holds the player only as an `Option<Entity>`; an id that no
//! longer resolves reads as "no player" and suspends the health poll.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::config::ManagerSettings;
use super::entity::Entity;
use super::event::{DifficultyChangedEvent, Events, GameStateChangedEvent};
use super::services::{HighScoreStore, SceneLoader};
use super::world::World;

/// Difficulty at the start of every run
pub const BASE_DIFFICULTY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    MainMenu,
    Playing,
    Paused,
    GameOver,
}

impl GameState {
    pub fn label(&self) -> &'static str {
        match self {
            GameState::MainMenu => "Main Menu",
            GameState::Playing => "Playing",
            GameState::Paused => "Paused",
            GameState::GameOver => "Game Over",
        }
    }
}

pub struct GameManager {
    settings: ManagerSettings,
    state: GameState,
    /// Seconds spent Playing in the current run
    elapsed_time: f32,
    difficulty: f32,
    high_score: u32,
    player: Option<Entity>,
}

impl GameManager {
    pub fn new(settings: ManagerSettings) -> Self {
        Self {
            settings,
            state: GameState::MainMenu,
            elapsed_time: 0.0,
            difficulty: BASE_DIFFICULTY,
            high_score: 0,
            player: None,
        }
    }

    /// Load the persisted high score and bind the player, if there is one.
    pub fn initialize(&mut self, store: &mut dyn HighScoreStore, player: Option<Entity>) {
        self.high_score = store.load_high_score();
        self.player = player;
        debug!(high_score = self.high_score, player = ?player, "game manager initialized");
    }

    /// Explicitly (re)bind the player reference.
    pub fn bind_player(&mut self, player: Option<Entity>) {
        self.player = player;
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn difficulty(&self) -> f32 {
        self.difficulty
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    /// Score of the bound player, 0 if it's gone
    pub fn current_score(&self, world: &World) -> u32 {
        self.player
            .and_then(|p| world.player(p))
            .map_or(0, |p| p.score())
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn set_state(&mut self, next: GameState, events: &mut Events) {
        let previous = self.state;
        self.state = next;
        events.game_state_changed.send(GameStateChangedEvent { state: next, previous });
        info!(from = previous.label(), to = next.label(), "game state");
    }

    /// Start a run from any state but Playing.
    pub fn start_game(&mut self, world: &mut World, events: &mut Events) -> bool {
        if self.state == GameState::Playing {
            return false;
        }
        self.elapsed_time = 0.0;
        self.difficulty = BASE_DIFFICULTY;

        if let Some(player) = self.player {
            world.reposition(player, self.settings.player_start);
        }
        world.set_paused(false);
        self.set_state(GameState::Playing, events);
        true
    }

    pub fn pause_game(&mut self, world: &mut World, events: &mut Events) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        world.set_paused(true);
        self.set_state(GameState::Paused, events);
        true
    }

    pub fn resume_game(&mut self, world: &mut World, events: &mut Events) -> bool {
        if self.state != GameState::Paused {
            return false;
        }
        world.set_paused(false);
        self.set_state(GameState::Playing, events);
        true
    }

    /// End the run: pause, persist a beaten high score, report GameOver.
    /// Idempotent. Nothing can call back in mid-transition: events are only
    /// queued here and `&mut self` is held throughout.
    pub fn game_over(&mut self, world: &mut World, events: &mut Events, store: &mut dyn HighScoreStore) -> bool {
        if self.state == GameState::GameOver {
            return false;
        }

        world.set_paused(true);
        let score = self.current_score(world);
        if score > self.high_score {
            self.high_score = score;
            store.save_high_score(score);
            info!(high_score = score, "new high score");
        }
        self.set_state(GameState::GameOver, events);
        true
    }

    /// Reload the level scene. The embedder rebuilds the runtime afterwards.
    pub fn restart_game(&self, scenes: &mut dyn SceneLoader) {
        scenes.open_scene(&self.settings.level_scene);
    }

    pub fn return_to_menu(&self, scenes: &mut dyn SceneLoader) {
        scenes.open_scene(&self.settings.main_menu_scene);
    }

    // =========================================================================
    // Tick
    // =========================================================================

    pub fn tick(
        &mut self,
        delta_time: f32,
        world: &mut World,
        events: &mut Events,
        store: &mut dyn HighScoreStore,
    ) {
        if self.state != GameState::Playing {
            return;
        }

        self.elapsed_time += delta_time;

        let next = (self.difficulty + self.settings.difficulty_increase_rate * delta_time)
            .min(self.settings.max_difficulty);
        if next != self.difficulty {
            self.difficulty = next;
            events.difficulty_changed.send(DifficultyChangedEvent { difficulty: next });
        }

        let player_down = self
            .player
            .and_then(|p| world.player(p))
            .is_some_and(|p| p.health() <= 0.0);
        if player_down {
            self.game_over(world, events, store);
        }
    }
}
