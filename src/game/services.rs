//! External collaborators
//!
//! The gameplay core needs three capabilities it doesn't implement itself:
//! playing effects, opening scenes and persisting the high score. Each is a
//! small trait the embedder injects. The null implementations here are what
//! the core falls back to, and the recording ones back the tests and the
//! headless simulation.

use tracing::debug;

use crate::math::Vec3;
use super::event::Events;
use super::timer::Timers;

/// Fire-and-forget effect/audio playback. Never fails observably.
pub trait EffectPlayer {
    fn play_effect_at(&mut self, cue: &str, location: Vec3);
}

/// Opens a named scene (full reload). Owned by the embedding application.
pub trait SceneLoader {
    fn open_scene(&mut self, name: &str);
}

/// High score persistence. The storage format is the embedder's concern.
pub trait HighScoreStore {
    fn load_high_score(&mut self) -> u32;
    fn save_high_score(&mut self, score: u32);
}

/// Discards every effect
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEffects;

impl EffectPlayer for NullEffects {
    fn play_effect_at(&mut self, _cue: &str, _location: Vec3) {}
}

/// Records every effect that was played
#[derive(Debug, Default, Clone)]
pub struct EffectLog {
    pub played: Vec<(String, Vec3)>,
}

impl EffectLog {
    pub fn count(&self, cue: &str) -> usize {
        self.played.iter().filter(|(c, _)| c == cue).count()
    }
}

impl EffectPlayer for EffectLog {
    fn play_effect_at(&mut self, cue: &str, location: Vec3) {
        self.played.push((cue.to_string(), location));
    }
}

/// Ignores scene requests
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScenes;

impl SceneLoader for NullScenes {
    fn open_scene(&mut self, name: &str) {
        debug!(scene = name, "scene request ignored");
    }
}

/// Queues scene requests for the embedder to act on after the frame
#[derive(Debug, Default, Clone)]
pub struct SceneRequests {
    pub requested: Vec<String>,
}

impl SceneRequests {
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.requested)
    }
}

impl SceneLoader for SceneRequests {
    fn open_scene(&mut self, name: &str) {
        self.requested.push(name.to_string());
    }
}

/// Save system stub: nothing is stored, loading always yields 0
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHighScores;

impl HighScoreStore for NullHighScores {
    fn load_high_score(&mut self) -> u32 {
        0
    }

    fn save_high_score(&mut self, _score: u32) {}
}

/// Keeps the high score in memory for the lifetime of the process
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryHighScores {
    pub score: u32,
    pub saves: u32,
}

impl MemoryHighScores {
    pub fn with_score(score: u32) -> Self {
        Self { score, saves: 0 }
    }
}

impl HighScoreStore for MemoryHighScores {
    fn load_high_score(&mut self) -> u32 {
        self.score
    }

    fn save_high_score(&mut self, score: u32) {
        self.score = score;
        self.saves += 1;
    }
}

/// What an entity can reach while it reacts to something during a tick:
/// the outgoing event queues, the timer table and the effect player.
pub struct FrameContext<'a> {
    pub events: &'a mut Events,
    pub timers: &'a mut Timers,
    pub effects: &'a mut dyn EffectPlayer,
}

impl<'a> FrameContext<'a> {
    pub fn new(events: &'a mut Events, timers: &'a mut Timers, effects: &'a mut dyn EffectPlayer) -> Self {
        Self { events, timers, effects }
    }

    /// Play `cue` at `location` if a cue is configured.
    pub fn play(&mut self, cue: Option<&str>, location: Vec3) {
        if let Some(cue) = cue {
            self.effects.play_effect_at(cue, location);
        }
    }
}
