//! Cosmic Runner headless simulation
//!
//! Drives the gameplay core without a renderer: a seeded spawner throws
//! obstacles and pickups at the runner, an optional autopilot dodges them,
//! and a summary is printed when the run ends or the time is up.
//!
//! ```text
//! cosmic-runner --seconds 120 --seed 42 --json
//! RUST_LOG=cosmic_runner=debug cosmic-runner --no-autopilot
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, trace};
use tracing_subscriber::EnvFilter;

use cosmic_runner::config::{self, GameConfig};
use cosmic_runner::game::player::{CENTER_LANE, LANE_COUNT};
use cosmic_runner::game::services::{EffectPlayer, MemoryHighScores, NullScenes};
use cosmic_runner::game::{CollectibleKind, Collaborators, GameState, Runtime};
use cosmic_runner::math::Vec3;

/// Frame rate the simulation pretends to render at
const FRAME_TIME: f32 = 1.0 / 60.0;
/// Hazards appear this far ahead of the runner
const SPAWN_DISTANCE: f32 = 3000.0;
/// Seconds between spawns at difficulty 1.0
const BASE_SPAWN_INTERVAL: f32 = 1.2;
/// How far ahead the autopilot looks for obstacles
const DODGE_DISTANCE: f32 = 350.0;

#[derive(Parser, Debug)]
#[command(name = "cosmic-runner", version, about = "Headless Cosmic Runner simulation")]
struct Cli {
    /// RON config file; defaults fill in anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds of game time to simulate
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Spawner seed
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Let the runner crash into everything
    #[arg(long)]
    no_autopilot: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

/// Effects have nowhere to go headless, so they only show up in the trace log
struct TraceEffects;

impl EffectPlayer for TraceEffects {
    fn play_effect_at(&mut self, cue: &str, location: Vec3) {
        trace!(cue, x = location.x, y = location.y, z = location.z, "effect");
    }
}

/// Lateral offset of a lane from the center lane
fn lane_offset(lane: u8, lane_width: f32) -> f32 {
    (lane as f32 - CENTER_LANE as f32) * lane_width
}

// =============================================================================
// Spawner
// =============================================================================

struct Spawner {
    rng: StdRng,
    cooldown: f32,
}

impl Spawner {
    fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), cooldown: BASE_SPAWN_INTERVAL }
    }

    fn pick_collectible(&mut self) -> CollectibleKind {
        match self.rng.gen_range(0..100) {
            0..=59 => CollectibleKind::Coin,
            60..=84 => CollectibleKind::Gem,
            85..=92 => CollectibleKind::Shield,
            _ => CollectibleKind::SpeedBoost,
        }
    }

    /// Spawn faster as difficulty rises
    fn update(&mut self, delta_time: f32, runtime: &mut Runtime) {
        if runtime.state() != GameState::Playing {
            return;
        }
        self.cooldown -= delta_time;
        if self.cooldown > 0.0 {
            return;
        }
        self.cooldown = BASE_SPAWN_INTERVAL / runtime.manager.difficulty().max(1.0);

        let start = runtime.config().manager.player_start;
        let lane_width = runtime.config().player.lane_width;
        let lane = self.rng.gen_range(0..LANE_COUNT);
        let position = Vec3::new(start.x + SPAWN_DISTANCE, start.y + lane_offset(lane, lane_width), start.z);

        if self.rng.gen_bool(0.35) {
            let kind = self.pick_collectible();
            let entity = runtime.spawn_collectible(kind, position);
            trace!(entity = %entity, kind = kind.label(), lane, "spawned collectible");
        } else {
            let entity = runtime.spawn_obstacle(position);
            trace!(entity = %entity, lane, "spawned obstacle");
        }
    }
}

// =============================================================================
// Autopilot
// =============================================================================

enum Dodge {
    Left,
    Right,
    Jump,
}

/// Steps out of the way of the nearest obstacle, or jumps when boxed in.
fn autopilot(runtime: &mut Runtime) {
    let Some(player) = runtime.player() else { return };
    if player.is_dead() {
        return;
    }
    let position = player.position();
    let lane = player.lane();
    let lane_width = player.settings().lane_width;

    let threatened = |target: u8| {
        let y = position.y + lane_offset(target, lane_width) - lane_offset(lane, lane_width);
        runtime.world.obstacles.iter().any(|(_, o)| {
            let ahead = o.position.x - position.x;
            !o.has_collided()
                && (o.position.y - y).abs() < lane_width * 0.5
                && ahead > -o.movement_speed * FRAME_TIME
                && ahead < DODGE_DISTANCE
        })
    };

    if !threatened(lane) {
        return;
    }
    let dodge = if lane > 0 && !threatened(lane - 1) {
        Dodge::Left
    } else if lane + 1 < LANE_COUNT && !threatened(lane + 1) {
        Dodge::Right
    } else {
        Dodge::Jump
    };

    match dodge {
        Dodge::Left => runtime.move_left(),
        Dodge::Right => runtime.move_right(),
        Dodge::Jump => runtime.jump(),
    };
}

// =============================================================================
// Summary
// =============================================================================

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    seed: u64,
    simulated_seconds: f32,
    ticks: u64,
    final_state: GameState,
    score: u32,
    high_score: u32,
    difficulty: f32,
    distance: f32,
    health: f32,
    obstacles_hit: u32,
    pickups: BTreeMap<String, u32>,
}

impl RunSummary {
    /// Tally this frame's events, then drop them
    fn drain_events(&mut self, runtime: &mut Runtime) {
        for hit in runtime.events.obstacle_hit.drain() {
            self.obstacles_hit += 1;
            debug!(obstacle = %hit.obstacle, "runner hit an obstacle");
        }
        for pickup in runtime.events.collectible_collected.drain() {
            *self.pickups.entry(pickup.kind.label().to_string()).or_default() += 1;
        }
        for change in runtime.events.health_changed.drain() {
            debug!(health = change.new_health, was = change.old_health, "health");
        }
        runtime.events.clear_all();
    }

    fn finish(&mut self, runtime: &Runtime) {
        self.simulated_seconds = runtime.manager.elapsed_time();
        self.ticks = runtime.ticks();
        self.final_state = runtime.state();
        self.score = runtime.manager.current_score(&runtime.world);
        self.high_score = runtime.manager.high_score();
        self.difficulty = runtime.manager.difficulty();
        if let Some(player) = runtime.player() {
            self.distance = player.motor().distance;
            self.health = player.health();
        }
    }

    fn print_text(&self) {
        println!("Cosmic Runner (seed {})", self.seed);
        println!("  state:       {}", self.final_state.label());
        println!("  time:        {:.2}s over {} ticks", self.simulated_seconds, self.ticks);
        println!("  score:       {} (high score {})", self.score, self.high_score);
        println!("  difficulty:  {:.2}", self.difficulty);
        println!("  distance:    {:.0}", self.distance);
        println!("  health:      {:.0}", self.health);
        println!("  hits taken:  {}", self.obstacles_hit);
        for (kind, count) in &self.pickups {
            println!("  {:<12} {}", format!("{}:", kind), count);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GameConfig::default(),
    };

    let collaborators = Collaborators {
        effects: Box::new(TraceEffects),
        scenes: Box::new(NullScenes),
        high_scores: Box::new(MemoryHighScores::default()),
    };
    let mut runtime = Runtime::new(config, collaborators);
    runtime.spawn_player();
    runtime.start_game();

    let mut spawner = Spawner::new(cli.seed);
    let mut summary = RunSummary { seed: cli.seed, ..Default::default() };
    let frames = (cli.seconds / FRAME_TIME).ceil() as u64;
    info!(seed = cli.seed, seconds = cli.seconds, autopilot = !cli.no_autopilot, "simulation started");

    for _ in 0..frames {
        spawner.update(FRAME_TIME, &mut runtime);
        if !cli.no_autopilot {
            autopilot(&mut runtime);
        }
        runtime.advance(FRAME_TIME);
        summary.drain_events(&mut runtime);

        if runtime.state() == GameState::GameOver {
            break;
        }
    }

    summary.finish(&runtime);
    info!(state = summary.final_state.label(), score = summary.score, "simulation finished");

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print_text();
    }
    Ok(())
}
