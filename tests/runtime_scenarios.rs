//! Whole-run scenarios driven through the public runtime API.

use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

use cosmic_runner::config::{load_config, GameConfig, ObstacleSettings};
use cosmic_runner::game::event::{GameStateChangedEvent, HealthChangedEvent};
use cosmic_runner::game::services::{HighScoreStore, NullEffects, NullScenes};
use cosmic_runner::game::{CharacterState, CollectibleKind, Collaborators, GameState, Runtime};
use cosmic_runner::math::Vec3;

const DT: f32 = 0.016;

/// High score store the test can still look into after handing it over
struct SharedScores {
    best: Rc<Cell<u32>>,
    saves: Rc<Cell<u32>>,
}

impl HighScoreStore for SharedScores {
    fn load_high_score(&mut self) -> u32 {
        self.best.get()
    }

    fn save_high_score(&mut self, score: u32) {
        self.best.set(score);
        self.saves.set(self.saves.get() + 1);
    }
}

fn playing(config: GameConfig) -> Runtime {
    let mut runtime = Runtime::new(config, Collaborators::default());
    runtime.spawn_player();
    runtime.start_game();
    runtime.events.clear_all();
    runtime
}

fn ticks(runtime: &mut Runtime, count: usize) {
    for _ in 0..count {
        runtime.tick(DT);
    }
}

#[test]
fn start_game_from_main_menu() {
    let mut runtime = Runtime::new(GameConfig::default(), Collaborators::default());
    runtime.spawn_player();
    assert_eq!(runtime.state(), GameState::MainMenu);

    assert!(runtime.start_game());

    assert_eq!(runtime.state(), GameState::Playing);
    assert_eq!(runtime.manager.elapsed_time(), 0.0);
    assert_eq!(runtime.manager.difficulty(), 1.0);
    let changes: Vec<_> = runtime.events.game_state_changed.drain().collect();
    assert_eq!(
        changes,
        vec![GameStateChangedEvent { state: GameState::Playing, previous: GameState::MainMenu }]
    );
}

#[test]
fn difficulty_ramps_over_ten_seconds() {
    let mut runtime = playing(GameConfig::default());

    runtime.tick(10.0);

    assert!((runtime.manager.difficulty() - 2.0).abs() < 1e-5);
    assert_eq!(runtime.events.difficulty_changed.len(), 1);
}

#[test]
fn obstacle_damage_puts_runner_in_hit() {
    let config = GameConfig {
        obstacle: ObstacleSettings { damage: 30.0, ..Default::default() },
        ..Default::default()
    };
    let mut runtime = playing(config);
    runtime.spawn_obstacle(Vec3::new(60.0, 0.0, 0.0));

    runtime.tick(DT);

    let player = runtime.player().unwrap();
    assert_eq!(player.health(), 70.0);
    assert_eq!(player.state(), CharacterState::Hit);
    let health: Vec<_> = runtime.events.health_changed.drain().collect();
    assert_eq!(health, vec![HealthChangedEvent { new_health: 70.0, old_health: 100.0 }]);
}

#[test]
fn death_ends_the_run_and_records_high_score() {
    let best = Rc::new(Cell::new(30));
    let saves = Rc::new(Cell::new(0));
    let collaborators = Collaborators {
        effects: Box::new(NullEffects),
        scenes: Box::new(NullScenes),
        high_scores: Box::new(SharedScores { best: best.clone(), saves: saves.clone() }),
    };
    let config = GameConfig {
        obstacle: ObstacleSettings { damage: 100.0, ..Default::default() },
        ..Default::default()
    };
    let mut runtime = Runtime::new(config, collaborators);
    runtime.spawn_player();
    runtime.start_game();
    assert_eq!(runtime.manager.high_score(), 30);

    runtime.spawn_collectible(CollectibleKind::Gem, Vec3::new(20.0, 0.0, 0.0));
    runtime.tick(DT);
    assert_eq!(runtime.player().unwrap().score(), 50);

    runtime.spawn_obstacle(Vec3::new(60.0, 0.0, 0.0));
    runtime.tick(DT);
    assert!(runtime.player().unwrap().is_dead());
    // The manager notices on its next tick
    assert_eq!(runtime.state(), GameState::Playing);

    runtime.tick(DT);
    assert_eq!(runtime.state(), GameState::GameOver);
    assert!(runtime.world.is_paused());
    assert_eq!(runtime.manager.high_score(), 50);
    assert_eq!(best.get(), 50);
    assert_eq!(saves.get(), 1);

    // Further ticks change nothing
    ticks(&mut runtime, 10);
    assert_eq!(saves.get(), 1);
    assert_eq!(runtime.events.game_state_changed.iter().filter(|e| e.state == GameState::GameOver).count(), 1);
}

#[test]
fn repeated_hits_wear_the_runner_down() {
    let mut runtime = playing(GameConfig::default());
    let start = runtime.config().manager.player_start;

    // Default obstacles take 20 health each
    for hit in 1..=5u32 {
        assert_eq!(runtime.state(), GameState::Playing);
        let rock = runtime.spawn_obstacle(Vec3::new(start.x + 1500.0, start.y, start.z));
        ticks(&mut runtime, 400);

        // The last hit pauses the world with this rock still in it
        if hit < 5 {
            assert!(!runtime.world.is_alive(rock));
        }
        let player = runtime.player().unwrap();
        assert_eq!(player.health(), 100.0 - 20.0 * hit as f32);
        assert_eq!(player.position(), start);
    }

    assert!(runtime.player().unwrap().is_dead());
    assert_eq!(runtime.state(), GameState::GameOver);
    assert_eq!(runtime.events.obstacle_hit.len(), 5);
}

#[test]
fn speed_boost_pickup_restarts_timer() {
    let mut runtime = playing(GameConfig::default());

    runtime.spawn_collectible(CollectibleKind::SpeedBoost, Vec3::new(20.0, 0.0, 0.0));
    runtime.tick(DT);
    assert!(runtime.player().unwrap().is_speed_boosted());
    assert_eq!(runtime.player().unwrap().motor().max_speed, 900.0);

    // Second boost about three seconds in
    ticks(&mut runtime, 186);
    runtime.spawn_collectible(CollectibleKind::SpeedBoost, Vec3::new(20.0, 0.0, 0.0));
    runtime.tick(DT);
    assert_eq!(runtime.player().unwrap().score(), 20);

    // Past the first boost's expiry, still inside the second one
    ticks(&mut runtime, 300);
    assert!(runtime.player().unwrap().is_speed_boosted());

    ticks(&mut runtime, 20);
    let player = runtime.player().unwrap();
    assert!(!player.is_speed_boosted());
    assert_eq!(player.motor().max_speed, 600.0);
}

#[test]
fn delayed_destroy_fires_once() {
    let config = GameConfig {
        obstacle: ObstacleSettings { destroy_delay: Some(0.5), ..Default::default() },
        ..Default::default()
    };
    let mut runtime = playing(config);
    let rock = runtime.spawn_obstacle(Vec3::new(60.0, 0.0, 0.0));
    let player = runtime.player_entity().unwrap();

    runtime.tick(DT);
    assert!(runtime.world.is_destroy_pending(rock));
    let pending = runtime.timers.len();

    runtime.notify_overlap(rock, player);
    assert_eq!(runtime.timers.len(), pending);
    assert_eq!(runtime.events.obstacle_hit.len(), 1);

    ticks(&mut runtime, 31);
    assert!(runtime.world.is_alive(rock));
    runtime.tick(DT);
    assert!(!runtime.world.is_alive(rock));
    assert_eq!(runtime.player().unwrap().health(), 80.0);
}

#[test]
fn restart_after_game_over() {
    let mut runtime = playing(GameConfig::default());
    assert!(runtime.game_over());
    assert!(!runtime.game_over());
    assert!(!runtime.pause_game());

    runtime.tick(1.0);
    assert_eq!(runtime.manager.elapsed_time(), 0.0);

    assert!(runtime.start_game());
    runtime.tick(1.0);
    assert_eq!(runtime.manager.elapsed_time(), 1.0);
}

#[test]
fn lane_input_follows_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "(player: (lane_width: 150.0), runtime: (tick_interval: 0.02))").unwrap();
    let config = load_config(file.path()).unwrap();

    let mut runtime = playing(config);
    assert!(runtime.move_right());
    assert!(!runtime.move_right());
    assert_eq!(runtime.player().unwrap().position().y, 150.0);

    assert_eq!(runtime.advance(0.02), 1);
    assert!(runtime.jump());
    assert!(!runtime.jump());
}
