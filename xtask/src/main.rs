//! Development tasks for Cosmic Runner
//!
//! Usage:
//!   cargo run -p xtask -- ci                 # fmt check, clippy, tests
//!   cargo run -p xtask -- simulate --runs 5  # headless runs over several seeds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for Cosmic Runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checks CI runs: formatting, clippy and the test suite
    Ci {
        /// Skip the rustfmt check
        #[arg(long)]
        no_fmt: bool,
    },
    /// Run the headless simulation for a range of seeds
    Simulate {
        /// Number of runs (seeds start at --seed and count up)
        #[arg(long, default_value_t = 3)]
        runs: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Seconds of game time per run
        #[arg(long, default_value_t = 60.0)]
        seconds: f32,
        /// RON config passed through to every run
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { no_fmt } => ci(no_fmt),
        Commands::Simulate { runs, seed, seconds, config } => simulate(runs, seed, seconds, config.as_deref()),
    }
}

/// Get the project root directory
fn project_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

/// Run a command and check for success
fn run_cmd(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("Failed to execute command")?;
    if !status.success() {
        anyhow::bail!("Command failed with status: {}", status);
    }
    Ok(())
}

fn cargo(root: &Path) -> Command {
    let mut cmd = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()));
    cmd.current_dir(root);
    cmd
}

fn ci(no_fmt: bool) -> Result<()> {
    let root = project_root()?;

    if !no_fmt {
        println!("Checking formatting...");
        run_cmd(cargo(&root).args(["fmt", "--all", "--check"]))?;
    }

    println!("Running clippy...");
    run_cmd(cargo(&root).args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"]))?;

    println!("Running tests...");
    run_cmd(cargo(&root).args(["test", "--workspace"]))?;

    println!("CI checks passed");
    Ok(())
}

fn simulate(runs: u64, first_seed: u64, seconds: f32, config: Option<&Path>) -> Result<()> {
    let root = project_root()?;

    println!("Building simulator...");
    run_cmd(cargo(&root).args(["build", "--release", "--bin", "cosmic-runner"]))?;

    for seed in first_seed..first_seed + runs {
        println!("=== seed {} ===", seed);
        let mut cmd = cargo(&root);
        cmd.args(["run", "--release", "--quiet", "--bin", "cosmic-runner", "--"])
            .arg("--seed")
            .arg(seed.to_string())
            .arg("--seconds")
            .arg(seconds.to_string());
        if let Some(config) = config {
            cmd.arg("--config").arg(config);
        }
        run_cmd(&mut cmd).with_context(|| format!("simulation with seed {} failed", seed))?;
    }
    Ok(())
}
