//! Root CLI structure for mc-particles

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mc-particles")]
#[command(about = "Validate, inspect and simulate versioned particle data sets", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load data sets and report rejected profiles and rules
    Validate(ValidateArgs),

    /// Show the profiles, rules and hooks of a data set
    Info(InfoArgs),

    /// Compile and evaluate a single formula
    Eval(EvalArgs),

    /// Fire a hook repeatedly and run the simulation
    Simulate(SimulateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Data set files (JSON or YAML)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Fail when any profile or rule is rejected
    #[arg(short, long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Data set file (JSON or YAML)
    pub file: PathBuf,

    /// Also list the built-in hook catalog
    #[arg(long)]
    pub hooks: bool,
}

#[derive(Args)]
pub struct EvalArgs {
    /// Formula to evaluate, e.g. `$0.getY() + 0.5`
    pub expr: String,

    /// Bound value as `kind=value`, in slot order (`blockpos=0,64,0`, `random`)
    #[arg(short, long = "arg", value_name = "KIND=VALUE")]
    pub args: Vec<String>,

    /// Evaluate in a hook's scope instead, e.g. `block:animateTick`
    #[arg(long, conflicts_with = "args")]
    pub hook: Option<String>,

    /// Position used for hook arguments
    #[arg(long, default_value = "0,64,0", value_name = "X,Y,Z")]
    pub pos: String,

    /// Seed of the random source
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of evaluations
    #[arg(short = 'n', long, default_value_t = 1)]
    pub samples: usize,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Data set files (JSON or YAML)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Data set version to simulate (defaults to the newest loaded)
    #[arg(long = "game-version", visible_alias = "mc-version", value_name = "VERSION")]
    pub game_version: Option<String>,

    /// Event source as `kind:id`, e.g. `block:candle` or `entity:blaze`
    #[arg(short, long)]
    pub source: String,

    /// Hook to fire (defaults to `animateTick` for blocks, `tick` for entities)
    #[arg(long)]
    pub hook: Option<String>,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 20)]
    pub ticks: u64,

    /// Fire the hook every N ticks; 0 fires only before the first tick
    #[arg(long, default_value_t = 1)]
    pub fire_every: u64,

    /// Block-state properties, e.g. `LIT=true,CANDLES=1`
    #[arg(short, long, default_value = "")]
    pub props: String,

    /// Event position
    #[arg(long, default_value = "0,64,0", value_name = "X,Y,Z")]
    pub pos: String,

    /// Simulation config file (JSON or YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the config seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the store capacity
    #[arg(long)]
    pub max_particles: Option<usize>,

    /// Print the final snapshot as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}
