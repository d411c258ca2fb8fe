use std::io;
use std::path::PathBuf;

use mc_particle_data::DataError;
use mc_particle_expr::ValueKind;
use thiserror::Error;

/// Errors raised by the simulation
///
/// Per-particle problems (evaluation failures, unknown ids, a full store)
/// are not errors; they are counted in [`Diagnostics`](crate::Diagnostics).
#[derive(Error, Debug)]
pub enum SimError {
    /// The instance store or tick sequence is in an impossible state.
    /// The simulation refuses further ticks afterwards.
    #[error("Simulation invariant violated at tick {tick}: {reason}")]
    InvariantViolated { tick: u64, reason: String },

    /// A previous invariant violation stopped the simulation
    #[error("Simulation halted after an invariant violation")]
    Halted,

    /// The event names a hook the catalog does not define
    #[error("Unknown hook `{hook}` for {owner}")]
    UnknownHook { owner: String, hook: String },

    /// The event's arguments do not match the hook signature
    #[error("Hook `{hook}` expects arguments ({expected}), got ({found})")]
    ArgumentMismatch {
        hook: String,
        expected: String,
        found: String,
    },

    /// Data-set lookup failed
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimError {
    pub(crate) fn argument_mismatch(hook: &str, expected: &[ValueKind], found: &[ValueKind]) -> Self {
        let join = |kinds: &[ValueKind]| {
            kinds
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self::ArgumentMismatch {
            hook: hook.to_string(),
            expected: join(expected),
            found: join(found),
        }
    }
}

/// Errors loading a [`SimConfig`](crate::SimConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A value outside its allowed range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type using SimError
pub type Result<T> = std::result::Result<T, SimError>;
