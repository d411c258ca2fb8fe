//! Simulation configuration

use std::path::Path;

use glam::DVec3;
use mc_particle_data::DataFormat;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default capacity of the instance store
pub const DEFAULT_MAX_PARTICLES: usize = 16384;

/// Default limit on child-of-child chains
pub const DEFAULT_MAX_SPAWN_DEPTH: u32 = 4;

/// Default limit on loop iterations, and separately on spawn attempts, for
/// one rule in one event
pub const DEFAULT_MAX_EMISSIONS_PER_RULE: u32 = 1024;

/// Region outside of which particles die
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    pub min_y: f64,
    pub max_y: f64,
    /// Maximum horizontal distance from the origin, unbounded when `None`
    pub horizontal_radius: Option<f64>,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_y: -128.0,
            max_y: 512.0,
            horizontal_radius: None,
        }
    }
}

impl WorldBounds {
    /// Whether `position` lies inside the bounds
    pub fn contains(&self, position: DVec3) -> bool {
        if position.y < self.min_y || position.y > self.max_y {
            return false;
        }
        match self.horizontal_radius {
            Some(radius) => position.x.hypot(position.z) <= radius,
            None => true,
        }
    }
}

/// Runtime settings of a [`Simulation`](crate::Simulation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed of the simulation's random source
    pub seed: u64,
    /// Capacity of the instance store
    pub max_particles: usize,
    /// Deepest child generation that may still spawn; rule spawns are
    /// depth 0
    pub max_spawn_depth: u32,
    /// Cap on a rule's loop iterations and on its spawn attempts per event
    pub max_emissions_per_rule: u32,
    pub bounds: WorldBounds,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_particles: DEFAULT_MAX_PARTICLES,
            max_spawn_depth: DEFAULT_MAX_SPAWN_DEPTH,
            max_emissions_per_rule: DEFAULT_MAX_EMISSIONS_PER_RULE,
            bounds: WorldBounds::default(),
        }
    }
}

impl SimConfig {
    /// Default configuration with `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, choosing the format from its extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = DataFormat::from_path(path)
            .map_err(|_| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match format {
            DataFormat::Json => Self::from_json_str(&text),
            DataFormat::Yaml => Self::from_yaml_str(&text),
        }
    }

    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_particles == 0 {
            return Err(ConfigError::Invalid("max_particles must be > 0".to_string()));
        }
        if self.max_emissions_per_rule == 0 {
            return Err(ConfigError::Invalid(
                "max_emissions_per_rule must be > 0".to_string(),
            ));
        }
        let bounds = &self.bounds;
        if !(bounds.min_y.is_finite() && bounds.max_y.is_finite()) || bounds.min_y >= bounds.max_y {
            return Err(ConfigError::Invalid(format!(
                "bounds min_y {} must be finite and below max_y {}",
                bounds.min_y, bounds.max_y
            )));
        }
        if bounds
            .horizontal_radius
            .is_some_and(|r| !(r.is_finite() && r > 0.0))
        {
            return Err(ConfigError::Invalid(
                "bounds horizontal_radius must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }
}
