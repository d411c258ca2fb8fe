//! Immutable render snapshots and runtime counters

use glam::{DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::particle::{ParticleId, ParticleInstance};

/// Render state of one particle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleSnapshot {
    pub id: ParticleId,
    /// Particle id of the profile
    pub particle: String,
    pub position: DVec3,
    pub velocity: DVec3,
    pub age: u32,
    pub lifetime: u32,
    pub render_size: f64,
    pub render_color: DVec4,
    pub texture_frame_index: Option<u32>,
}

impl From<&ParticleInstance> for ParticleSnapshot {
    fn from(p: &ParticleInstance) -> Self {
        Self {
            id: p.id,
            particle: p.profile.id.clone(),
            position: p.position,
            velocity: p.velocity,
            age: p.age,
            lifetime: p.lifetime,
            render_size: p.render_size,
            render_color: p.render_color,
            texture_frame_index: p.texture_frame,
        }
    }
}

/// Everything the renderer needs after a tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub particles: Vec<ParticleSnapshot>,
}

impl Snapshot {
    pub(crate) fn capture<'a>(tick: u64, particles: impl Iterator<Item = &'a ParticleInstance>) -> Self {
        Self {
            tick,
            particles: particles.map(ParticleSnapshot::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of particles with the given particle id
    pub fn count_of(&self, particle: &str) -> usize {
        self.particles.iter().filter(|p| p.particle == particle).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Running counters of dropped spawns and killed particles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Particles pushed by rules
    pub spawned: u64,
    /// Particles pushed as children
    pub children_spawned: u64,
    /// Spawns naming a particle id the data set does not define
    pub unknown_particle: u64,
    /// Spawns with no lifetime from profile, rule or hook
    pub missing_lifetime: u64,
    /// Spawns dropped because the store was full
    pub store_full: u64,
    /// Children dropped at the spawn depth cap
    pub depth_capped: u64,
    /// Loop iterations and spawn attempts cut by the per-rule emission cap
    pub emissions_capped: u64,
    /// Formula evaluation failures (spawn dropped or instance killed)
    pub evaluation_errors: u64,
    pub killed_non_finite: u64,
    pub killed_out_of_bounds: u64,
    /// Particles that reached their lifetime
    pub expired: u64,
    /// Particles removed through despawn requests
    pub despawned: u64,
}

impl Diagnostics {
    /// Spawns that did not make it into the store
    pub fn dropped(&self) -> u64 {
        self.unknown_particle
            + self.missing_lifetime
            + self.store_full
            + self.depth_capped
            + self.emissions_capped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = Snapshot {
            tick: 3,
            particles: vec![ParticleSnapshot {
                id: ParticleId(7),
                particle: "smoke".to_string(),
                position: DVec3::new(1.0, 2.0, 3.0),
                velocity: DVec3::ZERO,
                age: 2,
                lifetime: 10,
                render_size: 0.5,
                render_color: DVec4::ONE,
                texture_frame_index: Some(1),
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "tick": 3,
                "particles": [{
                    "id": 7,
                    "particle": "smoke",
                    "position": [1.0, 2.0, 3.0],
                    "velocity": [0.0, 0.0, 0.0],
                    "age": 2,
                    "lifetime": 10,
                    "renderSize": 0.5,
                    "renderColor": [1.0, 1.0, 1.0, 1.0],
                    "textureFrameIndex": 1
                }]
            })
        );
    }

    #[test]
    fn test_dropped_total() {
        let diagnostics = Diagnostics {
            unknown_particle: 1,
            store_full: 2,
            depth_capped: 3,
            emissions_capped: 4,
            evaluation_errors: 9,
            ..Diagnostics::default()
        };
        assert_eq!(diagnostics.dropped(), 10);
    }
}
