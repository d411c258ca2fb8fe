//! Per-tick particle step
//!
//! The order of operations within a tick is fixed:
//!
//! 1. age, death check (on-death children are queued on the death tick)
//! 2. `velocityAdd`, then jitter
//! 3. gravity
//! 4. move
//! 5. friction
//! 6. behavior
//! 7. world bounds
//! 8. lifetime animation
//! 9. child spawns

use glam::DVec3;
use log::{debug, warn};
use mc_particle_data::{Behavior, ChildSpawn, ParticleProfile};
use mc_particle_expr::Value;
use rand::{Rng, RngCore};

use crate::config::WorldBounds;
use crate::dispatcher::gate;
use crate::particle::ParticleInstance;
use crate::snapshot::Diagnostics;

/// A child spawn waiting for the end of the pass
#[derive(Debug, Clone)]
pub(crate) struct ChildRequest {
    pub particle: String,
    pub position: DVec3,
    pub velocity: DVec3,
    pub lifetime: Option<u32>,
    pub depth: u32,
}

/// Mutable state shared by every particle step of one pass
pub(crate) struct Step<'a> {
    pub rng: &'a mut dyn RngCore,
    pub bounds: WorldBounds,
    pub children: &'a mut Vec<ChildRequest>,
    pub diagnostics: &'a mut Diagnostics,
}

impl Step<'_> {
    /// Advance one particle, returning whether it survives
    pub fn advance(&mut self, p: &mut ParticleInstance) -> bool {
        p.age += 1;
        if p.age >= p.lifetime {
            self.diagnostics.expired += 1;
            if !self.queue_children(&p.profile.on_death, p) {
                debug!("Particle {} expired without its on-death children", p.id);
            }
            return false;
        }

        integrate(&p.profile, &mut p.position, &mut p.velocity, &mut *self.rng);

        if !p.is_finite() {
            self.diagnostics.killed_non_finite += 1;
            warn!(
                "Killing particle {} (`{}`): non-finite state position={} velocity={}",
                p.id, p.profile.id, p.position, p.velocity
            );
            return false;
        }
        if !self.bounds.contains(p.position) {
            self.diagnostics.killed_out_of_bounds += 1;
            debug!("Particle {} left the world at {}", p.id, p.position);
            return false;
        }

        p.animate();

        let profile = p.profile.clone();
        self.queue_children(&profile.spawns_particles, p)
    }

    /// Evaluate child gates and queue the passing ones. Returns false when
    /// a gate fails to evaluate; nothing from `p` stays queued then.
    fn queue_children(&mut self, children: &[ChildSpawn], p: &ParticleInstance) -> bool {
        if children.is_empty() {
            return true;
        }
        let queued = self.children.len();
        let values = [
            Value::Double(f64::from(p.age)),
            Value::Double(f64::from(p.lifetime)),
            Value::Vec3(p.position),
            Value::Vec3(p.velocity),
            Value::Random,
        ];
        for child in children {
            if let Some(probability) = &child.probability {
                match gate(probability, &values, &mut *self.rng) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        self.diagnostics.evaluation_errors += 1;
                        warn!(
                            "Killing particle {} (`{}`): child `{}` probability: {e}",
                            p.id, p.profile.id, child.particle
                        );
                        self.children.truncate(queued);
                        return false;
                    }
                }
            }
            self.children.push(ChildRequest {
                particle: child.particle.clone(),
                position: p.position,
                velocity: p.velocity,
                lifetime: child.lifetime,
                depth: p.depth + 1,
            });
        }
        true
    }
}

/// Velocity and position update for one tick (steps 2 through 6)
pub(crate) fn integrate(
    profile: &ParticleProfile,
    position: &mut DVec3,
    velocity: &mut DVec3,
    rng: &mut dyn RngCore,
) {
    if let Some(add) = profile.velocity_add {
        *velocity += add;
    }
    if let Some(bound) = profile.velocity_jitter {
        let r = DVec3::new(rng.random(), rng.random(), rng.random());
        *velocity += (r * 2.0 - 1.0) * bound;
    }
    if let Some(gravity) = profile.gravity {
        velocity.y -= gravity;
    }

    let previous_y = position.y;
    *position += *velocity;

    if !profile.skips_friction {
        if let Some(friction) = profile.friction {
            *velocity *= friction;
        }
    }

    match profile.behavior {
        Some(Behavior::RisingFlame { drift }) => velocity.y += drift,
        Some(Behavior::AshSmoke { bias, spread }) => {
            velocity.y += bias;
            if position.y == previous_y {
                velocity.x *= spread;
                velocity.z *= spread;
            }
        }
        None => {}
    }
}
