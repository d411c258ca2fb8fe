//! The fixed-tick simulation driver

use std::sync::Arc;

use log::{error, trace};
use mc_particle_data::{GameVersion, ParticleCatalog, SpawnOptions};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::SimConfig;
use crate::dispatcher::{Dispatcher, HookEvent, SpawnRequest};
use crate::error::{Result, SimError};
use crate::particle::{ParticleId, ParticleInstance};
use crate::physics::{ChildRequest, Step};
use crate::snapshot::{Diagnostics, Snapshot};
use crate::store::{Aabb, DespawnRequest, InstanceStore};

/// Particle simulation for one data-set version
///
/// Owns the instance store and the random source. Hook events spawn
/// particles immediately; [`tick`](Self::tick) advances everything by one
/// fixed step and publishes a new [`Snapshot`].
#[derive(Debug)]
pub struct Simulation {
    catalog: Arc<ParticleCatalog>,
    version: GameVersion,
    config: SimConfig,
    store: InstanceStore,
    rng: StdRng,
    tick: u64,
    diagnostics: Diagnostics,
    halted: bool,
    snapshot: Arc<Snapshot>,
    children: Vec<ChildRequest>,
}

impl Simulation {
    /// Create a simulation of `version` from `catalog`
    pub fn new(catalog: Arc<ParticleCatalog>, version: GameVersion, config: SimConfig) -> Result<Self> {
        catalog.data_set(version)?;
        config.validate()?;
        Ok(Self {
            store: InstanceStore::new(config.max_particles),
            rng: StdRng::seed_from_u64(config.seed),
            catalog,
            version,
            config,
            tick: 0,
            diagnostics: Diagnostics::default(),
            halted: false,
            snapshot: Arc::new(Snapshot::default()),
            children: Vec::new(),
        })
    }

    pub fn version(&self) -> GameVersion {
        self.version
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of completed ticks
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Number of live particles
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn particles(&self) -> impl Iterator<Item = &ParticleInstance> {
        self.store.iter()
    }

    pub fn get(&self, id: ParticleId) -> Option<&ParticleInstance> {
        self.store.get(id)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether an invariant violation stopped the simulation
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The snapshot published by the last tick
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Run the rules matching `event`; returns the number of particles
    /// spawned. New particles are first simulated by the next tick.
    pub fn fire(&mut self, event: &HookEvent) -> Result<usize> {
        if self.halted {
            return Err(SimError::Halted);
        }
        let set = self.catalog.data_set(self.version)?;
        Dispatcher {
            set,
            store: &mut self.store,
            rng: &mut self.rng,
            diagnostics: &mut self.diagnostics,
            max_emissions: self.config.max_emissions_per_rule,
        }
        .fire(event)
    }

    /// Spawn a particle directly, bypassing rules
    pub fn spawn(
        &mut self,
        particle: &str,
        position: glam::DVec3,
        velocity: glam::DVec3,
        lifetime: Option<u32>,
    ) -> Result<Option<ParticleId>> {
        if self.halted {
            return Err(SimError::Halted);
        }
        let set = self.catalog.data_set(self.version)?;
        let id = Dispatcher {
            set,
            store: &mut self.store,
            rng: &mut self.rng,
            diagnostics: &mut self.diagnostics,
            max_emissions: self.config.max_emissions_per_rule,
        }
        .spawn(SpawnRequest {
            particle,
            position,
            velocity,
            lifetime,
            options: SpawnOptions::default(),
            depth: 0,
        });
        if id.is_some() {
            self.diagnostics.spawned += 1;
        }
        Ok(id)
    }

    /// Remove a particle at the next tick boundary
    pub fn despawn(&mut self, id: ParticleId) {
        self.store.request_despawn(DespawnRequest::One(id));
    }

    /// Remove every particle at the next tick boundary
    pub fn despawn_all(&mut self) {
        self.store.request_despawn(DespawnRequest::All);
    }

    /// Remove the particles inside `region` at the next tick boundary
    pub fn despawn_within(&mut self, region: Aabb) {
        self.store.request_despawn(DespawnRequest::Within(region));
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self) -> Result<Arc<Snapshot>> {
        if self.halted {
            return Err(SimError::Halted);
        }

        let removed = self.store.apply_despawns();
        self.diagnostics.despawned += removed as u64;

        let Some(tick) = self.tick.checked_add(1) else {
            return Err(self.halt(self.tick, "tick counter overflow".to_string()));
        };
        if let Some(reason) = self.check_store() {
            return Err(self.halt(tick, reason));
        }
        self.tick = tick;

        let mut step = Step {
            rng: &mut self.rng,
            bounds: self.config.bounds,
            children: &mut self.children,
            diagnostics: &mut self.diagnostics,
        };
        self.store.retain_mut(|p| step.advance(p));

        self.flush_children()?;

        self.snapshot = Arc::new(Snapshot::capture(tick, self.store.iter()));
        trace!(
            "Tick {tick}: {} live, {} spawned, {} expired",
            self.store.len(),
            self.diagnostics.spawned + self.diagnostics.children_spawned,
            self.diagnostics.expired
        );
        Ok(Arc::clone(&self.snapshot))
    }

    /// Spawn the children queued during the pass
    fn flush_children(&mut self) -> Result<()> {
        if self.children.is_empty() {
            return Ok(());
        }
        let set = self.catalog.data_set(self.version)?;
        let max_depth = self.config.max_spawn_depth;
        let mut dispatcher = Dispatcher {
            set,
            store: &mut self.store,
            rng: &mut self.rng,
            diagnostics: &mut self.diagnostics,
            max_emissions: self.config.max_emissions_per_rule,
        };
        for child in self.children.drain(..) {
            if child.depth > max_depth {
                dispatcher.diagnostics.depth_capped += 1;
                trace!("Dropping `{}` at spawn depth {}", child.particle, child.depth);
                continue;
            }
            let spawned = dispatcher.spawn(SpawnRequest {
                particle: &child.particle,
                position: child.position,
                velocity: child.velocity,
                lifetime: child.lifetime,
                options: SpawnOptions::default(),
                depth: child.depth,
            });
            if spawned.is_some() {
                dispatcher.diagnostics.children_spawned += 1;
            }
        }
        Ok(())
    }

    /// Describe the first impossible store state, if any
    fn check_store(&self) -> Option<String> {
        let mut previous: Option<ParticleId> = None;
        for p in self.store.iter() {
            if p.lifetime == 0 {
                return Some(format!("particle {} has lifetime 0", p.id));
            }
            if p.age >= p.lifetime {
                return Some(format!(
                    "particle {} is live with age {} >= lifetime {}",
                    p.id, p.age, p.lifetime
                ));
            }
            if previous.is_some_and(|prev| prev >= p.id) {
                return Some(format!("store order broken at particle {}", p.id));
            }
            previous = Some(p.id);
        }
        None
    }

    fn halt(&mut self, tick: u64, reason: String) -> SimError {
        self.halted = true;
        error!("[{}] Simulation halted at tick {tick}: {reason}", self.version);
        SimError::InvariantViolated { tick, reason }
    }
}
