//! Fixed-tick particle simulation
//!
//! Drives particles described by an [`mc_particle_data`] catalog. Hook
//! events raised by the game run the matching emission rules; every
//! [`Simulation::tick`] then advances the live particles by one step and
//! publishes an immutable [`Snapshot`] for rendering.
//!
//! # Architecture
//!
//! - [`HookEvent`]: a trigger with its typed arguments and block-state
//!   properties
//! - `Dispatcher`: evaluates conditions, loops, probability gates and
//!   spawn formulas
//! - [`InstanceStore`]: bounded, order-preserving storage of live particles
//! - `Step`: the per-particle physics, animation and child-spawn pass
//! - [`Snapshot`] and [`Diagnostics`]: what the renderer and tooling read
//!
//! The simulation is single-threaded. Children spawned during a tick, as
//! well as despawn requests, take effect at the tick boundary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use glam::DVec3;
//! use mc_particle_data::{GameVersion, ParticleCatalog, SourceKind};
//! use mc_particle_sim::{HookEvent, SimConfig, Simulation};
//!
//! let mut catalog = ParticleCatalog::new();
//! catalog.load_path("data/1.20.4.yaml")?;
//! let version = GameVersion::from_string("1.20.4")?;
//!
//! let mut sim = Simulation::new(Arc::new(catalog), version, SimConfig::with_seed(42))?;
//! let event = HookEvent::synthesize(SourceKind::Block, "candle", "animateTick", DVec3::ZERO)?
//!     .with_properties("LIT=true,CANDLES=1".parse()?);
//! sim.fire(&event)?;
//!
//! for _ in 0..20 {
//!     let snapshot = sim.tick()?;
//!     println!("tick {}: {} particles", snapshot.tick, snapshot.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod particle;
mod physics;
pub mod simulator;
pub mod snapshot;
pub mod store;

pub use config::{SimConfig, WorldBounds};
pub use dispatcher::HookEvent;
pub use error::{ConfigError, Result, SimError};
pub use particle::{ParticleId, ParticleInstance};
pub use simulator::Simulation;
pub use snapshot::{Diagnostics, ParticleSnapshot, Snapshot};
pub use store::{Aabb, DespawnRequest, InstanceStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
