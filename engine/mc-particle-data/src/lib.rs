//! Versioned particle data sets
//!
//! A data set is the generated description of one game version's particle
//! system: physics profiles keyed by particle id, and emission rules keyed
//! by block or entity type and trigger hook. This crate loads data sets from
//! JSON or YAML, compiles every formula, and keeps several versions side by
//! side in a [`ParticleCatalog`].
//!
//! Loading is lenient per entry and strict per formula. A malformed
//! expression, an unknown hook or a dangling particle reference rejects only
//! the affected profile or rule; the rejection is listed in the
//! [`LoadReport`] and the rest of the data set remains usable.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mc_particle_data::{GameVersion, ParticleCatalog, SourceKind};
//!
//! let mut catalog = ParticleCatalog::new();
//! let report = catalog.load_path("data/1.20.4.yaml")?;
//! for rejection in &report.rejections {
//!     eprintln!("{rejection}");
//! }
//!
//! let version = GameVersion::from_string("1.20.4")?;
//! let rules = catalog.lookup(version, SourceKind::Block, "candle", "animateTick");
//! println!("{} candle rules", rules.len());
//! # Ok::<(), mc_particle_data::DataError>(())
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod hooks;
pub mod profile;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod version;

pub use catalog::{DataSet, LoadReport, ParticleCatalog, Rejection, RejectionScope};
pub use error::{DataError, Result};
pub use hooks::{HOOKS, Hook, SourceKind};
pub use profile::{
    Behavior, ChildSpawn, LifetimeRange, ParticleProfile, ProfileRef, SizeCurve, child_scope,
};
pub use registry::ProfileRegistry;
pub use rules::{EmissionLoop, EmissionRule, RuleIndex, SpawnOptions};
pub use schema::{DataFormat, DataSetDefinition};
pub use version::GameVersion;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
