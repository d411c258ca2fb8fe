//! Command implementations

pub mod eval;
pub mod info;
pub mod simulate;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::DVec3;
use mc_particle_data::{LoadReport, ParticleCatalog};
use mc_particle_expr::{Value, ValueKind};

/// Load every file into one catalog, keeping the per-file reports
pub(crate) fn load_catalog(files: &[PathBuf]) -> Result<(ParticleCatalog, Vec<LoadReport>)> {
    let mut catalog = ParticleCatalog::new();
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let report = catalog
            .load_path(file)
            .with_context(|| format!("Failed to load data set: {}", file.display()))?;
        for rejection in &report.rejections {
            log::warn!("{rejection}");
        }
        reports.push(report);
    }
    Ok((catalog, reports))
}

/// Parse `x,y,z`
pub(crate) fn parse_position(text: &str) -> Result<DVec3> {
    match Value::parse_as(ValueKind::Vec3, text) {
        Some(Value::Vec3(v)) => Ok(v),
        _ => anyhow::bail!("Invalid position `{text}`, expected x,y,z"),
    }
}
