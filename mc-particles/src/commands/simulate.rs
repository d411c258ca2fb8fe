//! `simulate`: fire a hook and run the simulation for a number of ticks

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use mc_particle_data::{GameVersion, SourceKind};
use mc_particle_expr::PropertyBag;
use mc_particle_sim::{Diagnostics, HookEvent, SimConfig, Simulation, Snapshot};

use crate::cli::SimulateArgs;
use crate::commands::{load_catalog, parse_position};
use crate::utils::{add_table_row, create_progress_bar, create_table, format_vec3};

pub fn execute(args: SimulateArgs, quiet: bool) -> Result<()> {
    let (catalog, _) = load_catalog(&args.files)?;

    let version = match &args.game_version {
        Some(v) => GameVersion::from_string(v)?,
        None => catalog.latest().context("No data set loaded")?,
    };

    let mut config = match &args.config {
        Some(path) => SimConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(max) = args.max_particles {
        config.max_particles = max;
    }

    let Some((kind, source_id)) = args.source.split_once(':') else {
        bail!("Invalid source `{}`, expected kind:id", args.source);
    };
    let kind = SourceKind::from_name(kind).with_context(|| format!("Unknown source kind `{kind}`"))?;
    let hook = args.hook.clone().unwrap_or_else(|| {
        match kind {
            SourceKind::Block => "animateTick",
            SourceKind::Entity => "tick",
        }
        .to_string()
    });
    let properties: PropertyBag = if args.props.is_empty() {
        PropertyBag::new()
    } else {
        args.props
            .parse()
            .with_context(|| format!("Invalid properties `{}`", args.props))?
    };
    let event = HookEvent::synthesize(kind, source_id, &hook, parse_position(&args.pos)?)?
        .with_properties(properties);

    let mut sim = Simulation::new(Arc::new(catalog), version, config)?;
    let pb = create_progress_bar(args.ticks, "Simulating", quiet || args.json);
    let mut peak = 0;
    for tick in 0..args.ticks {
        let fire = match args.fire_every {
            0 => tick == 0,
            n => tick % n == 0,
        };
        if fire {
            sim.fire(&event)?;
        }
        let snapshot = sim.tick().context("Simulation halted")?;
        peak = peak.max(snapshot.len());
        pb.inc(1);
    }
    pb.finish_and_clear();

    let snapshot = sim.snapshot();
    if args.json {
        println!("{}", snapshot.to_json_pretty()?);
        return Ok(());
    }

    println!("{}", style("Simulation Summary").bold().cyan());
    println!("{}", style("==================").cyan());
    println!("Version: {version}");
    println!("Event: {kind}:{source_id} {hook}");
    println!("Ticks: {}", snapshot.tick);
    println!("Live particles: {} (peak {peak})", snapshot.len());
    println!();
    print_population(&snapshot);
    println!();
    print_diagnostics(sim.diagnostics());
    Ok(())
}

fn print_population(snapshot: &Snapshot) {
    let mut groups: BTreeMap<&str, (usize, glam::DVec3)> = BTreeMap::new();
    for p in &snapshot.particles {
        let entry = groups.entry(p.particle.as_str()).or_default();
        entry.0 += 1;
        entry.1 += p.position;
    }
    let mut table = create_table(&["Particle", "Count", "Mean position"]);
    for (particle, (count, sum)) in groups {
        add_table_row(
            &mut table,
            vec![
                particle.to_string(),
                count.to_string(),
                format_vec3(sum / count as f64),
            ],
        );
    }
    table.printstd();
}

fn print_diagnostics(d: &Diagnostics) {
    let mut table = create_table(&["Counter", "Value"]);
    let rows = [
        ("spawned", d.spawned),
        ("children spawned", d.children_spawned),
        ("expired", d.expired),
        ("despawned", d.despawned),
        ("unknown particle", d.unknown_particle),
        ("missing lifetime", d.missing_lifetime),
        ("store full", d.store_full),
        ("depth capped", d.depth_capped),
        ("emission cap", d.emissions_capped),
        ("evaluation errors", d.evaluation_errors),
        ("killed (non-finite)", d.killed_non_finite),
        ("killed (out of bounds)", d.killed_out_of_bounds),
    ];
    for (name, value) in rows {
        add_table_row(&mut table, vec![name.to_string(), value.to_string()]);
    }
    table.printstd();
}
