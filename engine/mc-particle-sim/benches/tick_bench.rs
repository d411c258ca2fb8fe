use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use glam::{DVec3, IVec3};
use mc_particle_data::{DataSetDefinition, GameVersion, ParticleCatalog};
use mc_particle_expr::Value;
use mc_particle_sim::{HookEvent, SimConfig, Simulation};
use std::hint::black_box;
use std::sync::Arc;

const DATA: &str = r#"
version: "1.20.4"
physics:
  lava:
    lifetime: [16, 40]
    gravity: 0.02
    friction: 0.999
    lifetimeAnimation: true
    sizeCurve: { type: quadratic_shrink, factor: 1.0 }
    spawnsParticles:
      - particle: smoke
        probability: "random() > age / lifetime"
  smoke:
    lifetime: [8, 12]
    gravity: -0.01
    friction: 0.96
    lifetimeAnimation: true
    sizeCurve: { type: linear_grow_clamped, multiplier: 32.0 }
    behavior: { type: ash_smoke, bias: 0.004, spread: 1.1 }
    textures: [smoke_0, smoke_1, smoke_2, smoke_3]
    spriteFromAge: true
blocks:
  lava:
    - hook: animateTick
      particle: lava
      position: ["$2.getX() + $3.nextDouble()", "$2.getY() + 1.0", "$2.getZ() + $3.nextDouble()"]
      velocity: ["$3.nextGaussian() * 0.1", "0.2", "$3.nextGaussian() * 0.1"]
"#;

fn catalog() -> Arc<ParticleCatalog> {
    let mut catalog = ParticleCatalog::new();
    catalog
        .add(&DataSetDefinition::from_yaml_str(DATA).unwrap())
        .unwrap();
    Arc::new(catalog)
}

fn lava_event(x: i32, z: i32) -> HookEvent {
    HookEvent::block(
        "lava",
        "animateTick",
        vec![
            Value::BlockState,
            Value::Level,
            Value::BlockPos(IVec3::new(x, 64, z)),
            Value::Random,
        ],
    )
}

/// A simulation with a settled population of lava and smoke
fn populated(catalog: &Arc<ParticleCatalog>) -> Simulation {
    let mut sim = Simulation::new(
        Arc::clone(catalog),
        GameVersion::new(1, 20, 4),
        SimConfig::with_seed(7),
    )
    .unwrap();
    let events: Vec<HookEvent> = (0..16)
        .flat_map(|x| (0..16).map(move |z| lava_event(x, z)))
        .collect();
    for _ in 0..40 {
        for event in &events {
            sim.fire(event).unwrap();
        }
        sim.tick().unwrap();
    }
    sim
}

fn tick_benchmark(c: &mut Criterion) {
    let catalog = catalog();

    c.bench_function("tick_populated", |b| {
        b.iter_batched(
            || populated(&catalog),
            |mut sim| {
                black_box(sim.tick().unwrap());
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("fire_lava_chunk", |b| {
        let events: Vec<HookEvent> = (0..16)
            .flat_map(|x| (0..16).map(move |z| lava_event(x, z)))
            .collect();
        b.iter_batched(
            || {
                Simulation::new(
                    Arc::clone(&catalog),
                    GameVersion::new(1, 20, 4),
                    SimConfig::with_seed(1),
                )
                .unwrap()
            },
            |mut sim| {
                for event in &events {
                    black_box(sim.fire(event).unwrap());
                }
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("spawn_and_drain", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(
                Arc::clone(&catalog),
                GameVersion::new(1, 20, 4),
                SimConfig::with_seed(3),
            )
            .unwrap();
            for i in 0..1000 {
                sim.spawn("smoke", DVec3::new(f64::from(i), 64.0, 0.0), DVec3::ZERO, None)
                    .unwrap();
            }
            while !sim.is_empty() {
                sim.tick().unwrap();
            }
            black_box(sim.diagnostics().expired)
        })
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
