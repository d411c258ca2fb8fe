//! Hook events and the emission dispatcher
//!
//! Firing an event runs every rule registered for `(source, id, hook)` in
//! declaration order:
//!
//! 1. the block-state condition is checked against the event's properties
//! 2. the loop count (if any) is evaluated once; each iteration binds the
//!    index after the hook arguments
//! 3. the probability gate decides whether the iteration emits
//! 4. `count` particles are spawned, each with freshly evaluated position
//!    and velocity
//!
//! Evaluation failures drop the affected spawn only. Loop iterations and
//! spawn attempts are each capped per rule and event.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use log::{trace, warn};
use mc_particle_data::{DataSet, EmissionRule, Hook, SourceKind, SpawnOptions};
use mc_particle_expr::{
    CompiledExpr, EntityView, Env, EvalError, PropertyBag, Value, ValueKind,
};
use rand::{Rng, RngCore};

use crate::error::{Result, SimError};
use crate::particle::{ParticleId, ParticleInstance};
use crate::snapshot::Diagnostics;
use crate::store::InstanceStore;

/// A trigger raised by the game for one block or entity
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    pub source: SourceKind,
    /// Block or entity type id, e.g. `candle`
    pub source_id: String,
    pub hook: String,
    /// Hook arguments in catalog order
    pub args: Vec<Value>,
    /// Block-state properties seen by rule conditions
    pub properties: PropertyBag,
}

impl HookEvent {
    pub fn new(
        source: SourceKind,
        source_id: impl Into<String>,
        hook: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            hook: hook.into(),
            args,
            properties: PropertyBag::new(),
        }
    }

    pub fn block(source_id: impl Into<String>, hook: impl Into<String>, args: Vec<Value>) -> Self {
        Self::new(SourceKind::Block, source_id, hook, args)
    }

    pub fn entity(source_id: impl Into<String>, hook: impl Into<String>, args: Vec<Value>) -> Self {
        Self::new(SourceKind::Entity, source_id, hook, args)
    }

    /// Event for a catalog hook with arguments derived from `position`
    ///
    /// Block positions are `position` floored, entities stand at `position`
    /// with a 0.6 x 1.8 box, integers are 0 and directions point up.
    pub fn synthesize(
        source: SourceKind,
        source_id: &str,
        hook: &str,
        position: DVec3,
    ) -> Result<Self> {
        let def = Hook::find(source, hook).ok_or_else(|| SimError::UnknownHook {
            owner: format!("{source} `{source_id}`"),
            hook: hook.to_string(),
        })?;
        let args = def
            .args
            .iter()
            .map(|kind| placeholder(*kind, position))
            .collect();
        Ok(Self::new(source, source_id, def.name, args))
    }

    pub fn with_properties(mut self, properties: PropertyBag) -> Self {
        self.properties = properties;
        self
    }
}

fn placeholder(kind: ValueKind, position: DVec3) -> Value {
    match kind {
        ValueKind::Int => Value::Int(0),
        ValueKind::Double => Value::Double(0.0),
        ValueKind::Bool => Value::Bool(false),
        ValueKind::Vec3 => Value::Vec3(position),
        ValueKind::BlockPos => Value::BlockPos(position.floor().as_ivec3()),
        ValueKind::Direction => Value::Direction(IVec3::Y),
        ValueKind::Entity => Value::Entity(EntityView {
            position,
            width: 0.6,
            height: 1.8,
            ..EntityView::default()
        }),
        ValueKind::Random => Value::Random,
        ValueKind::BlockState => Value::BlockState,
        ValueKind::Level => Value::Level,
    }
}

/// Everything needed to place one particle
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpawnRequest<'a> {
    pub particle: &'a str,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Used when the profile has no lifetime range
    pub lifetime: Option<u32>,
    pub options: SpawnOptions,
    pub depth: u32,
}

/// Evaluate a probability gate
///
/// Boolean formulas gate directly. Numeric formulas are a chance in
/// `[0, 1]` tested against exactly one extra draw.
pub(crate) fn gate(
    plan: &CompiledExpr,
    values: &[Value],
    rng: &mut dyn RngCore,
) -> std::result::Result<bool, EvalError> {
    if plan.result_kind() == ValueKind::Bool {
        return plan.evaluate_bool(&mut Env::new(values, &mut *rng));
    }
    let chance = plan.evaluate(&mut Env::new(values, &mut *rng))?;
    Ok(rng.random::<f64>() < chance)
}

fn evaluate_axes(
    axes: &[CompiledExpr; 3],
    values: &[Value],
    rng: &mut dyn RngCore,
) -> std::result::Result<DVec3, EvalError> {
    let mut out = [0.0; 3];
    for (slot, plan) in out.iter_mut().zip(axes) {
        *slot = plan.evaluate(&mut Env::new(values, &mut *rng))?;
    }
    Ok(DVec3::from_array(out))
}

/// Borrowed simulation state needed to spawn particles
pub(crate) struct Dispatcher<'a> {
    pub set: &'a DataSet,
    pub store: &'a mut InstanceStore,
    pub rng: &'a mut dyn RngCore,
    pub diagnostics: &'a mut Diagnostics,
    /// Per-rule cap on loop iterations and on spawn attempts
    pub max_emissions: u32,
}

impl Dispatcher<'_> {
    /// Run every rule matching `event`, returning the number of particles
    /// spawned
    pub fn fire(&mut self, event: &HookEvent) -> Result<usize> {
        let hook = Hook::find(event.source, &event.hook).ok_or_else(|| SimError::UnknownHook {
            owner: format!("{} `{}`", event.source, event.source_id),
            hook: event.hook.clone(),
        })?;
        let found: Vec<ValueKind> = event.args.iter().map(Value::kind).collect();
        if found != hook.args {
            return Err(SimError::argument_mismatch(hook.name, hook.args, &found));
        }

        let set = self.set;
        let mut spawned = 0;
        for rule in set.lookup(event.source, &event.source_id, hook.name) {
            if rule
                .condition
                .as_ref()
                .is_some_and(|c| !c.evaluate(&event.properties))
            {
                trace!("{} `{}`: condition {:?} is false", rule.source, rule.source_id, rule.condition);
                continue;
            }
            spawned += self.run_rule(rule, &event.args);
        }
        Ok(spawned)
    }

    fn run_rule(&mut self, rule: &EmissionRule, args: &[Value]) -> usize {
        let capped_before = self.diagnostics.emissions_capped;
        let spawned = self.run_capped(rule, args);
        let capped = self.diagnostics.emissions_capped - capped_before;
        if capped > 0 {
            warn!(
                "{} `{}` ({}): {capped} emissions of `{}` over the per-rule cap of {}",
                rule.source, rule.source_id, rule.hook.name, rule.particle, self.max_emissions
            );
        }
        spawned
    }

    fn run_capped(&mut self, rule: &EmissionRule, args: &[Value]) -> usize {
        let cap = i64::from(self.max_emissions);
        // Spawn attempts left for this rule
        let mut budget = cap;
        let mut values = args.to_vec();
        let Some(emission_loop) = &rule.emission_loop else {
            return self.run_iteration(rule, &values, &mut budget);
        };

        let mut iterations = match emission_loop
            .count
            .evaluate_int(&mut Env::new(&values, &mut *self.rng))
        {
            Ok(n) => n.max(0),
            Err(e) => {
                self.evaluation_failed(rule, "loop.count", &e);
                return 0;
            }
        };
        if iterations > cap {
            self.diagnostics.emissions_capped += (iterations - cap) as u64;
            iterations = cap;
        }

        values.push(Value::Int(0));
        let index_slot = values.len() - 1;
        let mut spawned = 0;
        for i in 0..iterations {
            if !self.store.has_room() {
                self.store_full(rule, (iterations - i) as u64);
                break;
            }
            values[index_slot] = Value::Int(i);
            spawned += self.run_iteration(rule, &values, &mut budget);
        }
        spawned
    }

    fn run_iteration(&mut self, rule: &EmissionRule, values: &[Value], budget: &mut i64) -> usize {
        if let Some(probability) = &rule.probability {
            match gate(probability, values, &mut *self.rng) {
                Ok(true) => {}
                Ok(false) => return 0,
                Err(e) => {
                    self.evaluation_failed(rule, "probability", &e);
                    return 0;
                }
            }
        }

        let mut count = match &rule.count {
            Some(plan) => match plan.evaluate_int(&mut Env::new(values, &mut *self.rng)) {
                Ok(n) => n.max(0),
                Err(e) => {
                    self.evaluation_failed(rule, "count", &e);
                    return 0;
                }
            },
            None => 1,
        };
        if count > *budget {
            self.diagnostics.emissions_capped += (count - *budget) as u64;
            count = *budget;
        }
        *budget -= count;

        let mut spawned = 0;
        for n in 0..count {
            if !self.store.has_room() {
                self.store_full(rule, (count - n) as u64);
                break;
            }
            let position = match evaluate_axes(&rule.position, values, &mut *self.rng) {
                Ok(p) => p,
                Err(e) => {
                    self.evaluation_failed(rule, "position", &e);
                    continue;
                }
            };
            let velocity = match evaluate_axes(&rule.velocity, values, &mut *self.rng) {
                Ok(v) => v,
                Err(e) => {
                    self.evaluation_failed(rule, "velocity", &e);
                    continue;
                }
            };
            let request = SpawnRequest {
                particle: &rule.particle,
                position,
                velocity,
                lifetime: rule.lifetime.or(rule.hook.default_lifetime),
                options: rule.options,
                depth: 0,
            };
            if self.spawn(request).is_some() {
                self.diagnostics.spawned += 1;
                spawned += 1;
            }
        }
        spawned
    }

    /// Resolve, size and push one particle
    pub fn spawn(&mut self, request: SpawnRequest<'_>) -> Option<ParticleId> {
        let set = self.set;
        let Some(profile) = set.resolve(request.particle) else {
            self.diagnostics.unknown_particle += 1;
            warn!(
                "[{}] Dropping spawn of unknown particle `{}`",
                set.version(),
                request.particle
            );
            return None;
        };

        let lifetime = profile
            .lifetime
            .map(|range| range.sample(&mut *self.rng))
            .or(request.lifetime)
            .filter(|l| *l > 0);
        let Some(lifetime) = lifetime else {
            self.diagnostics.missing_lifetime += 1;
            warn!("Dropping spawn of `{}`: no lifetime", request.particle);
            return None;
        };

        if !self.store.has_room() {
            self.diagnostics.store_full += 1;
            return None;
        }

        let velocity = match profile.velocity_multiplier {
            Some(m) => request.velocity * m,
            None => request.velocity,
        };
        let id = self.store.next_id();
        let mut particle =
            ParticleInstance::new(id, Arc::clone(profile), request.position, velocity, lifetime);
        particle.depth = request.depth;
        if let Some(color) = request.options.color {
            particle = particle.with_color(color);
        }
        if let Some(scale) = request.options.scale {
            particle = particle.with_scale(scale);
        }
        if !profile.textures.is_empty() && !profile.sprite_from_age {
            particle.texture_frame = Some(self.rng.random_range(0..profile.textures.len() as u32));
        }

        match self.store.push(particle) {
            Ok(id) => Some(id),
            Err(_) => {
                self.diagnostics.store_full += 1;
                None
            }
        }
    }

    fn evaluation_failed(&mut self, rule: &EmissionRule, field: &str, error: &EvalError) {
        self.diagnostics.evaluation_errors += 1;
        warn!(
            "{} `{}` ({}): dropping spawn of `{}`, {field}: {error}",
            rule.source, rule.source_id, rule.hook.name, rule.particle
        );
    }

    fn store_full(&mut self, rule: &EmissionRule, dropped: u64) {
        self.diagnostics.store_full += dropped;
        warn!(
            "Particle store full, dropping {dropped} spawns of `{}` from {} `{}`",
            rule.particle, rule.source, rule.source_id
        );
    }
}
