//! Checked particle physics profiles

use std::sync::Arc;

use glam::{DVec3, DVec4};
use mc_particle_expr::{CompiledExpr, Scope, ValueKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::schema::{AxesDefinition, ChildDefinition, ProfileDefinition, RangeDefinition};

/// Inclusive lifetime range in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeRange {
    pub min: u32,
    pub max: u32,
}

impl LifetimeRange {
    /// Uniform sample in `[min, max]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.min == self.max {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

/// Size multiplier as a function of normalized age `t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SizeCurve {
    Constant { value: f64 },
    /// `min(1, t * multiplier)`
    LinearGrowClamped { multiplier: f64 },
    /// `max(0, 1 - t)^2 * factor`
    QuadraticShrink { factor: f64 },
    /// `t^2`
    EaseInQuad,
}

impl Default for SizeCurve {
    fn default() -> Self {
        Self::Constant { value: 1.0 }
    }
}

impl SizeCurve {
    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            Self::Constant { value } => value,
            Self::LinearGrowClamped { multiplier } => (t * multiplier).min(1.0),
            Self::QuadraticShrink { factor } => {
                let remaining = (1.0 - t).max(0.0);
                remaining * remaining * factor
            }
            Self::EaseInQuad => t * t,
        }
    }

    /// Reason the parameters are unusable, if any
    pub fn check(&self) -> Option<String> {
        match *self {
            Self::Constant { value } if !value.is_finite() => {
                Some(format!("size curve value {value} is not finite"))
            }
            Self::LinearGrowClamped { multiplier } if !(multiplier.is_finite() && multiplier > 0.0) => {
                Some(format!("size curve multiplier {multiplier} must be finite and > 0"))
            }
            Self::QuadraticShrink { factor } if !(factor.is_finite() && factor >= 0.0) => {
                Some(format!("size curve factor {factor} must be finite and >= 0"))
            }
            _ => None,
        }
    }
}

/// Per-particle behavior beyond the generic physics steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Behavior {
    /// Flames keep floating upward
    RisingFlame { drift: f64 },
    /// Ash and smoke: upward bias, horizontal spread when vertically stuck
    AshSmoke { bias: f64, spread: f64 },
}

impl Behavior {
    fn check(&self) -> Option<String> {
        let finite = match *self {
            Self::RisingFlame { drift } => drift.is_finite(),
            Self::AshSmoke { bias, spread } => bias.is_finite() && spread.is_finite(),
        };
        (!finite).then(|| format!("behavior {self:?} has non-finite parameters"))
    }
}

/// Child spawn attached to a profile
#[derive(Debug, Clone)]
pub struct ChildSpawn {
    pub particle: String,
    /// Compiled against [`child_scope`]; `None` means always
    pub probability: Option<CompiledExpr>,
    pub lifetime: Option<u32>,
}

/// Scope in which child probabilities are evaluated:
/// `age`, `lifetime`, `pos`, `velocity`, `random` (slots `$0..$4`)
pub fn child_scope() -> Scope {
    Scope::new()
        .with_named("age", ValueKind::Double)
        .with_named("lifetime", ValueKind::Double)
        .with_named("pos", ValueKind::Vec3)
        .with_named("velocity", ValueKind::Vec3)
        .with_named("random", ValueKind::Random)
}

/// Immutable physics profile, shared by every instance spawned from it
#[derive(Debug, Clone)]
pub struct ParticleProfile {
    pub id: String,
    /// `None`: the spawn call supplies the lifetime
    pub lifetime: Option<LifetimeRange>,
    /// Per-tick `velocity.y` delta; `None` and `Some(0.0)` are distinct
    pub gravity: Option<f64>,
    pub friction: Option<DVec3>,
    pub skips_friction: bool,
    pub velocity_multiplier: Option<DVec3>,
    pub velocity_add: Option<DVec3>,
    pub velocity_jitter: Option<DVec3>,
    pub color_base: DVec4,
    pub color_target: DVec4,
    pub color_scale: f64,
    pub lifetime_animation: bool,
    pub base_size: f64,
    pub size_curve: SizeCurve,
    pub spawns_particles: Vec<ChildSpawn>,
    pub on_death: Vec<ChildSpawn>,
    pub behavior: Option<Behavior>,
    pub textures: Vec<String>,
    pub sprite_from_age: bool,
}

impl ParticleProfile {
    /// Build and check a profile. On failure returns every reason found.
    pub fn from_definition(id: &str, def: &ProfileDefinition) -> Result<Self, Vec<String>> {
        let mut reasons = Vec::new();

        let lifetime = def.lifetime.map(|range| {
            let (min, max) = match range {
                RangeDefinition::Fixed(v) => (v, v),
                RangeDefinition::Range([a, b]) => (a, b),
            };
            if min == 0 || min > max {
                reasons.push(format!("lifetime range [{min}, {max}] must satisfy 1 <= min <= max"));
            }
            LifetimeRange { min, max }
        });

        let gravity = def.gravity;
        if gravity.is_some_and(|g| !g.is_finite()) {
            reasons.push("gravity is not finite".to_string());
        }

        let friction = axes(def.friction, "friction", &mut reasons);
        let velocity_multiplier = axes(def.velocity_multiplier, "velocityMultiplier", &mut reasons);
        let velocity_add = axes(def.velocity_add, "velocityAdd", &mut reasons);
        let velocity_jitter = axes(def.velocity_jitter, "velocityJitter", &mut reasons);

        let color_base = match &def.color_base {
            Some(c) => color(c, "colorBase", &mut reasons),
            None => DVec4::ONE,
        };
        let color_target = match &def.color_target {
            Some(c) => color(c, "colorTarget", &mut reasons),
            None => color_base.truncate().extend(0.0),
        };
        let color_scale = def.color_scale.unwrap_or(1.0);
        if !color_scale.is_finite() {
            reasons.push("colorScale is not finite".to_string());
        }

        let base_size = def.base_size.unwrap_or(1.0);
        if !(base_size.is_finite() && base_size >= 0.0) {
            reasons.push(format!("baseSize {base_size} must be finite and >= 0"));
        }

        let size_curve = def.size_curve.unwrap_or_default();
        reasons.extend(size_curve.check());
        if let Some(behavior) = &def.behavior {
            reasons.extend(behavior.check());
        }

        let spawns_particles = children(&def.spawns_particles, "spawnsParticles", &mut reasons);
        let on_death = children(&def.on_death, "onDeath", &mut reasons);

        if !reasons.is_empty() {
            return Err(reasons);
        }

        Ok(Self {
            id: id.to_string(),
            lifetime,
            gravity,
            friction,
            skips_friction: def.skips_friction,
            velocity_multiplier,
            velocity_add,
            velocity_jitter,
            color_base,
            color_target,
            color_scale,
            lifetime_animation: def.lifetime_animation,
            base_size,
            size_curve,
            spawns_particles,
            on_death,
            behavior: def.behavior,
            textures: def.textures.clone(),
            sprite_from_age: def.sprite_from_age,
        })
    }

    /// Ids of every particle this profile can spawn
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.spawns_particles
            .iter()
            .chain(&self.on_death)
            .map(|c| c.particle.as_str())
    }

    /// Color at normalized age `t`
    pub fn color_at(&self, t: f64) -> DVec4 {
        let k = (self.color_scale * t).clamp(0.0, 1.0);
        self.color_base.lerp(self.color_target, k)
    }

    /// Render size at normalized age `t`
    pub fn size_at(&self, t: f64) -> f64 {
        self.base_size * self.size_curve.evaluate(t)
    }
}

/// Shared handle to a profile
pub type ProfileRef = Arc<ParticleProfile>;

fn axes(def: Option<AxesDefinition>, field: &str, reasons: &mut Vec<String>) -> Option<DVec3> {
    let v = match def? {
        AxesDefinition::Uniform(s) => DVec3::splat(s),
        AxesDefinition::PerAxis(a) => DVec3::from_array(a),
    };
    if !v.is_finite() {
        reasons.push(format!("{field} is not finite"));
    }
    Some(v)
}

/// RGB or RGBA; alpha defaults to 1
pub(crate) fn color(components: &[f64], field: &str, reasons: &mut Vec<String>) -> DVec4 {
    let c = match *components {
        [r, g, b] => DVec4::new(r, g, b, 1.0),
        [r, g, b, a] => DVec4::new(r, g, b, a),
        _ => {
            reasons.push(format!(
                "{field} must have 3 or 4 components, found {}",
                components.len()
            ));
            return DVec4::ONE;
        }
    };
    if !c.is_finite() {
        reasons.push(format!("{field} is not finite"));
    }
    c
}

fn children(defs: &[ChildDefinition], field: &str, reasons: &mut Vec<String>) -> Vec<ChildSpawn> {
    let scope = child_scope();
    defs.iter()
        .filter_map(|def| {
            let probability = match &def.probability {
                None => None,
                Some(source) => match CompiledExpr::compile(&source.formula(), &scope) {
                    Ok(plan) => Some(plan),
                    Err(e) => {
                        reasons.push(format!(
                            "{field} entry `{}`: probability: {e}",
                            def.particle
                        ));
                        return None;
                    }
                },
            };
            if def.lifetime == Some(0) {
                reasons.push(format!("{field} entry `{}`: lifetime must be >= 1", def.particle));
            }
            Some(ChildSpawn {
                particle: def.particle.clone(),
                probability,
                lifetime: def.lifetime,
            })
        })
        .collect()
}
