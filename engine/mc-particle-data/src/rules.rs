//! Compiled emission rules and the per-source index

use std::collections::HashMap;

use glam::DVec4;
use mc_particle_expr::{CompiledExpr, Condition, Scope, ValueKind};

use crate::hooks::{Hook, SourceKind};
use crate::schema::{ExprSource, RuleDefinition};

/// Fixed payload applied to particles spawned by a rule
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpawnOptions {
    /// Replaces the profile's base color
    pub color: Option<DVec4>,
    /// Multiplies the profile's base size
    pub scale: Option<f64>,
}

/// Counted loop around a rule's spawn
#[derive(Debug, Clone)]
pub struct EmissionLoop {
    /// Compiled against the hook scope
    pub count: CompiledExpr,
    /// Name the iteration index is bound to (an `int`, appended after the
    /// hook arguments)
    pub index: String,
}

/// One compiled emission rule
#[derive(Debug, Clone)]
pub struct EmissionRule {
    pub source: SourceKind,
    pub source_id: String,
    pub hook: &'static Hook,
    pub particle: String,
    pub options: SpawnOptions,
    pub condition: Option<Condition>,
    pub position: [CompiledExpr; 3],
    pub velocity: [CompiledExpr; 3],
    pub probability: Option<CompiledExpr>,
    pub count: Option<CompiledExpr>,
    pub emission_loop: Option<EmissionLoop>,
    pub lifetime: Option<u32>,
}

impl EmissionRule {
    /// Compile a rule definition for `source_id`
    ///
    /// Returns the reason the rule is unusable on failure.
    pub fn compile(
        source: SourceKind,
        source_id: &str,
        def: &RuleDefinition,
    ) -> Result<Self, String> {
        let hook = Hook::find(source, &def.hook)
            .ok_or_else(|| format!("unknown {source} hook `{}`", def.hook))?;

        let condition = def
            .condition
            .as_deref()
            .map(Condition::parse)
            .transpose()
            .map_err(|e| format!("condition: {e}"))?;

        let hook_scope = hook.scope();
        let emission_loop = match &def.emission_loop {
            Some(l) => Some(EmissionLoop {
                count: compile(&l.count, &hook_scope, "loop.count")?,
                index: l.index.clone(),
            }),
            None => None,
        };

        let spawn_scope = match &emission_loop {
            Some(l) => hook_scope.clone().with_named(&l.index, ValueKind::Int),
            None => hook_scope,
        };

        let position = compile_axes(&def.position, &spawn_scope, "position")?;
        let velocity = compile_axes(&def.velocity, &spawn_scope, "velocity")?;
        let probability = def
            .probability
            .as_ref()
            .map(|p| compile(p, &spawn_scope, "probability"))
            .transpose()?;
        let count = def
            .count
            .as_ref()
            .map(|c| compile(c, &spawn_scope, "count"))
            .transpose()?;
        if count.as_ref().is_some_and(|c| c.result_kind() == ValueKind::Bool) {
            return Err("count: expected a number, found boolean".to_string());
        }

        let options = match &def.options {
            Some(o) => {
                let mut reasons = Vec::new();
                let color = o
                    .color
                    .as_ref()
                    .map(|c| crate::profile::color(c, "options.color", &mut reasons));
                if let Some(reason) = reasons.into_iter().next() {
                    return Err(reason);
                }
                if o.scale.is_some_and(|s| !(s.is_finite() && s >= 0.0)) {
                    return Err("options.scale must be finite and >= 0".to_string());
                }
                SpawnOptions {
                    color,
                    scale: o.scale,
                }
            }
            None => SpawnOptions::default(),
        };

        if def.lifetime == Some(0) {
            return Err("lifetime must be >= 1".to_string());
        }

        Ok(Self {
            source,
            source_id: source_id.to_string(),
            hook,
            particle: def.particle.clone(),
            options,
            condition,
            position,
            velocity,
            probability,
            count,
            emission_loop,
            lifetime: def.lifetime,
        })
    }
}

fn compile(source: &ExprSource, scope: &Scope, field: &str) -> Result<CompiledExpr, String> {
    CompiledExpr::compile(&source.formula(), scope).map_err(|e| format!("{field}: {e}"))
}

fn compile_axes(
    sources: &[ExprSource],
    scope: &Scope,
    field: &str,
) -> Result<[CompiledExpr; 3], String> {
    let [x, y, z] = sources else {
        return Err(format!(
            "{field} must have exactly 3 expressions, found {}",
            sources.len()
        ));
    };
    Ok([
        compile(x, scope, &format!("{field}[0]"))?,
        compile(y, scope, &format!("{field}[1]"))?,
        compile(z, scope, &format!("{field}[2]"))?,
    ])
}

/// Rules of one data set keyed by `(source kind, source id, hook)`
#[derive(Debug, Default)]
pub struct RuleIndex {
    rules: HashMap<(SourceKind, String, &'static str), Vec<EmissionRule>>,
    len: usize,
}

impl RuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule behind those already registered for its key
    pub fn push(&mut self, rule: EmissionRule) {
        self.rules
            .entry((rule.source, rule.source_id.clone(), rule.hook.name))
            .or_default()
            .push(rule);
        self.len += 1;
    }

    /// Rules for a source and hook, in declaration order
    pub fn lookup(&self, source: SourceKind, source_id: &str, hook: &str) -> &[EmissionRule] {
        // Keys hold the catalog's static name, so resolve through the catalog
        let Some(hook) = Hook::find(source, hook) else {
            return &[];
        };
        self.rules
            .get(&(source, source_id.to_string(), hook.name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of rules
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Source ids with at least one rule of `kind`, sorted
    pub fn sources(&self, kind: SourceKind) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .rules
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmissionRule> {
        self.rules.values().flatten()
    }
}
