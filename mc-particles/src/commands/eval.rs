//! `eval`: compile one formula and evaluate it

use anyhow::{Context, Result, bail};
use mc_particle_data::{Hook, SourceKind};
use mc_particle_expr::{CompiledExpr, Env, Scope, Value, ValueKind};
use mc_particle_sim::HookEvent;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cli::EvalArgs;
use crate::commands::parse_position;

pub fn execute(args: EvalArgs) -> Result<()> {
    let (scope, values) = match &args.hook {
        Some(spec) => hook_bindings(spec, &args.pos)?,
        None => explicit_bindings(&args.args)?,
    };

    let plan = CompiledExpr::compile(&args.expr, &scope)
        .with_context(|| format!("Failed to compile `{}`", args.expr))?;
    log::info!("Compiled `{plan}` -> {}", plan.result_kind());

    let mut rng = StdRng::seed_from_u64(args.seed);
    for _ in 0..args.samples.max(1) {
        let mut env = Env::new(&values, &mut rng);
        let output = match plan.result_kind() {
            ValueKind::Bool => plan.evaluate_bool(&mut env).map(|b| b.to_string()),
            ValueKind::Int => plan.evaluate_int(&mut env).map(|v| v.to_string()),
            _ => plan.evaluate(&mut env).map(|v| v.to_string()),
        }
        .with_context(|| format!("Failed to evaluate `{}`", args.expr))?;
        println!("{output}");
    }
    Ok(())
}

/// Scope and values from `kind=value` arguments
fn explicit_bindings(args: &[String]) -> Result<(Scope, Vec<Value>)> {
    let mut scope = Scope::new();
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let (kind_name, text) = arg.split_once('=').unwrap_or((arg.as_str(), ""));
        let kind = ValueKind::from_name(kind_name)
            .with_context(|| format!("Unknown value kind `{kind_name}` in `{arg}`"))?;
        let value = Value::parse_as(kind, text)
            .with_context(|| format!("Invalid {kind} value `{text}`"))?;
        scope.push_slot(kind);
        values.push(value);
    }
    Ok((scope, values))
}

/// Scope and placeholder values of a catalog hook written as `source:name`
fn hook_bindings(spec: &str, pos: &str) -> Result<(Scope, Vec<Value>)> {
    let Some((source, name)) = spec.split_once(':') else {
        bail!("Invalid hook `{spec}`, expected source:name");
    };
    let source = SourceKind::from_name(source)
        .with_context(|| format!("Unknown source kind `{source}`"))?;
    let hook = Hook::find(source, name).with_context(|| format!("Unknown hook `{spec}`"))?;
    let event = HookEvent::synthesize(source, "eval", hook.name, parse_position(pos)?)?;
    Ok((hook.scope(), event.args))
}
