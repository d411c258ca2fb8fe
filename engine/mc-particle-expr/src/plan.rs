//! Compiled evaluation plans

use std::fmt;

use glam::DVec3;
use rand::Rng;

use crate::builtins::{Accessor, Axis, Function, floor_mod_f64, floor_mod_int};
use crate::error::{CompileError, EvalError};
use crate::parser::Parser;
use crate::value::{Env, Scope, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Typed plan node. Kinds were checked by the parser, so evaluation only
/// re-checks what depends on bound values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Int(i64),
    Double(f64),
    Bool(bool),
    Slot(usize),
    ToDouble(Box<Node>),
    ToInt(Box<Node>),
    Neg(ValueKind, Box<Node>),
    Not(Box<Node>),
    /// Operator, operand kind after promotion, operands
    Arith(ArithOp, ValueKind, Box<Node>, Box<Node>),
    Compare(CmpOp, ValueKind, Box<Node>, Box<Node>),
    /// `true` for `==`
    BoolEq(bool, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Ternary(Box<Node>, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
    Access(Accessor, Box<Node>, Vec<Node>),
}

/// A formula compiled against a [`Scope`]
///
/// Plans are immutable and cheap to share; evaluating one never mutates it.
#[derive(Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    root: Node,
    kind: ValueKind,
    bindings: Vec<ValueKind>,
    uses_random: bool,
}

impl CompiledExpr {
    /// Compile `source` against `scope`
    pub fn compile(source: &str, scope: &Scope) -> Result<Self, CompileError> {
        let parsed = Parser::new(source, scope)?.parse()?;
        Ok(Self {
            source: source.to_string(),
            root: parsed.root,
            kind: parsed.kind,
            bindings: scope.kinds().to_vec(),
            uses_random: parsed.uses_random,
        })
    }

    /// Plan for a constant
    pub fn constant(value: f64) -> Self {
        Self {
            source: value.to_string(),
            root: Node::Double(value),
            kind: ValueKind::Double,
            bindings: Vec::new(),
            uses_random: false,
        }
    }

    /// Original formula text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Static kind of the result (`int`, `double` or `boolean`)
    pub fn result_kind(&self) -> ValueKind {
        self.kind
    }

    /// Number of values an environment must bind
    pub fn arity(&self) -> usize {
        self.bindings.len()
    }

    /// Whether evaluation draws from the random source
    pub fn uses_random(&self) -> bool {
        self.uses_random
    }

    /// Evaluate to a number; booleans yield 1 or 0
    pub fn evaluate(&self, env: &mut Env<'_>) -> Result<f64, EvalError> {
        self.check_bindings(env)?;
        let value = eval(&self.root, env)?;
        let number = value.as_f64().unwrap_or(f64::NAN);
        if number.is_finite() {
            Ok(number)
        } else {
            Err(EvalError::NonFinite(number))
        }
    }

    /// Evaluate as a predicate: booleans as-is, numbers are true when non-zero
    pub fn evaluate_bool(&self, env: &mut Env<'_>) -> Result<bool, EvalError> {
        self.check_bindings(env)?;
        match eval(&self.root, env)? {
            Value::Bool(b) => Ok(b),
            Value::Int(v) => Ok(v != 0),
            Value::Double(v) if v.is_nan() => Err(EvalError::NonFinite(v)),
            Value::Double(v) => Ok(v != 0.0),
            _ => Err(EvalError::NonFinite(f64::NAN)),
        }
    }

    /// Evaluate and truncate toward zero, as a Java `(int)` cast would
    pub fn evaluate_int(&self, env: &mut Env<'_>) -> Result<i64, EvalError> {
        self.check_bindings(env)?;
        match eval(&self.root, env)? {
            Value::Int(v) => Ok(v),
            Value::Bool(b) => Ok(i64::from(b)),
            Value::Double(v) if v.is_finite() => Ok(v as i64),
            Value::Double(v) => Err(EvalError::NonFinite(v)),
            _ => Err(EvalError::NonFinite(f64::NAN)),
        }
    }

    fn check_bindings(&self, env: &Env<'_>) -> Result<(), EvalError> {
        let values = env.values();
        if values.len() != self.bindings.len() {
            return Err(EvalError::ArityMismatch {
                expected: self.bindings.len(),
                found: values.len(),
            });
        }
        for (slot, (expected, value)) in self.bindings.iter().zip(values).enumerate() {
            if value.kind() != *expected {
                return Err(EvalError::BindingMismatch {
                    slot,
                    expected: *expected,
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn eval(node: &Node, env: &mut Env<'_>) -> Result<Value, EvalError> {
    Ok(match node {
        Node::Int(v) => Value::Int(*v),
        Node::Double(v) => Value::Double(*v),
        Node::Bool(v) => Value::Bool(*v),
        Node::Slot(slot) => env.value(*slot),
        Node::ToDouble(inner) => Value::Double(num(eval(inner, env)?)),
        // Rust's saturating `as` matches Java's narrowing (NaN becomes 0)
        Node::ToInt(inner) => match eval(inner, env)? {
            Value::Int(v) => Value::Int(v),
            other => Value::Int(num(other) as i64),
        },
        Node::Neg(kind, inner) => {
            let v = eval(inner, env)?;
            if *kind == ValueKind::Int {
                Value::Int(int(v).wrapping_neg())
            } else {
                Value::Double(-num(v))
            }
        }
        Node::Not(inner) => Value::Bool(!boolean(eval(inner, env)?)),
        Node::Arith(op, kind, l, r) => {
            let (l, r) = (eval(l, env)?, eval(r, env)?);
            if *kind == ValueKind::Int {
                Value::Int(int_arith(*op, int(l), int(r))?)
            } else {
                Value::Double(double_arith(*op, num(l), num(r)))
            }
        }
        Node::Compare(op, kind, l, r) => {
            let (l, r) = (eval(l, env)?, eval(r, env)?);
            Value::Bool(if *kind == ValueKind::Int {
                compare(*op, int(l), int(r))
            } else {
                compare(*op, num(l), num(r))
            })
        }
        Node::BoolEq(eq, l, r) => {
            let (l, r) = (boolean(eval(l, env)?), boolean(eval(r, env)?));
            Value::Bool((l == r) == *eq)
        }
        Node::And(l, r) => Value::Bool(boolean(eval(l, env)?) && boolean(eval(r, env)?)),
        Node::Or(l, r) => Value::Bool(boolean(eval(l, env)?) || boolean(eval(r, env)?)),
        Node::Ternary(c, a, b) => {
            if boolean(eval(c, env)?) {
                eval(a, env)?
            } else {
                eval(b, env)?
            }
        }
        Node::Call(function, args) => call(*function, args, env)?,
        Node::Access(accessor, receiver, args) => {
            let receiver = eval(receiver, env)?;
            access(*accessor, receiver, args, env)?
        }
    })
}

fn call(function: Function, args: &[Node], env: &mut Env<'_>) -> Result<Value, EvalError> {
    let mut values = [Value::Int(0); 2];
    for (slot, arg) in values.iter_mut().zip(args) {
        *slot = eval(arg, env)?;
    }
    let [a, b] = values;

    Ok(match function {
        Function::Random | Function::RandomInt | Function::Gaussian | Function::RandomBool => {
            draw(function, a, env)?
        }
        Function::Sin => Value::Double(num(a).sin()),
        Function::Cos => Value::Double(num(a).cos()),
        Function::Floor => Value::Double(num(a).floor()),
        Function::Sqrt => Value::Double(num(a).sqrt()),
        Function::Pow => Value::Double(num(a).powf(num(b))),
        Function::Sign => Value::Double(signum(num(a))),
        Function::Abs => match a {
            Value::Int(v) => Value::Int(v.wrapping_abs()),
            other => Value::Double(num(other).abs()),
        },
        Function::Min => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(x.min(y)),
            _ => Value::Double(java_min(num(a), num(b))),
        },
        Function::Max => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(x.max(y)),
            _ => Value::Double(java_max(num(a), num(b))),
        },
        Function::FloorMod => match (a, b) {
            (Value::Int(_), Value::Int(0)) => return Err(EvalError::DivideByZero),
            (Value::Int(x), Value::Int(y)) => Value::Int(floor_mod_int(x, y)),
            _ => Value::Double(floor_mod_f64(num(a), num(b))),
        },
    })
}

/// One draw from the environment's random source
fn draw(function: Function, bound: Value, env: &mut Env<'_>) -> Result<Value, EvalError> {
    let rng = env.rng();
    Ok(match function {
        Function::RandomInt => {
            let n = int(bound);
            if n <= 0 {
                return Err(EvalError::InvalidArgument {
                    function: "randomInt",
                    value: n,
                });
            }
            Value::Int(rng.random_range(0..n))
        }
        Function::Gaussian => Value::Double(gaussian(rng)),
        Function::RandomBool => Value::Bool(rng.random::<bool>()),
        _ => Value::Double(rng.random::<f64>()),
    })
}

/// Standard normal draw (Box-Muller, two uniform draws)
fn gaussian(rng: &mut dyn rand::RngCore) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn access(
    accessor: Accessor,
    receiver: Value,
    args: &[Node],
    env: &mut Env<'_>,
) -> Result<Value, EvalError> {
    let arg = match args.first() {
        Some(node) => Some(eval(node, env)?),
        None => None,
    };

    Ok(match (accessor, receiver) {
        (Accessor::Draw(function), Value::Random) => {
            draw(function, arg.unwrap_or(Value::Int(0)), env)?
        }
        (Accessor::Axis(axis), Value::Vec3(v)) => Value::Double(component(v, axis)),
        (Accessor::Axis(axis), Value::BlockPos(p) | Value::Direction(p)) => {
            Value::Int(i64::from(match axis {
                Axis::X => p.x,
                Axis::Y => p.y,
                Axis::Z => p.z,
            }))
        }
        (Accessor::Axis(axis), Value::Entity(e)) => Value::Double(component(e.position, axis)),
        (Accessor::Length, Value::Vec3(v)) => Value::Double(v.length()),
        (Accessor::Center, Value::BlockPos(p)) => Value::Vec3(p.as_dvec3() + DVec3::splat(0.5)),
        (Accessor::EntityPosition, Value::Entity(e)) => Value::Vec3(e.position),
        (Accessor::EntityVelocity, Value::Entity(e)) => Value::Vec3(e.velocity),
        (Accessor::EntityWidth, Value::Entity(e)) => Value::Double(e.width),
        (Accessor::EntityHeight, Value::Entity(e)) => Value::Double(e.height),
        (Accessor::EntityRandom(axis), Value::Entity(e)) => {
            let r = env.rng().random::<f64>();
            Value::Double(match axis {
                Axis::Y => e.position.y + e.height * r,
                _ => {
                    let scale = arg.map_or(1.0, num);
                    component(e.position, axis) + e.width * (2.0 * r - 1.0) * scale
                }
            })
        }
        (_, other) => {
            // Only reachable when a slot was bound with a kind other than
            // the one the plan was compiled for
            return Err(EvalError::BindingMismatch {
                slot: 0,
                expected: ValueKind::Double,
                found: other.kind(),
            });
        }
    })
}

fn component(v: DVec3, axis: Axis) -> f64 {
    match axis {
        Axis::X => v.x,
        Axis::Y => v.y,
        Axis::Z => v.z,
    }
}

fn num(v: Value) -> f64 {
    v.as_f64().unwrap_or(f64::NAN)
}

fn int(v: Value) -> i64 {
    match v {
        Value::Int(i) => i,
        other => num(other) as i64,
    }
}

fn boolean(v: Value) -> bool {
    matches!(v, Value::Bool(true))
}

fn int_arith(op: ArithOp, l: i64, r: i64) -> Result<i64, EvalError> {
    Ok(match op {
        ArithOp::Add => l.wrapping_add(r),
        ArithOp::Sub => l.wrapping_sub(r),
        ArithOp::Mul => l.wrapping_mul(r),
        ArithOp::Div if r == 0 => return Err(EvalError::DivideByZero),
        ArithOp::Div => l.wrapping_div(r),
        ArithOp::Rem if r == 0 => return Err(EvalError::DivideByZero),
        ArithOp::Rem => l.wrapping_rem(r),
    })
}

fn double_arith(op: ArithOp, l: f64, r: f64) -> f64 {
    match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => l / r,
        // Rust's `%` on floats is the truncated remainder, same as Java
        ArithOp::Rem => l % r,
    }
}

fn compare<T: PartialOrd>(op: CmpOp, l: T, r: T) -> bool {
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        CmpOp::Lt => l < r,
        CmpOp::Le => l <= r,
        CmpOp::Gt => l > r,
        CmpOp::Ge => l >= r,
    }
}

/// `Math.signum`: zero and NaN map to themselves
fn signum(v: f64) -> f64 {
    if v == 0.0 || v.is_nan() { v } else { v.signum() }
}

/// `Math.min` propagates NaN, unlike `f64::min`
fn java_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}
