//! Typed values, scopes and evaluation environments

use std::fmt;

use glam::{DVec3, IVec3};
use rand::RngCore;

/// Kind of a bound value or of an intermediate expression result
///
/// Scalar kinds (`Int`, `Double`, `Bool`) follow Java's primitive rules.
/// The remaining kinds model the game objects formulas reach into; they are
/// only ever read through the accessor allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueKind {
    Int,
    Double,
    Bool,
    Vec3,
    BlockPos,
    Direction,
    Entity,
    Random,
    BlockState,
    Level,
}

impl ValueKind {
    /// Parse a kind from its short name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "int" | "long" => Self::Int,
            "double" | "float" => Self::Double,
            "bool" | "boolean" => Self::Bool,
            "vec3" => Self::Vec3,
            "blockpos" | "pos" => Self::BlockPos,
            "direction" => Self::Direction,
            "entity" => Self::Entity,
            "random" | "randomsource" => Self::Random,
            "blockstate" | "state" => Self::BlockState,
            "level" | "world" => Self::Level,
            _ => return None,
        })
    }

    /// Whether values of this kind take part in arithmetic
    #[inline]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Double)
    }

    /// Whether this is a scalar (numeric or boolean) kind
    #[inline]
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Int | Self::Double | Self::Bool)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "boolean",
            Self::Vec3 => "Vec3",
            Self::BlockPos => "BlockPos",
            Self::Direction => "Direction",
            Self::Entity => "Entity",
            Self::Random => "RandomSource",
            Self::BlockState => "BlockState",
            Self::Level => "Level",
        })
    }
}

/// Read-only view of an entity as seen by emission formulas
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntityView {
    /// Feet position
    pub position: DVec3,
    /// Current delta movement
    pub velocity: DVec3,
    /// Bounding box width
    pub width: f64,
    /// Bounding box height
    pub height: f64,
}

/// A value bound into an environment slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Vec3(DVec3),
    BlockPos(IVec3),
    /// Unit step of a direction, e.g. `(0, 1, 0)` for up
    Direction(IVec3),
    Entity(EntityView),
    /// Marker for the injected random source; draws go to [`Env`]'s RNG
    Random,
    /// Opaque block state; properties are read through conditions instead
    BlockState,
    /// Opaque level handle
    Level,
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Bool(_) => ValueKind::Bool,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::BlockPos(_) => ValueKind::BlockPos,
            Self::Direction(_) => ValueKind::Direction,
            Self::Entity(_) => ValueKind::Entity,
            Self::Random => ValueKind::Random,
            Self::BlockState => ValueKind::BlockState,
            Self::Level => ValueKind::Level,
        }
    }

    /// Numeric view of a scalar, booleans map to 1/0
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            Self::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Parse textual input for a value of `kind`
    ///
    /// Vectors are written as `x,y,z`; directions accept either a step
    /// vector or one of `down up north south west east`. Entities take
    /// `x,y,z[,width,height]` and start at rest.
    pub fn parse_as(kind: ValueKind, text: &str) -> Option<Self> {
        let text = text.trim();
        Some(match kind {
            ValueKind::Int => Self::Int(text.parse().ok()?),
            ValueKind::Double => Self::Double(text.parse().ok()?),
            ValueKind::Bool => Self::Bool(text.parse().ok()?),
            ValueKind::Vec3 => {
                let [x, y, z] = parse_components::<3>(text)?;
                Self::Vec3(DVec3::new(x, y, z))
            }
            ValueKind::BlockPos => {
                let [x, y, z] = parse_components::<3>(text)?;
                Self::BlockPos(IVec3::new(x as i32, y as i32, z as i32))
            }
            ValueKind::Direction => Self::Direction(match text.to_ascii_lowercase().as_str() {
                "down" => IVec3::NEG_Y,
                "up" => IVec3::Y,
                "north" => IVec3::NEG_Z,
                "south" => IVec3::Z,
                "west" => IVec3::NEG_X,
                "east" => IVec3::X,
                other => {
                    let [x, y, z] = parse_components::<3>(other)?;
                    IVec3::new(x as i32, y as i32, z as i32)
                }
            }),
            ValueKind::Entity => {
                let parts: Vec<f64> = text
                    .split(',')
                    .map(|p| p.trim().parse::<f64>())
                    .collect::<Result<_, _>>()
                    .ok()?;
                match parts.as_slice() {
                    [x, y, z] => Self::Entity(EntityView {
                        position: DVec3::new(*x, *y, *z),
                        width: 0.6,
                        height: 1.8,
                        ..EntityView::default()
                    }),
                    [x, y, z, w, h] => Self::Entity(EntityView {
                        position: DVec3::new(*x, *y, *z),
                        width: *w,
                        height: *h,
                        ..EntityView::default()
                    }),
                    _ => return None,
                }
            }
            ValueKind::Random => Self::Random,
            ValueKind::BlockState => Self::BlockState,
            ValueKind::Level => Self::Level,
        })
    }
}

fn parse_components<const N: usize>(text: &str) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split(',');
    for slot in &mut out {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(out)
}

/// Declares what an expression may reference: typed positional slots
/// (`$0`, `$1`, ...) and names aliasing some of them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    slots: Vec<ValueKind>,
    names: Vec<(String, usize)>,
}

impl Scope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope from positional slot kinds
    pub fn from_kinds(kinds: &[ValueKind]) -> Self {
        Self {
            slots: kinds.to_vec(),
            names: Vec::new(),
        }
    }

    /// Append a positional slot
    pub fn with_slot(mut self, kind: ValueKind) -> Self {
        self.push_slot(kind);
        self
    }

    /// Append a slot reachable both as `$N` and by `name`
    pub fn with_named(mut self, name: &str, kind: ValueKind) -> Self {
        let slot = self.push_slot(kind);
        self.names.push((name.to_string(), slot));
        self
    }

    /// Make `name` refer to an existing slot
    pub fn with_alias(mut self, name: &str, slot: usize) -> Self {
        if slot < self.slots.len() {
            self.names.push((name.to_string(), slot));
        }
        self
    }

    /// Append a positional slot, returning its index
    pub fn push_slot(&mut self, kind: ValueKind) -> usize {
        self.slots.push(kind);
        self.slots.len() - 1
    }

    /// Number of slots an environment must bind
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// Declared kinds, in slot order
    pub fn kinds(&self) -> &[ValueKind] {
        &self.slots
    }

    /// Kind of slot `index`
    pub fn slot_kind(&self, index: usize) -> Option<ValueKind> {
        self.slots.get(index).copied()
    }

    /// Slot index a name refers to
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
    }
}

/// Evaluation environment: bound values plus the injected random source
pub struct Env<'a> {
    values: &'a [Value],
    rng: &'a mut dyn RngCore,
}

impl<'a> Env<'a> {
    /// Bind `values` (in slot order) and `rng`
    pub fn new(values: &'a [Value], rng: &'a mut dyn RngCore) -> Self {
        Self { values, rng }
    }

    /// Bound values
    pub fn values(&self) -> &[Value] {
        self.values
    }

    pub(crate) fn value(&self, slot: usize) -> Value {
        self.values[slot]
    }

    pub(crate) fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").field("values", &self.values).finish()
    }
}
