//! The allow-lists: pure functions and read-only accessors

use crate::value::ValueKind;

/// Allow-listed functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    /// Uniform draw in `[0, 1)`
    Random,
    /// Uniform integer draw in `[0, n)`
    RandomInt,
    /// Standard normal draw
    Gaussian,
    /// Fair coin
    RandomBool,
    Sin,
    Cos,
    Abs,
    Floor,
    Sqrt,
    Pow,
    FloorMod,
    Sign,
    Min,
    Max,
}

impl Function {
    /// Resolve a function name. Namespace prefixes (`Math.`, `Mth.`) are
    /// stripped by the parser before lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "random" => Self::Random,
            "randomInt" => Self::RandomInt,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "floorMod" => Self::FloorMod,
            "sign" | "signum" => Self::Sign,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        })
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Random | Self::Gaussian | Self::RandomBool => 0,
            Self::RandomInt | Self::Sin | Self::Cos | Self::Abs | Self::Floor | Self::Sqrt
            | Self::Sign => 1,
            Self::Pow | Self::FloorMod | Self::Min | Self::Max => 2,
        }
    }

    pub fn uses_random(self) -> bool {
        matches!(
            self,
            Self::Random | Self::RandomInt | Self::Gaussian | Self::RandomBool
        )
    }

    /// Result kind for the given (already numeric) argument kinds
    pub fn result_kind(self, args: &[ValueKind]) -> ValueKind {
        let all_int = args.iter().all(|k| *k == ValueKind::Int);
        match self {
            Self::RandomInt => ValueKind::Int,
            Self::RandomBool => ValueKind::Bool,
            Self::Abs | Self::FloorMod | Self::Min | Self::Max if all_int => ValueKind::Int,
            _ => ValueKind::Double,
        }
    }
}

/// Allow-listed accessors, each a projection of its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accessor {
    /// Component of a Vec3, BlockPos, Direction step or entity position
    Axis(Axis),
    /// `Vec3::length()`
    Length,
    /// `BlockPos::getCenter()`
    Center,
    /// `Entity::position()`
    EntityPosition,
    /// `Entity::getDeltaMovement()`
    EntityVelocity,
    EntityWidth,
    EntityHeight,
    /// `Entity::getRandomX(scale)` and friends
    EntityRandom(Axis),
    /// Draws on a `RandomSource` receiver
    Draw(Function),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
    Z,
}

/// Signature of a resolved accessor
pub(crate) struct AccessorSig {
    pub accessor: Accessor,
    pub params: &'static [ValueKind],
    pub result: ValueKind,
}

const NONE: &[ValueKind] = &[];
const ONE_DOUBLE: &[ValueKind] = &[ValueKind::Double];
const ONE_INT: &[ValueKind] = &[ValueKind::Int];

/// Look up `name` on a receiver of `kind`. `call` is false for field
/// syntax (`$0.x`), which only vectors allow.
pub(crate) fn accessor(kind: ValueKind, name: &str, call: bool) -> Option<AccessorSig> {
    let sig = |accessor, params, result| {
        Some(AccessorSig {
            accessor,
            params,
            result,
        })
    };

    match (kind, name, call) {
        (ValueKind::Vec3, "x", _) | (ValueKind::Vec3, "getX", true) => {
            sig(Accessor::Axis(Axis::X), NONE, ValueKind::Double)
        }
        (ValueKind::Vec3, "y", _) | (ValueKind::Vec3, "getY", true) => {
            sig(Accessor::Axis(Axis::Y), NONE, ValueKind::Double)
        }
        (ValueKind::Vec3, "z", _) | (ValueKind::Vec3, "getZ", true) => {
            sig(Accessor::Axis(Axis::Z), NONE, ValueKind::Double)
        }
        (ValueKind::Vec3, "length", true) => sig(Accessor::Length, NONE, ValueKind::Double),

        (ValueKind::BlockPos, "getX", true) => sig(Accessor::Axis(Axis::X), NONE, ValueKind::Int),
        (ValueKind::BlockPos, "getY", true) => sig(Accessor::Axis(Axis::Y), NONE, ValueKind::Int),
        (ValueKind::BlockPos, "getZ", true) => sig(Accessor::Axis(Axis::Z), NONE, ValueKind::Int),
        (ValueKind::BlockPos, "getCenter", true) => sig(Accessor::Center, NONE, ValueKind::Vec3),

        (ValueKind::Direction, "getStepX", true) => {
            sig(Accessor::Axis(Axis::X), NONE, ValueKind::Int)
        }
        (ValueKind::Direction, "getStepY", true) => {
            sig(Accessor::Axis(Axis::Y), NONE, ValueKind::Int)
        }
        (ValueKind::Direction, "getStepZ", true) => {
            sig(Accessor::Axis(Axis::Z), NONE, ValueKind::Int)
        }

        (ValueKind::Entity, "getX", true) => sig(Accessor::Axis(Axis::X), NONE, ValueKind::Double),
        (ValueKind::Entity, "getY", true) => sig(Accessor::Axis(Axis::Y), NONE, ValueKind::Double),
        (ValueKind::Entity, "getZ", true) => sig(Accessor::Axis(Axis::Z), NONE, ValueKind::Double),
        (ValueKind::Entity, "position", true) => {
            sig(Accessor::EntityPosition, NONE, ValueKind::Vec3)
        }
        (ValueKind::Entity, "getDeltaMovement", true) => {
            sig(Accessor::EntityVelocity, NONE, ValueKind::Vec3)
        }
        (ValueKind::Entity, "getBbWidth", true) => {
            sig(Accessor::EntityWidth, NONE, ValueKind::Double)
        }
        (ValueKind::Entity, "getBbHeight", true) => {
            sig(Accessor::EntityHeight, NONE, ValueKind::Double)
        }
        (ValueKind::Entity, "getRandomX", true) => {
            sig(Accessor::EntityRandom(Axis::X), ONE_DOUBLE, ValueKind::Double)
        }
        (ValueKind::Entity, "getRandomY", true) => {
            sig(Accessor::EntityRandom(Axis::Y), NONE, ValueKind::Double)
        }
        (ValueKind::Entity, "getRandomZ", true) => {
            sig(Accessor::EntityRandom(Axis::Z), ONE_DOUBLE, ValueKind::Double)
        }

        // All random call spellings collapse onto the same draw primitives
        (ValueKind::Random, "nextDouble" | "nextFloat" | "random", true) => {
            sig(Accessor::Draw(Function::Random), NONE, ValueKind::Double)
        }
        (ValueKind::Random, "nextInt", true) => {
            sig(Accessor::Draw(Function::RandomInt), ONE_INT, ValueKind::Int)
        }
        (ValueKind::Random, "nextGaussian", true) => {
            sig(Accessor::Draw(Function::Gaussian), NONE, ValueKind::Double)
        }
        (ValueKind::Random, "nextBoolean", true) => {
            sig(Accessor::Draw(Function::RandomBool), NONE, ValueKind::Bool)
        }

        _ => None,
    }
}

/// Java `Math.floorMod` for longs
pub(crate) fn floor_mod_int(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

/// `floorMod` extended to doubles: `a - b * floor(a / b)`
pub(crate) fn floor_mod_f64(a: f64, b: f64) -> f64 {
    a - b * (a / b).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_mod_matches_java() {
        assert_eq!(floor_mod_int(7, 3), 1);
        assert_eq!(floor_mod_int(-7, 3), 2);
        assert_eq!(floor_mod_int(7, -3), -2);
        assert_eq!(floor_mod_int(-7, -3), -1);
        assert_eq!(floor_mod_f64(-1.5, 1.0), 0.5);
    }

    #[test]
    fn test_field_syntax_only_on_vectors() {
        assert!(accessor(ValueKind::Vec3, "x", false).is_some());
        assert!(accessor(ValueKind::BlockPos, "getX", false).is_none());
        assert!(accessor(ValueKind::BlockPos, "getX", true).is_some());
        assert!(accessor(ValueKind::Level, "getGameTime", true).is_none());
    }

    #[test]
    fn test_random_spellings_share_primitive() {
        let a = accessor(ValueKind::Random, "nextDouble", true).unwrap();
        let b = accessor(ValueKind::Random, "nextFloat", true).unwrap();
        assert_eq!(a.accessor, b.accessor);
        assert_eq!(
            a.accessor,
            Accessor::Draw(Function::from_name("random").unwrap())
        );
    }
}
