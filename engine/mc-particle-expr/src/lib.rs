//! Restricted expression language for particle emission formulas
//!
//! Formulas extracted from game source (`$2.getX() + 0.5`, `random() > 0.9`)
//! are compiled against a [`Scope`] that fixes the kind of every bound value.
//! The result is a [`CompiledExpr`]: an immutable plan that can be evaluated
//! any number of times against an [`Env`] of values plus an injected random
//! source.
//!
//! # Architecture
//!
//! - `lexer`: tokens with byte offsets
//! - `parser`: recursive descent with Java precedence and static typing
//! - `builtins`: the function and accessor allow-lists
//! - `plan`: evaluation of typed plan nodes
//! - `condition`: block-state predicates over a [`PropertyBag`]
//!
//! # Usage
//!
//! ```rust
//! use mc_particle_expr::{CompiledExpr, Env, Scope, Value, ValueKind};
//! use rand::{SeedableRng, rngs::StdRng};
//! use glam::IVec3;
//!
//! let scope = Scope::new()
//!     .with_slot(ValueKind::BlockState)
//!     .with_slot(ValueKind::Level)
//!     .with_slot(ValueKind::BlockPos)
//!     .with_slot(ValueKind::Random);
//! let plan = CompiledExpr::compile("$2.getY() + 0.7", &scope)?;
//!
//! let values = [
//!     Value::BlockState,
//!     Value::Level,
//!     Value::BlockPos(IVec3::new(0, 64, 0)),
//!     Value::Random,
//! ];
//! let mut rng = StdRng::seed_from_u64(7);
//! let y = plan.evaluate(&mut Env::new(&values, &mut rng))?;
//! assert!((y - 64.7).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod builtins;
pub mod condition;
pub mod error;
mod lexer;
mod parser;
mod plan;
pub mod value;

pub use condition::{Condition, PropertyBag, PropertyValue};
pub use error::{CompileError, ConditionError, EvalError, Result};
pub use plan::CompiledExpr;
pub use value::{EntityView, Env, Scope, Value, ValueKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
