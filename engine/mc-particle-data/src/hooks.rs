//! Built-in catalog of trigger hooks and the arguments each one binds

use std::fmt;

use mc_particle_expr::ValueKind::{BlockPos, BlockState, Entity, Int, Level, Random};
use mc_particle_expr::{Scope, ValueKind};

/// What kind of game object owns a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Block,
    Entity,
}

impl SourceKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "block" | "blocks" => Some(Self::Block),
            "entity" | "entities" => Some(Self::Entity),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Entity => "entity",
        })
    }
}

/// A trigger point and the typed values it binds to `$0..`
#[derive(Debug, PartialEq, Eq)]
pub struct Hook {
    pub source: SourceKind,
    pub name: &'static str,
    pub args: &'static [ValueKind],
    /// Slot that `this` refers to
    pub this_slot: usize,
    /// Lifetime used when neither the profile nor the rule supplies one
    pub default_lifetime: Option<u32>,
}

/// Every hook the engine knows about
pub static HOOKS: &[Hook] = &[
    Hook {
        source: SourceKind::Block,
        name: "animateTick",
        args: &[BlockState, Level, BlockPos, Random],
        this_slot: 2,
        default_lifetime: None,
    },
    Hook {
        source: SourceKind::Block,
        name: "stateChange",
        args: &[BlockState, BlockState, Level, BlockPos, Random],
        this_slot: 3,
        default_lifetime: None,
    },
    Hook {
        source: SourceKind::Block,
        name: "stepOn",
        args: &[Level, BlockPos, BlockState, Entity, Random],
        this_slot: 1,
        default_lifetime: None,
    },
    Hook {
        source: SourceKind::Entity,
        name: "tick",
        args: &[Entity, Level, Random],
        this_slot: 0,
        default_lifetime: None,
    },
    Hook {
        source: SourceKind::Entity,
        name: "handleEntityEvent",
        args: &[Entity, Int, Random],
        this_slot: 0,
        default_lifetime: None,
    },
];

impl Hook {
    /// Look up a hook by source kind and name
    pub fn find(source: SourceKind, name: &str) -> Option<&'static Self> {
        HOOKS.iter().find(|h| h.source == source && h.name == name)
    }

    /// Scope for formulas attached to this hook
    pub fn scope(&self) -> Scope {
        Scope::from_kinds(self.args).with_alias("this", self.this_slot)
    }

    /// Index of the first argument of `kind`
    pub fn slot_of(&self, kind: ValueKind) -> Option<usize> {
        self.args.iter().position(|k| *k == kind)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}(", self.source, self.name)?;
        for (i, kind) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{kind}")?;
        }
        f.write_str(")")
    }
}
