//! Resolved syntax tree for the strata lowering stage.
//!
//! This module defines the tree the upstream resolver hands over:
//! - Program, compilation unit and class structure
//! - Statements (declarations, control flow, etc.)
//! - Expressions, each identifier already carrying its resolved `Binding`
//!
//! Nodes that introduce a lexical scope carry a `NodeId`; every local binding
//! carries a `LocalId`. Both are unique within one program.

use crate::interner::Symbol;
use crate::span::Span;
use std::fmt;

pub mod declaration;
pub mod expression;
pub mod statement;
pub mod visitor;

pub use declaration::*;
pub use expression::*;
pub use statement::*;
pub use visitor::*;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a scope-introducing node (function, block, for, catch)
    NodeId,
    "n"
);
id_type!(
    /// Identity of a local binding (parameter, variable, catch variable, local function)
    LocalId,
    "l"
);
id_type!(
    /// Identity of a class declaration
    ClassId,
    "c"
);
id_type!(
    /// Identity of a top-level function declaration
    FunctionId,
    "f"
);

/// Identifier
///
/// Represents a name as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: Symbol,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: Symbol, span: Span) -> Self {
        Self { name, span }
    }
}

/// Names beginning with an underscore are library-private.
pub fn is_private_name(text: &str) -> bool {
    text.starts_with('_')
}
