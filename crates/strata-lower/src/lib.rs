//! Strata lowering stage
//!
//! Turns a resolved, lexically scoped, class-based program into a flat list
//! of globally named declarations for targets without nested functions:
//!
//! - **Scopes** (`scope`): per-declaration scope tree with capture flags
//! - **Captures** (`capture`): which scopes and receivers each closure needs
//! - **Mangling** (`mangle`): collision-free global and local names
//! - **Lowering** (`lower`): closure hoisting, scope alias objects and
//!   uniform-convention trampolines
//! - **Ordering** (`order`): stable dependency order of the output
//! - **Flat model** (`flat`): the result, serializable and pretty-printable
//!
//! ```ignore
//! let program = lower_program(&ast, &interner, &LowerOptions::default())?;
//! println!("{}", program.pretty_print());
//! ```

#![warn(rust_2018_idioms)]

pub mod capture;
pub mod error;
pub mod flat;
mod lower;
pub mod mangle;
pub mod options;
pub mod order;
pub mod scope;

pub use capture::{analyze, Analysis, ClosureInfo};
pub use error::{LowerError, LowerResult};
pub use flat::{FlatDecl, FlatExpr, FlatFunction, FlatProgram, FlatStmt, PrettyPrint};
pub use lower::lower_program;
pub use mangle::{MangleContext, NameTable, Role};
pub use options::LowerOptions;
pub use order::{order_declarations, DeclGraph, DeclKind, Declaration};
pub use scope::{DeclarationBody, ScopeId, ScopeTree};
