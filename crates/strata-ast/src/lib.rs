//! Strata resolved syntax tree
//!
//! This crate holds the input of the strata lowering stage: a fully resolved,
//! class-based, lexically scoped program.
//!
//! - **Interner**: identifier text as small `Symbol`s (`interner` module)
//! - **AST**: declarations, statements and expressions whose identifiers
//!   already carry resolved bindings (`ast` module)
//! - **Builder**: identity allocation and node construction (`builder` module)

#![warn(rust_2018_idioms)]

pub mod ast;
pub mod builder;
pub mod interner;
pub mod span;

pub use builder::AstBuilder;
pub use interner::{Interner, Symbol};
pub use span::Span;
