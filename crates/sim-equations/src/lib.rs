#![deny(warnings)]

//! Business equation compilation and resolution.
//!
//! Equations arrive as read-only configuration (area, output code, an
//! arithmetic expression over up to five dependents). They are parsed once
//! at catalog load into a small typed AST — only `+ - * /`, parentheses and
//! the functions `max min abs round pow sum` exist, so no arbitrary code can
//! execute and identifier substitution collisions are structurally
//! impossible. Resolution runs a single pass in fixed area-priority order
//! and reports the still-missing output set explicitly.

pub mod ast;
pub mod catalog;
pub mod resolver;

pub use ast::Expr;
pub use catalog::{CompiledEquation, EquationCatalog};
pub use resolver::{resolve, EquationStatus, Resolution};

use thiserror::Error;

/// Errors raised while loading or compiling an equation catalog.
#[derive(Debug, Error, PartialEq)]
pub enum EquationError {
    /// Expression text failed to parse.
    #[error("parse error in `{expr}`: {msg}")]
    Parse { expr: String, msg: String },
    /// Expression references a variable outside its declared dependents.
    #[error("equation for {output} references undeclared variable {var}")]
    UndeclaredVariable { output: String, var: String },
    /// Structural validation failed (empty output, too many dependents).
    #[error(transparent)]
    Invalid(#[from] sim_core::CoreError),
    /// The catalog file itself could not be read.
    #[error("invalid equation catalog: {0}")]
    Catalog(String),
}
