//! Equation catalog loading and compilation.
//!
//! The catalog is read-only configuration loaded once per simulation run.
//! Compilation parses every expression into its AST and checks that it only
//! references declared dependents, so a malformed catalog fails at load
//! time, never mid-run.

use serde::Deserialize;
use sim_core::{validate_equation, Area, Equation, VarCode};
use tracing::debug;

use crate::ast::Expr;
use crate::EquationError;

/// One equation with its expression parsed.
#[derive(Clone, Debug)]
pub struct CompiledEquation {
    pub area: Area,
    pub output: VarCode,
    pub expr: Expr,
    pub depends: Vec<VarCode>,
    /// Original expression text, kept for diagnostics.
    pub source: String,
}

/// Ordered set of compiled equations.
#[derive(Clone, Debug, Default)]
pub struct EquationCatalog {
    equations: Vec<CompiledEquation>,
}

impl EquationCatalog {
    /// Compile raw equation records, preserving their stored order.
    pub fn compile(raw: Vec<Equation>) -> Result<Self, EquationError> {
        let mut equations = Vec::with_capacity(raw.len());
        for eq in raw {
            validate_equation(&eq)?;
            let expr = Expr::parse(&eq.expression)?;
            for var in expr.vars() {
                if !eq.depends.contains(&var) {
                    return Err(EquationError::UndeclaredVariable {
                        output: eq.output.0.clone(),
                        var: var.0,
                    });
                }
            }
            equations.push(CompiledEquation {
                area: eq.area,
                output: eq.output,
                expr,
                depends: eq.depends,
                source: eq.expression,
            });
        }
        debug!(count = equations.len(), "equation catalog compiled");
        Ok(Self { equations })
    }

    /// Load and compile a YAML catalog: a list of
    /// `{area, output, expression, depends}` entries.
    pub fn from_yaml_str(text: &str) -> Result<Self, EquationError> {
        #[derive(Deserialize)]
        struct File {
            equations: Vec<Equation>,
        }
        let file: File =
            serde_yaml::from_str(text).map_err(|e| EquationError::Catalog(e.to_string()))?;
        Self::compile(file.equations)
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledEquation> {
        self.equations.iter()
    }

    /// Equations in resolution order: the fixed area priority first, then
    /// any remaining areas in catalog-stored order. The sort is stable, so
    /// stored order is preserved within an area.
    pub fn by_priority(&self) -> Vec<&CompiledEquation> {
        let mut ordered: Vec<&CompiledEquation> = self.equations.iter().collect();
        ordered.sort_by_key(|eq| eq.area.priority());
        ordered
    }
}
