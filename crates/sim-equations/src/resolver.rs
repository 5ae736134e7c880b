//! Single-pass equation resolution in fixed area-priority order.
//!
//! Each equation moves through {unattempted → attempted → solved | parked}
//! within the pass. An equation parks when a dependent is still unknown;
//! there is no retry queue — the fixed priority ordering is the sole
//! resolution strategy, and parked outputs are reported explicitly so the
//! caller can distinguish "fallback used" from "never fired".

use std::collections::BTreeMap;

use sim_core::{VarCode, VarValue, VariableMap};
use tracing::debug;

use crate::catalog::EquationCatalog;

/// Terminal state of one equation after a resolution pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquationStatus {
    /// Output computed and recorded.
    Solved,
    /// A dependent was unknown, or evaluation degenerated; skipped.
    Parked,
}

/// Outcome of one resolution pass.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Newly computed outputs (the initial variables are not repeated).
    pub solved: BTreeMap<VarCode, f64>,
    /// Outputs whose equations parked and are still missing.
    pub unresolved: Vec<VarCode>,
    /// Per-equation terminal status, in resolution order.
    pub statuses: Vec<(VarCode, EquationStatus)>,
}

/// Resolve as many unknown outputs as one pass allows.
///
/// Later equations see earlier outputs (combined initial + already-resolved
/// state). Outputs already present in `variables` are not recomputed.
pub fn resolve(catalog: &EquationCatalog, variables: &VariableMap) -> Resolution {
    let mut resolution = Resolution::default();
    for eq in catalog.by_priority() {
        if variables.contains_key(&eq.output) {
            debug!(output = %eq.output, "output already known, skipping");
            continue;
        }
        let result = eq.expr.eval(&|code: &VarCode| {
            resolution
                .solved
                .get(code)
                .map(|v| VarValue::Scalar(*v))
                .or_else(|| variables.get(code).cloned())
        });
        match result {
            Some(value) if value.is_finite() => {
                resolution.solved.insert(eq.output.clone(), value);
                resolution
                    .statuses
                    .push((eq.output.clone(), EquationStatus::Solved));
            }
            _ => {
                debug!(output = %eq.output, area = eq.area.as_str(), "equation parked");
                resolution.unresolved.push(eq.output.clone());
                resolution
                    .statuses
                    .push((eq.output.clone(), EquationStatus::Parked));
            }
        }
    }
    resolution
}
