//! The flattener: turns a normalized `Clause` into its DNF — a list of
//! conjuncts, each a list of primitives (spec.md §4.2).

use crate::clause::{Clause, Hash32, PubKey, TimeLock};
use crate::error::{CompileError, Result};

/// A leaf spending condition, as it survives into the DNF. `Threshold` is
/// gone by this point (expanded by [`crate::clause::Clause::expand_thresholds`]
/// before normalization) and `Satisfied`/`Unsatisfiable` are gone too
/// (collapsed by the smart constructors or folded into an empty/absent
/// conjunct).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    SignedBy(PubKey),
    RevealPreImage(Hash32),
    CheckTemplateVerify(Hash32),
    Wait(TimeLock),
}

/// One OR-branch: every primitive in it must hold.
pub type Conjunct = Vec<Primitive>;

/// Outer list is OR, inner list is AND — spec.md §3.
pub type Dnf = Vec<Conjunct>;

/// `flatten(c, or_allowed)`. `or_allowed` is true only at the root call;
/// every recursive call made from inside an `And` passes `false`, which is
/// the asymmetry that actually defines "this tree is in DNF" (spec.md
/// §4.2).
pub fn flatten(clause: Clause, or_allowed: bool) -> Result<Dnf> {
    match clause {
        Clause::Satisfied => Ok(vec![Vec::new()]),
        Clause::Unsatisfiable => Ok(Vec::new()),
        Clause::Or(left, right) => {
            if !or_allowed {
                return Err(CompileError::NormalizationInvariant);
            }
            let mut dnf = flatten(*left, true)?;
            dnf.extend(flatten(*right, true)?);
            Ok(dnf)
        }
        Clause::And(left, right) => {
            let left_dnf = flatten(*left, false)?;
            let right_dnf = flatten(*right, false)?;
            if left_dnf.len() != 1 || right_dnf.len() != 1 {
                return Err(CompileError::NormalizationInvariant);
            }
            let mut conjunct = left_dnf.into_iter().next().unwrap();
            conjunct.extend(right_dnf.into_iter().next().unwrap());
            Ok(vec![conjunct])
        }
        Clause::Threshold(..) => Err(CompileError::NormalizationInvariant),
        Clause::SignedBy(k) => Ok(vec![vec![Primitive::SignedBy(k)]]),
        Clause::RevealPreImage(h) => Ok(vec![vec![Primitive::RevealPreImage(h)]]),
        Clause::CheckTemplateVerify(h) => Ok(vec![vec![Primitive::CheckTemplateVerify(h)]]),
        Clause::Wait(t) => Ok(vec![vec![Primitive::Wait(t)]]),
    }
}
