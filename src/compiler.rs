//! The branch selector and top-level `compile` entry point (spec.md §4.5,
//! §6).

use crate::clause::Clause;
use crate::error::{CompileError, Result};
use crate::flatten::{Conjunct, flatten};
use crate::fragment::emit_conjunct;
use crate::normalize::normalize_fully;
use crate::opcode::{Op, Script};
use crate::simplify::{Simplified, simplify};
use crate::witness::WitnessManager;

/// Explicit stand-in for the original implementation's module-level
/// `PRUNE_MODE` flag (spec.md §9): threaded through the compile entry
/// point instead of living as global mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileConfig {
    /// When true (the default), a conjunct with a timelock contradiction is
    /// dropped from the DNF instead of failing the whole compile.
    pub prune_mode: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self { prune_mode: true }
    }
}

/// Compiles `clause` with the default (pruning) configuration.
pub fn compile(clause: Clause) -> Result<WitnessManager> {
    compile_with_config(clause, CompileConfig::default())
}

/// Compiles `clause` into a finalized [`WitnessManager`]: expands
/// thresholds, normalizes to DNF, simplifies each branch, then emits the
/// program and one witness template per surviving branch.
pub fn compile_with_config(clause: Clause, config: CompileConfig) -> Result<WitnessManager> {
    let expanded = clause.expand_thresholds();
    let normalized = normalize_fully(expanded)?;
    let dnf = flatten(normalized, true)?;

    let mut branches: Vec<Conjunct> = Vec::with_capacity(dnf.len());
    for conjunct in dnf {
        match simplify(conjunct, config.prune_mode)? {
            Simplified::Kept(conjunct) => branches.push(conjunct),
            Simplified::Pruned => continue,
        }
    }
    if branches.is_empty() {
        return Err(CompileError::NoSpendingCondition);
    }

    let mut manager = WitnessManager::new();
    let program = build_dispatcher(&branches, &mut manager)?;
    manager.set_program(program)?;
    manager.finalize();
    Ok(manager)
}

/// The N=1 / N=2 / N≥3 branch-selector regimes of spec.md §4.5.
fn build_dispatcher(branches: &[Conjunct], manager: &mut WitnessManager) -> Result<Script> {
    match branches.len() {
        1 => {
            let template = manager.make_witness(0)?;
            let fragment = emit_conjunct(&branches[0], template)?;
            Ok(fragment.op(Op::One))
        }
        2 => build_two_branch_dispatcher(branches, manager),
        n => build_jump_table_dispatcher(n, branches, manager),
    }
}

fn build_two_branch_dispatcher(
    branches: &[Conjunct],
    manager: &mut WitnessManager,
) -> Result<Script> {
    let mut script = Script::new().op(Op::If);
    {
        let template0 = manager.make_witness(0)?;
        template0.add_int(1);
        script = script.extend(emit_conjunct(&branches[0], template0)?);
    }
    script = script.op(Op::Else);
    {
        let template1 = manager.make_witness(1)?;
        template1.add_int(0);
        script = script.extend(emit_conjunct(&branches[1], template1)?);
    }
    Ok(script.op(Op::EndIf).op(Op::One))
}

fn build_jump_table_dispatcher(
    n: usize,
    branches: &[Conjunct],
    manager: &mut WitnessManager,
) -> Result<Script> {
    let mut script = Script::new()
        .op(Op::Dup)
        .op(Op::Zero)
        .push_int(n as i64)
        .op(Op::Within)
        .op(Op::Verify);

    for (i, conjunct) in branches.iter().enumerate() {
        let last = i == n - 1;
        let template = manager.make_witness(i as u32)?;
        template.add_int(i as u32);
        let fragment = emit_conjunct(conjunct, template)?;

        if !last {
            script = script.op(Op::IfDup);
        }
        script = script.op(Op::NotIf).extend(fragment).op(Op::EndIf);
        if !last {
            script = script.op(Op::Zero).op(Op::OneSub);
        }
    }
    Ok(script.op(Op::One))
}
