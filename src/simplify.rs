//! The simplifier: per-conjunct timelock merging, CTV deduplication, and
//! contradiction pruning (spec.md §4.3).

use crate::clause::{AbsoluteLock, Hash32, RelativeLock, TimeLock};
use crate::error::{CompileError, Result};
use crate::flatten::{Conjunct, Primitive};

/// The result of simplifying one conjunct: either a kept (possibly
/// shortened) conjunct, or a signal that the whole branch was pruned as
/// unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simplified {
    Kept(Conjunct),
    Pruned,
}

/// Groups `conjunct`'s primitives by type, merges timelocks, deduplicates
/// CTV hashes, and prunes (or, in strict mode, fails) on contradiction.
pub fn simplify(conjunct: Conjunct, prune_mode: bool) -> Result<Simplified> {
    let mut signed_by = Vec::new();
    let mut preimages = Vec::new();
    let mut ctv: Option<Hash32> = None;
    let mut rel_blocks: Option<u32> = None;
    let mut rel_time: Option<u32> = None;
    let mut abs_blocks: Option<u32> = None;
    let mut abs_time: Option<u32> = None;

    for primitive in conjunct {
        match primitive {
            Primitive::SignedBy(k) => signed_by.push(k),
            Primitive::RevealPreImage(h) => preimages.push(h),
            Primitive::CheckTemplateVerify(h) => match ctv {
                Some(existing) if existing != h => return Err(CompileError::MultipleCtv),
                _ => ctv = Some(h),
            },
            Primitive::Wait(TimeLock::Relative(lock)) if lock.is_time() => {
                rel_time = Some(rel_time.map_or(lock.value(), |v| v.max(lock.value())));
            }
            Primitive::Wait(TimeLock::Relative(lock)) => {
                rel_blocks = Some(rel_blocks.map_or(lock.value(), |v| v.max(lock.value())));
            }
            Primitive::Wait(TimeLock::Absolute(lock)) if lock.is_height() => {
                abs_blocks = Some(abs_blocks.map_or(lock.value(), |v| v.max(lock.value())));
            }
            Primitive::Wait(TimeLock::Absolute(lock)) => {
                abs_time = Some(abs_time.map_or(lock.value(), |v| v.max(lock.value())));
            }
        }
    }

    let relative_conflict = rel_blocks.is_some() && rel_time.is_some();
    let absolute_conflict = abs_blocks.is_some() && abs_time.is_some();
    if relative_conflict || absolute_conflict {
        if prune_mode {
            log::warn!("pruning conjunct: mixed relative/absolute timelock units in one branch");
            return Ok(Simplified::Pruned);
        }
        return Err(CompileError::IncompatibleTimelock);
    }

    let mut out = Vec::with_capacity(signed_by.len() + preimages.len() + 3);
    out.extend(signed_by.into_iter().map(Primitive::SignedBy));
    out.extend(preimages.into_iter().map(Primitive::RevealPreImage));
    if let Some(hash) = ctv {
        out.push(Primitive::CheckTemplateVerify(hash));
    }
    if let Some(value) = rel_blocks.or(rel_time) {
        out.push(Primitive::Wait(TimeLock::Relative(RelativeLock::from_raw(
            value,
        ))));
    }
    if let Some(value) = abs_blocks.or(abs_time) {
        out.push(Primitive::Wait(TimeLock::Absolute(AbsoluteLock::from_raw(
            value,
        ))));
    }
    Ok(Simplified::Kept(out))
}
