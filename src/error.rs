//! Ambient error type for the compiler pipeline.

/// Everything that can go wrong turning a [`crate::clause::Clause`] into a
/// compiled program. See spec.md §7 for the policy governing which of these
/// are recoverable (by branch pruning) versus fatal to the whole compile.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The DNF was empty, or every branch was pruned as unsatisfiable —
    /// the clause has no spending condition at all.
    #[error("clause has no satisfiable spending condition")]
    NoSpendingCondition,

    /// The flattener encountered an `Or` where only `And` was expected;
    /// normalization did not run to completion before flattening.
    #[error("normalization invariant violated: Or found beneath And")]
    NormalizationInvariant,

    /// Two distinct CheckTemplateVerify hashes were bound into one branch.
    #[error("branch commits to two distinct CheckTemplateVerify hashes")]
    MultipleCtv,

    /// A conjunct mixed relative-block/relative-time or
    /// absolute-block/absolute-time timelocks (strict mode only; default
    /// mode prunes the branch instead, see [`crate::compiler::CompileConfig`]).
    #[error("incompatible timelock types in one branch")]
    IncompatibleTimelock,

    /// A witness template was mutated after `finalize()`, or after its
    /// standard template hash had already been computed.
    #[error("template mutated after finalization")]
    TemplateFinalized,

    /// `make_witness` was called twice with the same branch key.
    #[error("witness slot already registered for this branch")]
    WitnessSlotConflict,

    /// A timelock or height value did not fit the field it was encoded
    /// into (spec.md §6: 16-bit relative counts, the 500,000,000 absolute
    /// height/time boundary).
    #[error("value out of range for its encoding")]
    OutOfRangeValue,

    /// An override address's HRP doesn't match the requested network.
    #[error("override address network does not match the requested network")]
    NetworkMismatch,
}

pub type Result<T> = std::result::Result<T, CompileError>;
