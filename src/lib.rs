//! Compiles spending-condition trees (boolean combinations of signature
//! checks, hash-preimage reveals, timelocks, and CheckTemplateVerify
//! commitments) into Bitcoin Script programs, per-branch witness
//! templates, and P2WSH addresses.

pub mod clause;
pub mod compiler;
pub mod ctv;
pub mod error;
pub mod flatten;
pub mod fragment;
pub mod normalize;
pub mod opcode;
pub mod simplify;
pub mod util;
pub mod witness;

pub use clause::{AbsoluteLock, Clause, Hash32, PubKey, RelativeLock, TimeLock};
pub use compiler::{CompileConfig, compile, compile_with_config};
pub use ctv::TransactionTemplate;
pub use error::{CompileError, Result};
pub use flatten::{Conjunct, Dnf, Primitive};
pub use witness::{WitnessManager, WitnessSlot, WitnessStackItem, WitnessTemplate};
