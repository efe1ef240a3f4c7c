//! The clause algebra: primitive spending conditions plus `And`/`Or`
//! combinators whose smart constructors enforce the identity/absorption
//! laws of spec.md §3 constructively.

use std::ops::{BitAnd, BitOr};

use chrono::{DateTime, Utc};

use crate::error::{CompileError, Result};

/// Block height / Unix-time boundary shared by absolute locktimes (spec.md
/// §6): values below this are block heights, values at or above it are
/// Unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Bit 22 of a relative-lock sequence value selects the 512-second-tick
/// unit instead of a block count (spec.md §6).
const RELATIVE_TIME_FLAG: u32 = 1 << 22;

/// A 33-byte compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PubKey(pub [u8; 33]);

impl std::fmt::Debug for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PubKey({})", hex::encode(self.0))
    }
}

/// A 32-byte SHA-256 digest, used both for preimage commitments and CTV
/// template hashes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash32(pub [u8; 32]);

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", hex::encode(self.0))
    }
}

/// An absolute timelock: either a block height or a Unix timestamp,
/// distinguished by [`LOCKTIME_THRESHOLD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbsoluteLock(u32);

impl AbsoluteLock {
    /// A locktime expressed as a block height. Errors if `height` would be
    /// interpreted as a Unix timestamp instead (spec.md §6).
    pub fn at_height(height: u32) -> Result<Self> {
        if height >= LOCKTIME_THRESHOLD {
            return Err(CompileError::OutOfRangeValue);
        }
        Ok(Self(height))
    }

    /// A locktime expressed as a Unix timestamp in seconds.
    pub fn at_time(unix_seconds: u32) -> Result<Self> {
        if unix_seconds < LOCKTIME_THRESHOLD {
            return Err(CompileError::OutOfRangeValue);
        }
        Ok(Self(unix_seconds))
    }

    /// A locktime at a given UTC date, restoring
    /// `AbsoluteTimeSpec.from_date` from the original implementation.
    pub fn from_datetime(date: DateTime<Utc>) -> Result<Self> {
        let secs = date.timestamp();
        let secs: u32 = secs.try_into().map_err(|_| CompileError::OutOfRangeValue)?;
        Self::at_time(secs)
    }

    pub fn is_height(&self) -> bool {
        self.0 < LOCKTIME_THRESHOLD
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Reconstructs a lock from an already-validated raw value, used by the
    /// simplifier when merging two locks of the same kind.
    pub(crate) fn from_raw(value: u32) -> Self {
        Self(value)
    }
}

/// A relative timelock: either a block count or a count of 512-second
/// ticks, tagged by [`RELATIVE_TIME_FLAG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativeLock(u32);

impl RelativeLock {
    /// A relative lock of `n` blocks.
    pub fn blocks(n: u16) -> Self {
        Self(n as u32)
    }

    /// A relative lock spanning at least `seconds`, rounded up to the
    /// nearest 512-second tick.
    pub fn from_seconds(seconds: u32) -> Result<Self> {
        let ticks = (seconds as u64).div_ceil(512);
        let ticks: u32 = ticks
            .try_into()
            .map_err(|_| CompileError::OutOfRangeValue)?;
        if ticks > 0xFFFF {
            return Err(CompileError::OutOfRangeValue);
        }
        Ok(Self(RELATIVE_TIME_FLAG | ticks))
    }

    /// `Weeks(n)` from the original implementation.
    pub fn weeks(n: f64) -> Result<Self> {
        Self::from_seconds((n * 7.0 * 24.0 * 60.0 * 60.0) as u32)
    }

    /// `Days(n)` from the original implementation.
    pub fn days(n: f64) -> Result<Self> {
        Self::from_seconds((n * 24.0 * 60.0 * 60.0) as u32)
    }

    pub fn is_time(&self) -> bool {
        self.0 & RELATIVE_TIME_FLAG != 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Reconstructs a lock from an already-validated raw value, used by the
    /// simplifier when merging two locks of the same kind.
    pub(crate) fn from_raw(value: u32) -> Self {
        Self(value)
    }
}

/// Either flavor of timelock a `Wait` clause can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLock {
    Absolute(AbsoluteLock),
    Relative(RelativeLock),
}

impl From<AbsoluteLock> for TimeLock {
    fn from(v: AbsoluteLock) -> Self {
        TimeLock::Absolute(v)
    }
}

impl From<RelativeLock> for TimeLock {
    fn from(v: RelativeLock) -> Self {
        TimeLock::Relative(v)
    }
}

/// A node in the spending-condition tree (spec.md §3). Constructed only
/// through [`Clause::and`]/[`Clause::or`] (or the `&`/`|` operators), which
/// collapse `Satisfied`/`Unsatisfiable` immediately, so a well-formed tree
/// never holds an identity as a direct `And`/`Or` child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Identity for `And`, absorbing element for `Or`.
    Satisfied,
    /// Identity for `Or`, absorbing element for `And`.
    Unsatisfiable,
    SignedBy(PubKey),
    RevealPreImage(Hash32),
    CheckTemplateVerify(Hash32),
    Wait(TimeLock),
    /// At least `k` of the listed sub-clauses must be satisfied.
    Threshold(u32, Vec<Clause>),
    And(Box<Clause>, Box<Clause>),
    Or(Box<Clause>, Box<Clause>),
}

impl Clause {
    /// `x ∧ Satisfied = x`, `x ∧ Unsatisfiable = Unsatisfiable`.
    pub fn and(self, other: Clause) -> Clause {
        match (self, other) {
            (Clause::Satisfied, x) | (x, Clause::Satisfied) => x,
            (Clause::Unsatisfiable, _) | (_, Clause::Unsatisfiable) => Clause::Unsatisfiable,
            (a, b) => Clause::And(Box::new(a), Box::new(b)),
        }
    }

    /// `x ∨ Unsatisfiable = x`, `x ∨ Satisfied = Satisfied`.
    pub fn or(self, other: Clause) -> Clause {
        match (self, other) {
            (Clause::Unsatisfiable, x) | (x, Clause::Unsatisfiable) => x,
            (Clause::Satisfied, _) | (_, Clause::Satisfied) => Clause::Satisfied,
            (a, b) => Clause::Or(Box::new(a), Box::new(b)),
        }
    }

    /// `Threshold(k, n)` requires `1 <= k <= n`.
    pub fn threshold(k: u32, clauses: Vec<Clause>) -> Result<Clause> {
        if k == 0 || (k as usize) > clauses.len() {
            return Err(CompileError::OutOfRangeValue);
        }
        Ok(Clause::Threshold(k, clauses))
    }
}

impl Clause {
    /// Lowers every `Threshold(k, cs)` node into the equivalent disjunction
    /// of `C(n, k)` conjunctions (spec.md §4.4, §9 "Threshold lowering").
    /// Runs once, before normalization, so the normalizer and flattener
    /// never need to know `Threshold` exists.
    pub fn expand_thresholds(self) -> Clause {
        match self {
            Clause::Threshold(k, clauses) => {
                let clauses: Vec<Clause> =
                    clauses.into_iter().map(Clause::expand_thresholds).collect();
                k_combinations(&clauses, k as usize)
                    .into_iter()
                    .map(|combo| {
                        combo
                            .into_iter()
                            .fold(Clause::Satisfied, |acc, c| acc.and(c))
                    })
                    .fold(Clause::Unsatisfiable, |acc, conjunct| acc.or(conjunct))
            }
            Clause::And(left, right) => left.expand_thresholds().and(right.expand_thresholds()),
            Clause::Or(left, right) => left.expand_thresholds().or(right.expand_thresholds()),
            other => other,
        }
    }
}

/// Every `k`-element subset of `items`, order of selection preserved.
fn k_combinations(items: &[Clause], k: usize) -> Vec<Vec<Clause>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if items.len() < k {
        return Vec::new();
    }
    let mut result = Vec::new();
    let (first, rest) = items.split_first().expect("checked items.len() >= k >= 1");
    for mut combo in k_combinations(rest, k - 1) {
        combo.insert(0, first.clone());
        result.push(combo);
    }
    result.extend(k_combinations(rest, k));
    result
}

impl BitAnd for Clause {
    type Output = Clause;
    fn bitand(self, rhs: Clause) -> Clause {
        self.and(rhs)
    }
}

impl BitOr for Clause {
    type Output = Clause;
    fn bitor(self, rhs: Clause) -> Clause {
        self.or(rhs)
    }
}
