//! CheckTemplateVerify hash: the exact byte layout of the standard
//! template hash committed to by a guaranteed branch (spec.md §4.7).

use std::cell::RefCell;

use crate::clause::Hash32;
use crate::error::{CompileError, Result};
use crate::util::sha256_32;

/// The canonical subset of transaction fields a CTV commitment covers.
/// Transaction serialization itself is out of scope (spec.md §1) — only
/// the fields the standard template hash reads are modeled.
#[derive(Debug, Clone)]
pub struct TransactionTemplate {
    version: u32,
    lock_time: u32,
    sequences: Vec<u32>,
    outputs: Vec<(u64, Vec<u8>)>,
    input_index: u32,
    finalized: bool,
    cached_hash: RefCell<Option<Hash32>>,
}

impl Default for TransactionTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionTemplate {
    pub fn new() -> Self {
        Self {
            version: 2,
            lock_time: 0,
            sequences: vec![0],
            outputs: Vec::new(),
            input_index: 0,
            finalized: false,
            cached_hash: RefCell::new(None),
        }
    }

    pub fn with_input_index(mut self, index: u32) -> Self {
        self.input_index = index;
        self
    }

    pub fn set_version(&mut self, version: u32) -> Result<()> {
        self.guard_mutable()?;
        self.version = version;
        Ok(())
    }

    pub fn set_lock_time(&mut self, lock_time: u32) -> Result<()> {
        self.guard_mutable()?;
        self.lock_time = lock_time;
        Ok(())
    }

    pub fn set_sequence(&mut self, idx: usize, sequence: u32) -> Result<()> {
        self.guard_mutable()?;
        if idx >= self.sequences.len() {
            self.sequences.resize(idx + 1, 0);
        }
        self.sequences[idx] = sequence;
        Ok(())
    }

    pub fn add_output(&mut self, amount: u64, script: Vec<u8>) -> Result<()> {
        self.guard_mutable()?;
        self.outputs.push((amount, script));
        Ok(())
    }

    pub fn total_amount(&self) -> u64 {
        self.outputs.iter().map(|(amount, _)| amount).sum()
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    fn guard_mutable(&self) -> Result<()> {
        if self.finalized {
            return Err(CompileError::TemplateFinalized);
        }
        Ok(())
    }

    /// The standard template hash, cached after first computation. Fails
    /// if the template has not been finalized yet.
    pub fn get_ctv_hash(&self) -> Result<Hash32> {
        if !self.finalized {
            return Err(CompileError::TemplateFinalized);
        }
        if let Some(cached) = *self.cached_hash.borrow() {
            return Ok(cached);
        }
        let hash = Hash32(self.compute_standard_template_hash());
        *self.cached_hash.borrow_mut() = Some(hash);
        Ok(hash)
    }

    fn compute_standard_template_hash(&self) -> [u8; 32] {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&(self.sequences.len() as u32).to_le_bytes());

        let mut sequences_buf = Vec::new();
        for sequence in &self.sequences {
            sequences_buf.extend_from_slice(&sequence.to_le_bytes());
        }
        buf.extend_from_slice(&sha256_32(&sequences_buf));

        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        let mut outputs_buf = Vec::new();
        for (amount, script) in &self.outputs {
            outputs_buf.extend_from_slice(&amount.to_le_bytes());
            outputs_buf.extend_from_slice(&compact_size(script.len() as u64));
            outputs_buf.extend_from_slice(script);
        }
        buf.extend_from_slice(&sha256_32(&outputs_buf));

        buf.extend_from_slice(&self.input_index.to_le_bytes());

        sha256_32(&buf)
    }
}

/// Bitcoin `CompactSize` varint encoding.
fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut v = vec![0xfd];
            v.extend_from_slice(&(n as u16).to_le_bytes());
            v
        }
        0x10000..=0xffff_ffff => {
            let mut v = vec![0xfe];
            v.extend_from_slice(&(n as u32).to_le_bytes());
            v
        }
        _ => {
            let mut v = vec![0xff];
            v.extend_from_slice(&n.to_le_bytes());
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_after_finalize_fails() {
        let mut t = TransactionTemplate::new();
        t.finalize();
        assert_eq!(
            t.set_lock_time(5).unwrap_err(),
            CompileError::TemplateFinalized
        );
        assert_eq!(
            t.add_output(1, vec![]).unwrap_err(),
            CompileError::TemplateFinalized
        );
    }

    #[test]
    fn hash_requires_finalization() {
        let t = TransactionTemplate::new();
        assert_eq!(
            t.get_ctv_hash().unwrap_err(),
            CompileError::TemplateFinalized
        );
    }

    #[test]
    fn hash_is_cached_and_stable() {
        let mut t = TransactionTemplate::new();
        t.add_output(1000, vec![0xAA; 10]).unwrap();
        t.finalize();
        let a = t.get_ctv_hash().unwrap();
        let b = t.get_ctv_hash().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn changing_a_covered_field_changes_the_hash() {
        let mut t1 = TransactionTemplate::new();
        t1.add_output(1000, vec![0xAA; 10]).unwrap();
        t1.finalize();

        let mut t2 = TransactionTemplate::new();
        t2.add_output(2000, vec![0xAA; 10]).unwrap();
        t2.finalize();

        assert_ne!(t1.get_ctv_hash().unwrap(), t2.get_ctv_hash().unwrap());
    }

    #[test]
    fn compact_size_round_trips_boundaries() {
        assert_eq!(compact_size(0xfc), vec![0xfc]);
        assert_eq!(compact_size(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
    }
}
