//! The witness-template manager: per-branch witness stacks, the
//! single-CTV-per-branch invariant, and the final program/address
//! (spec.md §4.6).

use std::collections::BTreeMap;

use bech32::{hrp, segwit};

use crate::clause::{Hash32, PubKey};
use crate::error::{CompileError, Result};
use crate::opcode::{Op, Script};
use crate::util::sha256_32;

/// A stack-position placeholder a spender must fill in to satisfy a
/// branch (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessSlot {
    /// A signature over the spending transaction by this key.
    Signature(PubKey),
    /// The preimage of this hash.
    PreImage(Hash32),
    /// A concrete data push known at compile time (e.g. a branch selector).
    Data(Vec<u8>),
    /// The CTV-committed template hash this branch executes against.
    Ctv(Hash32),
}

/// One item of a fully assembled witness stack: either a slot still
/// waiting on a spend-time value, or the compiled program itself (the
/// final witness element of a P2WSH spend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessStackItem {
    Slot(WitnessSlot),
    Program(Vec<u8>),
}

/// The per-branch witness template: an ordered list of slots plus at most
/// one bound CTV hash.
#[derive(Debug, Clone, Default)]
pub struct WitnessTemplate {
    slots: Vec<WitnessSlot>,
    ctv_hash: Option<Hash32>,
}

impl WitnessTemplate {
    /// Appends `slot` at stack position 0 — new additions go to the
    /// bottom of the stack, matching the last-in-first-consumed order of
    /// Script (spec.md §3).
    pub fn add(&mut self, slot: WitnessSlot) {
        self.slots.insert(0, slot);
    }

    /// Convenience for integer-literal slots (e.g. a branch selector),
    /// wrapped as a minimal data push per spec.md §4.6.
    pub fn add_int(&mut self, n: u32) {
        self.add(WitnessSlot::Data(minimal_uint_bytes(n)));
    }

    /// Binds this branch's CTV hash. Fails if a *different* hash is
    /// already bound (spec.md §4.6, §8 invariant 5).
    pub fn will_execute_ctv(&mut self, hash: Hash32) -> Result<()> {
        match self.ctv_hash {
            Some(existing) if existing != hash => Err(CompileError::MultipleCtv),
            _ => {
                self.ctv_hash = Some(hash);
                Ok(())
            }
        }
    }

    pub fn slots(&self) -> &[WitnessSlot] {
        &self.slots
    }

    pub fn ctv_hash(&self) -> Option<Hash32> {
        self.ctv_hash
    }
}

/// Minimal little-endian encoding of a small non-negative integer as a
/// witness-stack data item (an empty vector represents zero, matching
/// Script's `OP_0`).
fn minimal_uint_bytes(n: u32) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let mut bytes = Vec::new();
    let mut v = n;
    while v > 0 {
        bytes.push((v & 0xff) as u8);
        v >>= 8;
    }
    if bytes.last().copied().unwrap_or(0) & 0x80 != 0 {
        bytes.push(0x00);
    }
    bytes
}

/// Owns the compiled program and one [`WitnessTemplate`] per DNF branch.
/// Lifecycle: *building* (templates may be created/mutated) → *final*
/// (read-only, addresses and witnesses may be read) — spec.md §4.6.
#[derive(Debug, Clone)]
pub struct WitnessManager {
    program: Script,
    witnesses: BTreeMap<u32, WitnessTemplate>,
    is_final: bool,
    override_address: Option<String>,
}

impl Default for WitnessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WitnessManager {
    pub fn new() -> Self {
        Self {
            program: Script::new(),
            witnesses: BTreeMap::new(),
            is_final: false,
            override_address: None,
        }
    }

    /// Registers a new branch. Fails if already finalized or if `key` is
    /// already in use (spec.md §4.6, §7 `WitnessSlotConflict`).
    pub fn make_witness(&mut self, key: u32) -> Result<&mut WitnessTemplate> {
        if self.is_final {
            return Err(CompileError::TemplateFinalized);
        }
        if self.witnesses.contains_key(&key) {
            return Err(CompileError::WitnessSlotConflict);
        }
        self.witnesses.insert(key, WitnessTemplate::default());
        Ok(self.witnesses.get_mut(&key).unwrap())
    }

    pub fn append_program(&mut self, fragment: Script) -> Result<()> {
        if self.is_final {
            return Err(CompileError::TemplateFinalized);
        }
        self.program = std::mem::take(&mut self.program).extend(fragment);
        Ok(())
    }

    pub fn set_program(&mut self, program: Script) -> Result<()> {
        if self.is_final {
            return Err(CompileError::TemplateFinalized);
        }
        self.program = program;
        Ok(())
    }

    /// Inlines an externally-supplied segwit address in place of this
    /// manager's own program hash (spec.md §4.6).
    pub fn set_override_address(&mut self, address: impl Into<String>) {
        self.override_address = Some(address.into());
    }

    /// Idempotent latch: transitions to final.
    pub fn finalize(&mut self) {
        self.is_final = true;
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn program(&self) -> &Script {
        &self.program
    }

    pub fn witnesses(&self) -> &BTreeMap<u32, WitnessTemplate> {
        &self.witnesses
    }

    /// The branch's witness stack followed by the program, as the final
    /// "script" element a P2WSH spend pushes.
    pub fn get_witness(&self, key: u32) -> Result<Vec<WitnessStackItem>> {
        if !self.is_final {
            return Err(CompileError::TemplateFinalized);
        }
        let template = self
            .witnesses
            .get(&key)
            .ok_or(CompileError::WitnessSlotConflict)?;
        let mut items: Vec<WitnessStackItem> = template
            .slots()
            .iter()
            .cloned()
            .map(WitnessStackItem::Slot)
            .collect();
        items.push(WitnessStackItem::Program(self.program.as_bytes().to_vec()));
        Ok(items)
    }

    /// `OP_0 PUSH(SHA256(program))`, the standard segwit-v0 P2WSH
    /// `scriptPubKey`; or the decoded override address if one is set.
    pub fn get_p2wsh_script(&self, mainnet: bool) -> Result<Vec<u8>> {
        if let Some(address) = &self.override_address {
            let (address_hrp, version, program) =
                segwit::decode(address).map_err(|_| CompileError::OutOfRangeValue)?;
            let expected_hrp = if mainnet { hrp::BC } else { hrp::BCRT };
            if address_hrp != expected_hrp {
                return Err(CompileError::NetworkMismatch);
            }
            return Ok(Script::new()
                .push_int(version.to_u8() as i64)
                .push_bytes(&program)
                .into_bytes());
        }
        let hash = sha256_32(self.program.as_bytes());
        Ok(Script::new().op(Op::Zero).push_bytes(&hash).into_bytes())
    }

    /// Bech32-encodes the witness program, HRP `bc` for mainnet or `bcrt`
    /// for regtest.
    pub fn get_p2wsh_address(&self, mainnet: bool) -> Result<String> {
        if let Some(address) = &self.override_address {
            return Ok(address.clone());
        }
        let hash = sha256_32(self.program.as_bytes());
        let hrp = if mainnet { hrp::BC } else { hrp::BCRT };
        segwit::encode_v0(hrp, &hash).map_err(|_| CompileError::OutOfRangeValue)
    }
}
