//! The fragment emitter: one stack-clean Script snippet per primitive,
//! plus the witness-slot registration that goes with it (spec.md §4.4).

use crate::clause::TimeLock;
use crate::error::Result;
use crate::flatten::{Conjunct, Primitive};
use crate::opcode::{Op, Script};
use crate::witness::{WitnessSlot, WitnessTemplate};

/// Emits the fragment for one primitive and registers whatever witness
/// contribution it needs against `witness`.
pub fn emit_primitive(primitive: &Primitive, witness: &mut WitnessTemplate) -> Result<Script> {
    match primitive {
        Primitive::SignedBy(key) => {
            witness.add(WitnessSlot::Signature(*key));
            Ok(Script::new().push_bytes(&key.0).op(Op::CheckSigVerify))
        }
        Primitive::RevealPreImage(hash) => {
            witness.add(WitnessSlot::PreImage(*hash));
            Ok(Script::new()
                .op(Op::Sha256)
                .push_bytes(&hash.0)
                .op(Op::EqualVerify))
        }
        Primitive::CheckTemplateVerify(hash) => {
            witness.will_execute_ctv(*hash)?;
            Ok(Script::new()
                .push_bytes(&hash.0)
                .op(Op::CheckTemplateVerify)
                .op(Op::Drop))
        }
        Primitive::Wait(TimeLock::Absolute(lock)) => Ok(Script::new()
            .push_int(lock.value() as i64)
            .op(Op::CheckLockTimeVerify)
            .op(Op::Drop)),
        Primitive::Wait(TimeLock::Relative(lock)) => Ok(Script::new()
            .push_int(lock.value() as i64)
            .op(Op::CheckSequenceVerify)
            .op(Op::Drop)),
    }
}

/// Emits every primitive in `conjunct` in order and concatenates the
/// result — stack-clean by construction, since each fragment is.
pub fn emit_conjunct(conjunct: &Conjunct, witness: &mut WitnessTemplate) -> Result<Script> {
    let mut script = Script::new();
    for primitive in conjunct {
        script = script.extend(emit_primitive(primitive, witness)?);
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{AbsoluteLock, Hash32, PubKey, RelativeLock};

    #[test]
    fn signed_by_pushes_key_and_registers_signature_slot() {
        let mut witness = WitnessTemplate::default();
        let key = PubKey([2; 33]);
        let script = emit_primitive(&Primitive::SignedBy(key), &mut witness).unwrap();
        let bytes = script.into_bytes();
        assert_eq!(bytes[0], 33);
        assert_eq!(&bytes[1..34], &key.0[..]);
        assert_eq!(bytes[34], 0xad); // OP_CHECKSIGVERIFY
        assert_eq!(witness.slots(), &[WitnessSlot::Signature(key)]);
    }

    #[test]
    fn reveal_preimage_registers_preimage_slot() {
        let mut witness = WitnessTemplate::default();
        let hash = Hash32([9; 32]);
        emit_primitive(&Primitive::RevealPreImage(hash), &mut witness).unwrap();
        assert_eq!(witness.slots(), &[WitnessSlot::PreImage(hash)]);
    }

    #[test]
    fn ctv_registers_no_slot_but_binds_the_hash() {
        let mut witness = WitnessTemplate::default();
        let hash = Hash32([3; 32]);
        emit_primitive(&Primitive::CheckTemplateVerify(hash), &mut witness).unwrap();
        assert!(witness.slots().is_empty());
        assert_eq!(witness.ctv_hash(), Some(hash));
    }

    #[test]
    fn conjunct_for_scenario_s1_matches_expected_program() {
        let key = PubKey([2; 33]);
        let mut witness = WitnessTemplate::default();
        let conjunct = vec![Primitive::SignedBy(key)];
        let script = emit_conjunct(&conjunct, &mut witness).unwrap();
        let mut expected = vec![33u8];
        expected.extend_from_slice(&key.0);
        expected.push(0xad);
        assert_eq!(script.into_bytes(), expected);
    }

    #[test]
    fn absolute_wait_emits_cltv_and_drop() {
        let mut witness = WitnessTemplate::default();
        let lock = AbsoluteLock::at_height(100).unwrap();
        let script = emit_primitive(&Primitive::Wait(TimeLock::Absolute(lock)), &mut witness)
            .unwrap()
            .into_bytes();
        assert_eq!(script.last(), Some(&0x75)); // OP_DROP
        assert!(script.contains(&0xb1)); // OP_CHECKLOCKTIMEVERIFY
    }

    #[test]
    fn relative_wait_emits_csv_and_drop() {
        let mut witness = WitnessTemplate::default();
        let lock = RelativeLock::blocks(5);
        let script = emit_primitive(&Primitive::Wait(TimeLock::Relative(lock)), &mut witness)
            .unwrap()
            .into_bytes();
        assert_eq!(script.last(), Some(&0x75));
        assert!(script.contains(&0xb2)); // OP_CHECKSEQUENCEVERIFY
    }
}
