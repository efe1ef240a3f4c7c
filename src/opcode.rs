//! The fixed opcode set this compiler ever emits (spec.md §6), plus a
//! minimal-push `Script` byte builder shared by the fragment emitter and
//! branch selector.

/// One of the opcodes spec.md §6 allows this compiler to emit. Nothing
/// outside this set is ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Op {
    If,
    NotIf,
    Else,
    EndIf,
    Zero,
    One,
    OneSub,
    Within,
    Dup,
    IfDup,
    Drop,
    Sha256,
    CheckSigVerify,
    CheckTemplateVerify,
    CheckLockTimeVerify,
    CheckSequenceVerify,
    Verify,
    EqualVerify,
}

impl Op {
    fn byte(self) -> u8 {
        match self {
            Op::If => 0x63,
            Op::NotIf => 0x64,
            Op::Else => 0x67,
            Op::EndIf => 0x68,
            Op::Zero => 0x00,
            Op::One => 0x51,
            Op::OneSub => 0x8c,
            Op::Within => 0xa5,
            Op::Dup => 0x76,
            Op::IfDup => 0x73,
            Op::Drop => 0x75,
            Op::Sha256 => 0xa8,
            Op::CheckSigVerify => 0xad,
            Op::CheckTemplateVerify => 0xb3,
            Op::CheckLockTimeVerify => 0xb1,
            Op::CheckSequenceVerify => 0xb2,
            Op::Verify => 0x69,
            Op::EqualVerify => 0x88,
        }
    }
}

/// A fragment of compiled Bitcoin Script: just bytes, but built up through
/// opcode/push helpers so every caller gets minimal-push encoding for free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn op(mut self, op: Op) -> Self {
        self.0.push(op.byte());
        self
    }

    /// Minimal data push: direct-length opcode for short data, `OP_PUSHDATA1`
    /// for data that does not fit the one-byte length prefix.
    pub fn push_bytes(mut self, data: &[u8]) -> Self {
        match data.len() {
            0 => self.0.push(0x00),
            len @ 1..=75 => {
                self.0.push(len as u8);
                self.0.extend_from_slice(data);
            }
            len @ 76..=255 => {
                self.0.push(0x4c); // OP_PUSHDATA1
                self.0.push(len as u8);
                self.0.extend_from_slice(data);
            }
            len => {
                self.0.push(0x4d); // OP_PUSHDATA2
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
                self.0.extend_from_slice(data);
            }
        }
        self
    }

    /// Minimal `CScriptNum`-style integer push: `OP_0`/`OP_1`..`OP_16` for
    /// the values Script has dedicated opcodes for, otherwise a minimal
    /// little-endian signed-magnitude push.
    pub fn push_int(self, n: i64) -> Self {
        if n == 0 {
            return self.op(Op::Zero);
        }
        if (1..=16).contains(&n) {
            let mut s = self;
            s.0.push(0x50 + n as u8);
            return s;
        }
        self.push_bytes(&script_num_bytes(n))
    }

    pub fn extend(mut self, other: Script) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl FromIterator<Script> for Script {
    fn from_iter<I: IntoIterator<Item = Script>>(iter: I) -> Self {
        iter.into_iter().fold(Script::new(), Script::extend)
    }
}

/// Minimal signed-magnitude little-endian encoding used by `CScriptNum`.
fn script_num_bytes(n: i64) -> Vec<u8> {
    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut bytes = Vec::new();
    while abs > 0 {
        bytes.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    if let Some(&last) = bytes.last() {
        if last & 0x80 != 0 {
            bytes.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *bytes.last_mut().unwrap() |= 0x80;
        }
    }
    bytes
}
