//! Small shared helpers, in the spirit of the teacher's own `utils.rs`.

/// SHA-256 of `data`, as raw bytes. The `sha256` crate only hands back hex
/// strings, so we round-trip through `hex` to get the 32 bytes this
/// compiler actually needs (script-hash commitments, CTV hashing).
pub fn sha256_32(data: &[u8]) -> [u8; 32] {
    let hex_digest = sha256::digest(data);
    let bytes = hex::decode(hex_digest).expect("sha256 crate always returns valid hex");
    bytes.try_into().expect("sha256 digest is always 32 bytes")
}
