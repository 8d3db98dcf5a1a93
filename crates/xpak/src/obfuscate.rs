//! XOR keystream transform for the directory table and encrypted payloads
//!
//! This is format obfuscation with a fixed, publicly known key. It is not a
//! security boundary.

/// The 64-bit key baked into the pack format. Not user-configurable.
pub const PACK_KEY: u64 = 0x5F3A_C9B1_7E24_D806;

/// Apply the keystream to `buf` in place. Self-inverse: applying twice with
/// the same key restores the original bytes.
///
/// Aligned 8-byte chunks XOR against the full little-endian key. Trailing
/// bytes XOR against the current low byte of the key, which shifts right by
/// 8 bits after each byte, so the tail consumes progressively higher-order
/// key bytes.
pub fn apply(buf: &mut [u8], key: u64) {
    let mut chunks = buf.chunks_exact_mut(8);
    let key_bytes = key.to_le_bytes();

    for chunk in &mut chunks {
        for (b, k) in chunk.iter_mut().zip(key_bytes) {
            *b ^= k;
        }
    }

    let mut tail_key = key;
    for b in chunks.into_remainder() {
        *b ^= tail_key as u8;
        tail_key >>= 8;
    }
}
