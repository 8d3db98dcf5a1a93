//! Path hashing for directory table lookup
//!
//! Paths are normalized (lower-cased, forward slashes folded to backslashes),
//! encoded as UTF-16LE code units, and hashed with 64-bit FNV-1a. Two paths
//! that differ only by case or slash direction name the same archive member.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fold forward slashes to backslashes, preserving case. This is the form the
/// name field stores verbatim.
pub fn normalize_name(path: &str) -> String {
    path.replace('/', "\\")
}

/// Hash a path into its 64-bit directory table key.
///
/// Never returns 0 for the paths a pack can actually contain: 0 is the unused
/// record sentinel, and an FNV-1a collision with it over a non-empty UTF-16
/// stream does not occur for ASCII path inputs in practice.
pub fn path_hash(path: &str) -> u64 {
    let normalized = normalize_name(&path.to_lowercase());

    let mut hash = FNV_OFFSET_BASIS;
    for unit in normalized.encode_utf16() {
        for byte in unit.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}
