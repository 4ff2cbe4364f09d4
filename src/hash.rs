//! Deterministic string hash shared between the builder and the reader.
//!
//! Probe sequences are derived from this hash at both build time and lookup
//! time, so the two sides must agree bit for bit. That rules out every hash
//! with per-process seeding (SipHash keys, `foldhash` seeds, ASLR-derived
//! state): a table built yesterday must probe identically in a process
//! started today. The recurrence is the classic unseeded byte hash with
//! multiplier 1000003; the constant is load-bearing and must never change,
//! or existing map files become unreadable.

const MULTIPLIER: u64 = 1_000_003;

/// Hashes `bytes` to a stable 64-bit value.
///
/// Empty input hashes to 0. Otherwise the state seeds from the first byte
/// shifted left by 7, then folds every byte (the first one again included)
/// through `state * 1000003 ^ byte` with wrapping arithmetic, and finally
/// XORs in the input length.
///
/// ```
/// use coldmap::stable_hash;
///
/// assert_eq!(stable_hash(b""), 0);
/// assert_eq!(stable_hash(b"a"), 12_416_037_344);
/// ```
pub fn stable_hash(bytes: &[u8]) -> u64 {
    let Some(&first) = bytes.first() else {
        return 0;
    };

    let mut x = (first as u64) << 7;
    for &b in bytes {
        x = x.wrapping_mul(MULTIPLIER) ^ b as u64;
    }
    x ^ bytes.len() as u64
}
