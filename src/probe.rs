//! Open-addressing probe sequence.
//!
//! Collision resolution follows the perturbation recurrence used by the
//! builder when it assigned slots: first index `hash & mask`, then
//! `idx = 5 * idx + 1 + perturb` (masked) with `perturb` starting at the
//! full hash and shifting right by 5 each step. Once `perturb` drains to
//! zero the recurrence degenerates to `idx = (5 * idx + 1) & mask`, which
//! visits every slot of a power-of-two table, so the sequence eventually
//! covers the whole table.
//!
//! The sequence itself is infinite. Consumers bound traversal at
//! `bucket_count` steps: a well-formed table always yields a match or an
//! empty slot before that, so exhausting the bound means the file is
//! corrupt.

const PERTURB_SHIFT: u32 = 5;

/// Iterator over candidate bucket indices for one hash.
///
/// `bucket_count` must be a power of two; the recurrence masks rather than
/// taking a modulus. Header validation enforces this before any probing.
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    idx: u64,
    perturb: u64,
    mask: u64,
    started: bool,
}

impl ProbeSequence {
    pub fn new(hash: u64, bucket_count: u32) -> Self {
        debug_assert!(bucket_count.is_power_of_two());
        let mask = u64::from(bucket_count) - 1;
        Self {
            idx: hash & mask,
            perturb: hash,
            mask,
            started: false,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if !self.started {
            self.started = true;
            return Some(self.idx as u32);
        }

        self.idx = self
            .idx
            .wrapping_mul(5)
            .wrapping_add(1)
            .wrapping_add(self.perturb)
            & self.mask;
        self.perturb >>= PERTURB_SHIFT;
        Some(self.idx as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_index_is_hash_masked() {
        let probes: Vec<u32> = ProbeSequence::new(0x1234_5678, 16).take(1).collect();
        assert_eq!(probes, vec![0x1234_5678 & 15]);
    }

    #[test]
    fn recurrence_matches_builder() {
        // Hand-stepped: hash 7, 8 buckets. idx0 = 7 & 7 = 7.
        // idx1 = (5*7 + 1 + 7) & 7 = 43 & 7 = 3, perturb -> 0.
        // idx2 = (5*3 + 1 + 0) & 7 = 16 & 7 = 0.
        // idx3 = (5*0 + 1) & 7 = 1.
        let probes: Vec<u32> = ProbeSequence::new(7, 8).take(4).collect();
        assert_eq!(probes, vec![7, 3, 0, 1]);
    }

    #[test]
    fn large_hash_perturbs_high_bits_in() {
        // High hash bits reach the index through the perturbation, so two
        // hashes equal modulo the table still diverge after the first step.
        let a: Vec<u32> = ProbeSequence::new(0x0000_0001, 8).take(4).collect();
        let b: Vec<u32> = ProbeSequence::new(0xF000_0001, 8).take(4).collect();
        assert_eq!(a[0], b[0]);
        assert_ne!(a, b);
    }

    #[test]
    fn covers_table_within_bound() {
        // Within bucket_count steps of the degenerate recurrence the
        // sequence must revisit slots rather than escape the mask.
        for count in [1u32, 2, 4, 64] {
            for idx in ProbeSequence::new(u64::MAX, count).take(count as usize) {
                assert!(idx < count);
            }
        }
    }

    #[test]
    fn single_bucket_always_probes_zero() {
        let probes: Vec<u32> = ProbeSequence::new(0xDEAD_BEEF, 1).take(3).collect();
        assert_eq!(probes, vec![0, 0, 0]);
    }
}
