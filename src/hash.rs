//! Context fingerprints.
//!
//! A fingerprint is reduced to a bucket index by its top bits and to a 16-bit
//! checksum by the bits just below them, so the two never overlap.

const MUL: [u64; 6] = [
    0x9E37_79B9_7F4A_7C15,
    0x2F0F_3D2F_6E1A_8C99,
    0xD6E8_FEB8_6659_FD93,
    0x6A09_E667_F3BC_C909,
    0xBB67_AE85_84CA_A73B,
    0x3C6E_F372_FE94_F82B,
];

/// Combines small integers into one context fingerprint.
pub fn hash(values: &[u64]) -> u64 {
    debug_assert!(!values.is_empty() && values.len() <= MUL.len());
    let mut h = 0u64;
    for (i, &v) in values.iter().enumerate() {
        h = h.wrapping_add(v.wrapping_add(1).wrapping_mul(MUL[i]));
    }
    h ^ (h >> 29)
}

/// Mixes `value` into an existing fingerprint, used to build context i from context i-1.
pub fn combine(seed: u64, value: u64) -> u64 {
    let h = seed.wrapping_mul(MUL[1]).wrapping_add(value.wrapping_add(1).wrapping_mul(MUL[0]));
    h ^ (h >> 31)
}

/// Final avalanche, applied once per context before reduction.
pub fn finalize(h: u64) -> u64 {
    let h = (h ^ (h >> 32)).wrapping_mul(MUL[2]);
    let h = (h ^ (h >> 29)).wrapping_mul(MUL[3]);
    h ^ (h >> 32)
}

/// Bucket index from the top `bits` bits
pub fn bucket_index(h: u64, bits: u32) -> usize {
    debug_assert!(bits > 0 && bits + 16 <= u64::BITS);
    (h >> (u64::BITS - bits)) as usize
}

/// The 16 bits right below the bucket index
pub fn checksum(h: u64, bits: u32) -> u16 {
    debug_assert!(bits + 16 <= u64::BITS);
    (h >> (u64::BITS - bits - 16)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_checksum_use_disjoint_bits() {
        let h = finalize(hash(&[42, 7]));
        let bits = 20;
        let idx = bucket_index(h, bits);
        let chk = checksum(h, bits);
        assert!(idx < 1 << bits);
        let rebuilt = ((idx as u64) << (64 - bits)) | (u64::from(chk) << (64 - bits - 16));
        assert_eq!(rebuilt, h & !((1u64 << (64 - bits - 16)) - 1));
    }

    #[test]
    fn different_contexts_rarely_share_bucket_and_checksum() {
        let bits = 16;
        let mut seen = std::collections::HashSet::new();
        let mut dupes = 0;
        for order in 0..8u64 {
            for ctx in 0..4096u64 {
                let h = finalize(hash(&[order, ctx]));
                if !seen.insert((bucket_index(h, bits), checksum(h, bits))) {
                    dupes += 1;
                }
            }
        }
        assert!(dupes < 4, "{dupes} full collisions");
    }

    #[test]
    fn combine_depends_on_order() {
        assert_ne!(combine(combine(0, 1), 2), combine(combine(0, 2), 1));
        assert_ne!(hash(&[1, 2]), hash(&[2, 1]));
    }
}
