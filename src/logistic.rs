//! Conversions between 12-bit probabilities and the stretched (logit) domain.
//!
//! `stretch(p) = ln(p / (4096 - p))` scaled by 256 and clamped to ±2047,
//! `squash` is its inverse. Mixing happens in the stretched domain.

/// Largest stretched value
pub const ST_MAX: i32 = 2047;

// squash at x = -2048, -1920, ..., 2048, interpolated in between
const SQUASH_KNOTS: [i32; 33] = [
    1, 2, 3, 6, 10, 16, 27, 45, 73, 120, 194, 310, 488, 747, 1101, 1546, 2047, 2549, 2994, 3348,
    3607, 3785, 3901, 3975, 4022, 4050, 4068, 4079, 4085, 4089, 4092, 4093, 4094,
];

const STRETCH_TABLE: [i16; 4096] = gen_stretch_table();

/// Maps a stretched value in roughly ±2047 back to a probability in 1..=4095
#[inline]
pub const fn squash(x: i32) -> i32 {
    if x > ST_MAX {
        return 4095;
    }
    if x < -ST_MAX {
        return 1;
    }
    let w = x & 127;
    let i = ((x >> 7) + 16) as usize;
    (SQUASH_KNOTS[i] * (128 - w) + SQUASH_KNOTS[i + 1] * w + 64) >> 7
}

/// Inverse of `squash`: the smallest x such that `squash(x) >= p`
#[inline]
pub fn stretch(p: i32) -> i32 {
    debug_assert!((0..4096).contains(&p), "Probability must be 12-bit");
    i32::from(STRETCH_TABLE[(p & 4095) as usize])
}

const fn gen_stretch_table() -> [i16; 4096] {
    let mut table = [0; 4096];
    let mut pi = 0;
    let mut x = -ST_MAX;
    while x <= ST_MAX {
        let v = squash(x) as usize;
        while pi <= v {
            table[pi] = x as i16;
            pi += 1;
        }
        x += 1;
    }
    while pi < 4096 {
        table[pi] = ST_MAX as i16;
        pi += 1;
    }
    table
}
