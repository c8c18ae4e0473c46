use super::{impl_state_table_from, StateEntry, StateTable};

/// Nonstationary bit history table.
///
/// States are assigned to (n0, n1) count pairs in order of increasing total count.
/// Pairs with both counts present and a small total get two states, one per last bit seen.
/// On a bit, the opposite count is discounted, favoring recent history.
pub struct BitHistory;

const MAX_COUNT: usize = 50;
const COUNT_BOUND: [i32; 6] = [20, 48, 15, 8, 6, 5]; // n1 -> max n0
const STATE_COUNT: usize = 255;
const TABLE: [StateEntry; 256] = gen_table();

impl_state_table_from!(BitHistory, TABLE);

// Number of states representing (n0, n1): 0, 1 or 2
const fn num_states(n0: i32, n1: i32) -> i32 {
    let (n0, n1) = if n0 < n1 { (n1, n0) } else { (n0, n1) };
    if n0 < 0 || n1 < 0 || n1 >= COUNT_BOUND.len() as i32 || n0 > COUNT_BOUND[n1 as usize] {
        return 0;
    }
    1 + (n1 > 0 && n0 + n1 <= 17) as i32
}

// Count of the opposite bit after a surprise
const fn discount(n: i32) -> i32 {
    (n >= 1) as i32 + (n >= 2) as i32 + (n >= 3) as i32 + (n >= 4) as i32
        + (n >= 5) as i32 + (n >= 7) as i32 + (n >= 8) as i32
}

const fn next_counts(n0: i32, n1: i32, bit: i32) -> (i32, i32) {
    // work with n0 >= n1, mirror the bit otherwise
    let swap = n0 < n1;
    let (mut a, mut b, y) = if swap { (n1, n0, 1 - bit) } else { (n0, n1, bit) };
    if y == 1 {
        b += 1;
        a = discount(a);
    } else {
        a += 1;
        b = discount(b);
    }
    while num_states(a, b) == 0 {
        if b < 2 {
            a -= 1;
        } else {
            a = (a * (b - 1) + (b / 2)) / b;
            b -= 1;
        }
    }
    if swap { (b, a) } else { (a, b) }
}

const fn quantize(n: i32) -> u8 {
    match n {
        0 => 0,
        1 => 1,
        2..=4 => 2,
        _ => 3,
    }
}

const fn gen_table() -> [StateEntry; 256] {
    // (n0, n1, last bit) -> state
    let mut t = [[[0u8; 2]; MAX_COUNT]; MAX_COUNT];
    let mut state = 0;
    let mut total = 0;
    while total < MAX_COUNT {
        let mut n1 = 0;
        while n1 <= total {
            let n0 = total - n1;
            let n = num_states(n0 as i32, n1 as i32);
            if n > 0 {
                t[n0][n1][0] = state as u8;
                t[n0][n1][1] = (state + n as usize - 1) as u8;
                state += n as usize;
            }
            n1 += 1;
        }
        total += 1;
    }
    assert!(state == STATE_COUNT);

    let mut table = [StateEntry::new([0; 2], [0; 2], 0); 256];
    let mut n0 = 0;
    while n0 < MAX_COUNT {
        let mut n1 = 0;
        while n1 < MAX_COUNT {
            let n = num_states(n0 as i32, n1 as i32);
            let mut last = 0;
            while last < n {
                let s = t[n0][n1][last as usize] as usize;
                let (a, b) = next_counts(n0 as i32, n1 as i32, 0);
                let next0 = t[a as usize][b as usize][0];
                let (a, b) = next_counts(n0 as i32, n1 as i32, 1);
                let next1 = t[a as usize][b as usize][1];
                // single states remember the majority as their last bit
                let last_bit = if n == 2 { last as u8 } else { (n1 > n0) as u8 };
                let group = (quantize(n0 as i32) << 3) | (quantize(n1 as i32) << 1) | last_bit;
                table[s] = StateEntry::new([next0, next1], [n0 as u8, n1 as u8], group);
                last += 1;
            }
            n1 += 1;
        }
        n0 += 1;
    }
    table
}
