mod bit_history;

pub use bit_history::BitHistory;

/// A bit history: a one byte summary of the 0s and 1s seen in a context.
/// State 0 means nothing has been seen yet.
pub trait StateTable {
    fn next(state: u8, bit: u8) -> u8;
    /// Approximate count of zeroes
    fn n0(state: u8) -> u8;
    /// Approximate count of ones
    fn n1(state: u8) -> u8;
    /// Coarse bucket of the state in 0..32: quantized counts and the last bit
    fn group(state: u8) -> u8;

    /// Both outcomes have been observed
    fn is_uncertain(state: u8) -> bool {
        Self::n0(state) != 0 && Self::n1(state) != 0
    }
}

#[derive(Clone, Copy)]
pub struct StateEntry {
    next: [u8; 2],
    counts: [u8; 2],
    group: u8,
}

impl StateEntry {
    const fn new(next: [u8; 2], counts: [u8; 2], group: u8) -> Self {
        Self { next, counts, group }
    }
}

macro_rules! impl_state_table_from {
    ($state_table_name:ident, $table:ident) => {
        impl StateTable for $state_table_name {
            #[inline(always)]
            fn next(state: u8, bit: u8) -> u8 {
                debug_assert!(bit <= 1);
                $table[usize::from(state)].next[usize::from(bit)]
            }

            #[inline(always)]
            fn n0(state: u8) -> u8 {
                $table[usize::from(state)].counts[0]
            }

            #[inline(always)]
            fn n1(state: u8) -> u8 {
                $table[usize::from(state)].counts[1]
            }

            #[inline(always)]
            fn group(state: u8) -> u8 {
                $table[usize::from(state)].group
            }
        }
    };
}

pub(crate) use impl_state_table_from;
