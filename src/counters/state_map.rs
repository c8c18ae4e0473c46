use crate::state_table::{BitHistory, StateTable};

/// How a [`StateMap`] starts out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateMapKind {
    /// Indexed by a bit history state, starts from the state's counts
    BitHistory,
    /// Bit 0 of the index is the predicted bit
    Run,
    /// Everything starts at 1/2
    Generic,
}

const COUNT_BITS: u32 = 10;
const COUNT_MASK: u32 = (1 << COUNT_BITS) - 1;

// 2^14 / (n + 1.5)
const RECIPROCALS: [i32; 1024] = gen_reciprocals();

const fn gen_reciprocals() -> [i32; 1024] {
    let mut table = [0; 1024];
    let mut i = 0;
    while i < 1024 {
        table[i] = 16384 / (i as i32 + i as i32 + 3);
        i += 1;
    }
    table
}

/// Maps a context to an adaptive probability.
///
/// Each entry packs a 22-bit probability with a 10-bit hit count.
/// The adaptation rate is `1 / (count + 1.5)` until the count reaches `limit`.
/// Several independent sets can share one map; each set remembers
/// the entry it predicted from until [`update`](StateMap::update).
pub struct StateMap {
    table: Vec<u32>,
    size: usize,
    limit: u32,
    selected: Vec<Option<usize>>,
}

impl StateMap {
    pub fn new(sets: usize, size: usize, limit: u32, kind: StateMapKind) -> Self {
        debug_assert!(limit <= COUNT_MASK);
        let mut table = vec![0; sets * size];
        for (i, t) in table.iter_mut().enumerate() {
            let cx = i % size;
            let p16: u32 = match kind {
                StateMapKind::BitHistory => {
                    let state = cx as u8;
                    let mut n0 = u32::from(BitHistory::n0(state));
                    let mut n1 = u32::from(BitHistory::n1(state));
                    if n0 == 0 {
                        n1 *= 64;
                    }
                    if n1 == 0 {
                        n0 *= 64;
                    }
                    (65536 * (n1 * 2 + 1)) / (n0 * 2 + n1 * 2 + 2)
                }
                StateMapKind::Run => {
                    if cx & 1 == 1 {
                        49152
                    } else {
                        16384
                    }
                }
                StateMapKind::Generic => 32768,
            };
            *t = p16.min(65535) << 16;
        }
        Self { table, size, limit, selected: vec![None; sets] }
    }

    /// Prediction of set `i` under context `cx`, a 12-bit probability
    pub fn p(&mut self, i: usize, cx: usize) -> u16 {
        debug_assert!(cx < self.size);
        let idx = i * self.size + cx;
        self.selected[i] = Some(idx);
        (self.table[idx] >> 20) as u16
    }

    /// Set `i` makes no prediction this bit
    pub fn skip(&mut self, i: usize) {
        self.selected[i] = None;
    }

    pub fn update(&mut self, bit: u8) {
        for i in 0..self.selected.len() {
            if let Some(idx) = self.selected[i].take() {
                self.update_entry(idx, bit);
            }
        }
    }

    fn update_entry(&mut self, idx: usize, bit: u8) {
        let entry = self.table[idx];
        let count = entry & COUNT_MASK;
        let p = i64::from(entry >> COUNT_BITS);
        let target = i64::from(bit) << 22;
        // change of the probability scaled by 2^10, like the packed entry
        let delta = ((target - p) >> 3) * i64::from(RECIPROCALS[count as usize]);
        let next = ((i64::from(entry & !COUNT_MASK) + delta) & !i64::from(COUNT_MASK))
            .clamp(0, i64::from(u32::MAX & !COUNT_MASK));
        let count = if count < self.limit { count + 1 } else { self.limit };
        self.table[idx] = next as u32 | count;
    }
}
