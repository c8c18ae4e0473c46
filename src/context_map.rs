//! Hashed bit histories for up to 64 contexts per model.
//!
//! A byte is modelled through three slots: one found when the context is set
//! (bits 0-1, plus run length and the last three bytes seen in the context),
//! and two found again after bits 2 and 5 using the partial byte.
//! Within a slot, bit `k` of its group lives at `1 + bit` or `3 + two bits`.

use crate::counters::{StateMap, StateMapKind};
use crate::error::{Error, Result};
use crate::hash;
use crate::hashmap::{HashTable, SlotHandle};
use crate::logistic::stretch;
use crate::mixers::Mixer;
use crate::shared::Shared;
use crate::state_table::{BitHistory, StateTable};

pub const MAX_CONTEXTS: usize = 64;

// byte layout of the slot found by `set`
const RUN_COUNT: usize = 3;
const BYTE1: usize = 4;
const BYTE2: usize = 5;
const BYTE3: usize = 6;
// run count of a slot whose bits 2..7 were not stored yet
const PENDING: u8 = 255;
const MAX_RUN: u8 = 253;

#[derive(Clone, Copy, Default)]
struct Context {
    valid: bool,
    bucket: usize,
    checksum: u16,
    // slot of the current bit group
    base: SlotHandle,
    // slot found by `set`, holds the byte history
    byte_slot: SlotHandle,
    // offset of the current bit history in `base`, none while pending
    bit: Option<usize>,
}

pub struct ContextMap {
    table: HashTable,
    contexts: Vec<Context>,
    index: usize,
    state_map: StateMap,
    run_map: StateMap,
    byte_map: StateMap,
    group_map: StateMap,
    scale: i32,
    run_stats: bool,
    byte_history: bool,
    order: usize,
}

impl ContextMap {
    /// `size` bytes of slots shared by `count` contexts
    pub fn new(size: usize, count: usize, scale: i32, run_stats: bool, byte_history: bool) -> Result<Self> {
        if count > MAX_CONTEXTS {
            return Err(Error::TooManyContexts { count, max: MAX_CONTEXTS });
        }
        Ok(Self {
            table: HashTable::new(size, "context map")?,
            contexts: vec![Context::default(); count],
            index: 0,
            state_map: StateMap::new(count, 1 << 8, 1023, StateMapKind::BitHistory),
            run_map: StateMap::new(count, 1 << 12, 127, StateMapKind::Run),
            byte_map: StateMap::new(count, 1 << 8, 1023, StateMapKind::Generic),
            group_map: StateMap::new(count, 1 << 12, 1023, StateMapKind::Generic),
            scale,
            run_stats,
            byte_history,
            order: 0,
        })
    }

    pub fn mixer_inputs(&self) -> usize {
        self.contexts.len() * (4 + usize::from(self.run_stats) + 2 * usize::from(self.byte_history))
    }

    pub fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
    }

    /// Contexts with a known bit history at the last `mix`
    pub fn order(&self) -> usize {
        self.order
    }

    /// Sets the next context of this byte.
    pub fn set(&mut self, ctx: u64) {
        debug_assert!(self.index < self.contexts.len(), "context map has no free context");
        let (bucket, checksum) = self.table.locate(hash::finalize(ctx));
        let base = self.table.find_at(bucket, checksum);
        let slot = *self.table.slot(base);
        if slot[RUN_COUNT] == PENDING {
            self.store_pending(bucket, checksum, slot[BYTE1]);
            self.table.slot_mut(base)[RUN_COUNT] = 1;
        } else if slot[0] == 0 {
            // new context: keep bits 2..7 out of the table until it is seen again
            self.table.slot_mut(base)[RUN_COUNT] = PENDING;
        }
        self.contexts[self.index] = Context { valid: true, bucket, checksum, base, byte_slot: base, bit: Some(0) };
        self.index += 1;
    }

    /// Declares the next context as unknown; it adds neutral inputs.
    pub fn skip(&mut self) {
        debug_assert!(self.index < self.contexts.len(), "context map has no free context");
        self.contexts[self.index].valid = false;
        self.index += 1;
    }

    // Replays bits 2..7 of the only byte seen so far into the slots they would have used.
    // The slots may collide with another context; the update goes ahead regardless.
    fn store_pending(&mut self, bucket: usize, checksum: u16, byte: u8) {
        let mask = self.table.mask();
        let c = usize::from(byte) + 256;
        let bit = |shift: usize| ((c >> shift) & 1) as u8;

        let a = self.table.find_at((bucket + (c >> 6)) & mask, checksum);
        self.advance(a, 0, bit(5));
        self.advance(a, 1 + ((c >> 5) & 1), bit(4));
        self.advance(a, 3 + ((c >> 4) & 3), bit(3));

        let b = self.table.find_at((bucket + (c >> 3)) & mask, checksum);
        self.advance(b, 0, bit(2));
        self.advance(b, 1 + ((c >> 2) & 1), bit(1));
        self.advance(b, 3 + ((c >> 1) & 3), bit(0));
    }

    fn advance(&mut self, handle: SlotHandle, offset: usize, bit: u8) {
        let state = &mut self.table.slot_mut(handle)[offset];
        *state = BitHistory::next(*state, bit);
    }

    /// Called after `shared` has seen `bit`.
    pub fn update(&mut self, shared: &Shared) {
        let bit = shared.y;
        self.state_map.update(bit);
        self.run_map.update(bit);
        self.byte_map.update(bit);
        self.group_map.update(bit);

        let mask = self.table.mask();
        let bpos = shared.bit_position;
        for i in 0..self.index {
            let mut cx = self.contexts[i];
            if !cx.valid {
                continue;
            }
            if let Some(offset) = cx.bit {
                self.advance(cx.base, offset, bit);
            }
            let history = self.table.slot_mut(cx.byte_slot);
            let run = history[RUN_COUNT];
            if run == PENDING && bpos >= 2 {
                cx.bit = None;
            } else {
                match bpos {
                    0 => {
                        let c1 = shared.c1;
                        if history[0] < 3 {
                            // first byte in this context
                            history[BYTE1] = c1;
                            history[BYTE2] = c1;
                            history[BYTE3] = c1;
                        } else if history[BYTE1] == c1 {
                            history[RUN_COUNT] = run.saturating_add(1).min(MAX_RUN);
                        } else {
                            history[RUN_COUNT] = 1;
                            history[BYTE3] = history[BYTE2];
                            history[BYTE2] = history[BYTE1];
                            history[BYTE1] = c1;
                        }
                    }
                    2 | 5 => {
                        cx.base = self.table.find_at((cx.bucket + shared.c0 as usize) & mask, cx.checksum);
                        cx.bit = Some(0);
                    }
                    1 | 3 | 6 => cx.bit = Some(1 + usize::from(bit)),
                    _ => cx.bit = Some(3 + (shared.c0 & 3) as usize),
                }
            }
            self.contexts[i] = cx;
        }
        if bpos == 0 {
            self.index = 0;
        }
    }

    pub fn mix<M: Mixer>(&mut self, m: &mut M, shared: &Shared) {
        debug_assert_eq!(self.index, self.contexts.len(), "every context must be set or skipped");
        self.order = 0;
        let bpos = u32::from(shared.bit_position);
        let c0 = shared.c0;
        for i in 0..self.index {
            let cx = self.contexts[i];
            if !cx.valid {
                self.skip_inputs(m, i);
                continue;
            }

            let state = cx.bit.map_or(0, |offset| self.table.slot(cx.base)[offset]);
            let n0 = BitHistory::n0(state);
            let n1 = BitHistory::n1(state);
            let uncertain = u32::from(BitHistory::is_uncertain(state));

            let history = *self.table.slot(cx.byte_slot);
            let seen = u32::from(BitHistory::n0(history[0])) + u32::from(BitHistory::n1(history[0]));
            // bytes known in this context; the first bit of the current one is already counted after bit 0
            let complete = |k: u32| seen > k || (seen >= k && bpos == 0);
            let (byte1, byte2, byte3) = (u32::from(history[BYTE1]), u32::from(history[BYTE2]), u32::from(history[BYTE3]));
            let predicts = |byte: u32| ((byte + 256) >> (8 - bpos)) == c0;
            let bit_of = |byte: u32| (byte >> (7 - bpos)) & 1;

            if self.run_stats {
                let bp = (0xFEA4 >> (bpos << 1)) & 3;
                if complete(1) && predicts(byte1) {
                    let byte1_uncertain = u32::from(byte2 != byte1);
                    let run = u32::from(history[RUN_COUNT]);
                    let idx = run << 4 | bp << 2 | byte1_uncertain << 1 | bit_of(byte1);
                    m.add(stretch(i32::from(self.run_map.p(i, idx as usize))) >> (1 + byte1_uncertain));
                } else if complete(2) && predicts(byte2) {
                    let byte2_uncertain = u32::from(byte3 != byte2);
                    let idx = uncertain << 1 | bit_of(byte2);
                    m.add(stretch(i32::from(self.run_map.p(i, idx as usize))) >> (2 + byte2_uncertain));
                } else {
                    self.run_map.skip(i);
                    m.add(0);
                }
            }

            if state == 0 {
                self.state_map.skip(i);
                for _ in 0..4 {
                    m.add(0);
                }
            } else {
                let p1 = i32::from(self.state_map.p(i, usize::from(state)));
                let st = (stretch(p1) * self.scale) >> 8;
                let young = i32::from(state <= 2);
                m.add(st >> young);
                m.add(((p1 - 2048) * self.scale) >> 9);
                m.add(if uncertain == 1 { 0 } else { st });
                let p0 = 4095 - p1;
                let certain_one = if n0 == 0 { p1 } else { 0 };
                let certain_zero = if n1 == 0 { p0 } else { 0 };
                m.add(((certain_one - certain_zero) * self.scale) >> 10);
                self.order += 1;
            }

            if self.byte_history {
                let bits = bit_of(byte1) | bit_of(byte2) << 1 | bit_of(byte3) << 2;
                let bh_state = if complete(3) {
                    8 | bits
                } else if complete(2) {
                    4 | (bits & 3)
                } else if complete(1) {
                    2 | (bits & 1)
                } else {
                    0
                };
                let group = u32::from(BitHistory::group(state));
                let p = self.byte_map.p(i, (uncertain << 7 | bh_state << 3 | bpos) as usize);
                m.add(stretch(i32::from(p)) >> 2);
                let p = self.group_map.p(i, (group << 7 | bh_state << 3 | bpos) as usize);
                m.add(stretch(i32::from(p)) >> 2);
            }
        }
    }

    fn skip_inputs<M: Mixer>(&mut self, m: &mut M, i: usize) {
        if self.run_stats {
            self.run_map.skip(i);
            m.add(0);
        }
        self.state_map.skip(i);
        for _ in 0..4 {
            m.add(0);
        }
        if self.byte_history {
            self.byte_map.skip(i);
            self.group_map.skip(i);
            m.add(0);
            m.add(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixers::tests::InputRecorder;

    struct Harness {
        cm: ContextMap,
        shared: Shared,
        m: InputRecorder,
    }

    impl Harness {
        fn new(count: usize) -> Self {
            Self { cm: ContextMap::new(1 << 16, count, 256, true, true).unwrap(), shared: Shared::new(), m: InputRecorder::default() }
        }

        /// Codes one byte, calling `inspect` before every bit with the bit position
        fn byte(&mut self, byte: u8, contexts: &[Option<u64>], mut inspect: impl FnMut(u8, &ContextMap, &[i32])) {
            for i in (0..8).rev() {
                if self.shared.bit_position == 0 {
                    for ctx in contexts {
                        match ctx {
                            Some(ctx) => self.cm.set(*ctx),
                            None => self.cm.skip(),
                        }
                    }
                }
                self.m.inputs.clear();
                self.cm.mix(&mut self.m, &self.shared);
                inspect(self.shared.bit_position, &self.cm, &self.m.inputs);
                self.shared.update((byte >> i) & 1);
                self.cm.update(&self.shared);
            }
        }
    }

    #[test]
    fn input_count_is_constant() {
        let mut h = Harness::new(3);
        let expected = h.cm.mixer_inputs();
        assert_eq!(expected, 3 * 7);
        for (i, byte) in b"hello hello".iter().enumerate() {
            let ctx = [Some(1), None, Some(i as u64 % 3)];
            h.byte(*byte, &ctx, |_, _, inputs| assert_eq!(inputs.len(), expected));
        }
        let lean = ContextMap::new(1 << 12, 2, 256, false, false).unwrap();
        assert_eq!(lean.mixer_inputs(), 2 * 4);
    }

    #[test]
    fn unseen_contexts_are_neutral() {
        let mut h = Harness::new(2);
        h.byte(b'x', &[Some(5), None], |bpos, cm, inputs| {
            if bpos == 0 {
                assert_eq!(cm.order(), 0);
                assert!(inputs.iter().all(|&x| x.abs() <= 1), "{inputs:?}");
            }
        });
    }

    #[test]
    fn rejects_too_many_contexts() {
        assert!(matches!(
            ContextMap::new(1 << 12, MAX_CONTEXTS + 1, 256, true, true),
            Err(Error::TooManyContexts { count: 65, max: 64 })
        ));
        assert!(matches!(ContextMap::new(100, 1, 256, true, true), Err(Error::TableSize { .. })));
    }

    #[test]
    fn pending_bits_are_stored_on_second_visit() {
        let mut h = Harness::new(1);
        let mut orders = Vec::new();
        for _ in 0..2 {
            h.byte(b'A', &[Some(77)], |bpos, cm, _| {
                if bpos == 3 {
                    orders.push(cm.order());
                }
            });
        }
        assert_eq!(orders, [0, 1]);
    }

    #[test]
    fn repeated_byte_is_predicted() {
        let mut h = Harness::new(1);
        for _ in 0..60 {
            h.byte(b'A', &[Some(9)], |_, _, _| {});
        }
        // 'A' = 0b0100_0001
        let mut first = Vec::new();
        let mut last = Vec::new();
        h.byte(b'A', &[Some(9)], |bpos, cm, inputs| {
            assert_eq!(cm.order(), 1);
            match bpos {
                0 => first = inputs.to_vec(),
                7 => last = inputs.to_vec(),
                _ => {}
            }
        });
        // run input and bit history input agree with the byte
        assert!(first[0] < 0 && first[1] < -500, "{first:?}");
        assert!(last[0] > 0 && last[1] > 500, "{last:?}");
    }

    #[test]
    fn scale_multiplies_state_inputs() {
        let mut unit = Harness::new(1);
        let mut double = Harness::new(1);
        double.cm.set_scale(512);
        let text = b"scale scale scale scale";
        let mut a = Vec::new();
        let mut b = Vec::new();
        for &byte in text {
            unit.byte(byte, &[Some(1)], |_, _, inputs| a.push(inputs.to_vec()));
            double.byte(byte, &[Some(1)], |_, _, inputs| b.push(inputs.to_vec()));
        }
        let mut nonzero = 0;
        for (x, y) in a.iter().zip(&b) {
            // run input first, then four from the bit history state, then two byte history inputs
            assert_eq!(x[0], y[0]);
            for i in 1..5 {
                assert!((y[i] - 2 * x[i]).abs() <= 1, "{x:?} {y:?}");
                nonzero += usize::from(x[i] != 0);
            }
            assert_eq!(x[5..], y[5..]);
        }
        assert!(nonzero > 50);
    }

    #[test]
    fn skipped_context_adds_zeroes() {
        let mut h = Harness::new(2);
        for _ in 0..10 {
            h.byte(b'q', &[Some(3), Some(4)], |_, _, _| {});
        }
        h.byte(b'q', &[None, Some(4)], |_, cm, inputs| {
            assert!(inputs[..7].iter().all(|&x| x == 0));
            assert!(inputs[7..].iter().any(|&x| x != 0));
            assert_eq!(cm.order(), 1);
        });
    }
}
