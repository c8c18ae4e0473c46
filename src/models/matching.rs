use super::{Model, UNIT_SCALE};
use crate::counters::{StateMap, StateMapKind};
use crate::error::{Error, Result};
use crate::hash;
use crate::logistic::stretch;
use crate::mixers::Mixer;
use crate::shared::Shared;

// bytes hashed to find a match, and the shortest match followed
const MIN_LEN: usize = 6;
const MAX_LEN: usize = 65535;
const LEN_BUCKETS: usize = 32;

/// Predicts the byte that followed the last occurrence of the current context.
///
/// The last `MIN_LEN` bytes index a table of history positions. A candidate
/// is verified against the history and then followed byte by byte until it
/// mispredicts a bit.
pub struct MatchModel {
    table: Vec<u32>,
    bits: u32,
    // history position of the predicted byte
    ptr: usize,
    len: usize,
    expected: u8,
    state_map: StateMap,
    scale: i32,
}

impl MatchModel {
    pub const MIXER_INPUTS: usize = 2;

    /// `size` bytes of position table
    pub fn new(size: usize) -> Result<Self> {
        let entries = size / std::mem::size_of::<u32>();
        if entries == 0 || !entries.is_power_of_two() {
            return Err(Error::TableSize { what: "match model", size });
        }
        Ok(Self {
            table: vec![0; entries],
            bits: entries.trailing_zeros(),
            ptr: 0,
            len: 0,
            expected: 0,
            state_map: StateMap::new(1, LEN_BUCKETS * 2, 1023, StateMapKind::Run),
            scale: UNIT_SCALE,
        })
    }

    /// Bytes matched so far, 0 without a match
    pub fn length(&self) -> usize {
        self.len
    }

    fn find(&mut self, shared: &Shared) {
        let pos = shared.bytes_seen();
        if pos < MIN_LEN {
            return;
        }
        let h = hash::finalize(hash::hash(&[u64::from(shared.c4), u64::from(shared.c8 & 0xffff)]));
        let idx = if self.bits == 0 { 0 } else { hash::bucket_index(h, self.bits) };

        if self.len == 0 {
            let candidate = self.table[idx] as usize;
            let distance = pos - candidate;
            if candidate > 0 && distance <= shared.window() {
                let limit = MAX_LEN.min(candidate).min(shared.window() - distance);
                let len = (0..limit).take_while(|&j| shared.byte(j + 1) == shared.byte(distance + j + 1)).count();
                if len >= MIN_LEN {
                    self.len = len;
                    self.ptr = candidate;
                }
            }
        }
        // positions wrap after 4 GiB, verification rejects the stale ones
        self.table[idx] = pos as u32;
    }
}

impl Model for MatchModel {
    fn mixer_inputs(&self) -> usize {
        Self::MIXER_INPUTS
    }

    fn mix<M: Mixer>(&mut self, shared: &Shared, m: &mut M) {
        if self.len == 0 {
            self.state_map.skip(0);
            m.add(0);
            m.add(0);
            return;
        }
        let bit = usize::from((self.expected >> (7 - shared.bit_position)) & 1);
        let bucket = self.len.min(LEN_BUCKETS - 1);
        let p = i32::from(self.state_map.p(0, bucket << 1 | bit));
        m.add((stretch(p) * self.scale) >> 8);
        m.add(((p - 2048) * self.scale) >> 9);
    }

    fn update(&mut self, shared: &Shared) {
        self.state_map.update(shared.y);
        let bpos = shared.bit_position;
        if self.len > 0 {
            let predicted = match bpos {
                0 => self.expected == shared.c1,
                _ => (u32::from(self.expected) + 256) >> (8 - bpos) == shared.c0,
            };
            if !predicted {
                self.len = 0;
            }
        }
        if bpos == 0 {
            if self.len > 0 {
                self.len = (self.len + 1).min(MAX_LEN);
                self.ptr += 1;
            }
            self.find(shared);
            if self.len > 0 {
                self.expected = shared.byte(shared.bytes_seen() - self.ptr);
            }
        }
    }

    fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
    }
}
