use super::{Model, UNIT_SCALE};
use crate::config::Config;
use crate::context_map::ContextMap;
use crate::error::Result;
use crate::hash;
use crate::mixers::Mixer;
use crate::shared::Shared;

/// Contexts made of non-adjacent bytes, for tables and binary records.
pub struct SparseModel {
    cm: ContextMap,
}

// masks over the last 4 bytes
const MASKS: [u32; 7] = [0xff00, 0xff0000, 0xff000000, 0xff00ff, 0xff00ff00, 0xffff00, 0xf0f0f0f0];

impl SparseModel {
    pub const CONTEXTS: usize = MASKS.len() + 1;

    pub fn new(size: usize, config: &Config) -> Result<Self> {
        Ok(Self { cm: ContextMap::new(size, Self::CONTEXTS, UNIT_SCALE, config.run_stats, config.byte_history)? })
    }
}

impl Model for SparseModel {
    fn mixer_inputs(&self) -> usize {
        self.cm.mixer_inputs()
    }

    fn mix<M: Mixer>(&mut self, shared: &Shared, m: &mut M) {
        if shared.bit_position == 0 {
            for (i, mask) in MASKS.iter().enumerate() {
                self.cm.set(hash::hash(&[16 + i as u64, u64::from(shared.c4 & mask)]));
            }
            self.cm.set(hash::hash(&[24, u64::from(shared.c8 & 0xff)]));
        }
        self.cm.mix(m, shared);
    }

    fn update(&mut self, shared: &Shared) {
        self.cm.update(shared);
    }

    fn set_scale(&mut self, scale: i32) {
        self.cm.set_scale(scale);
    }
}
