use super::{Model, UNIT_SCALE};
use crate::config::Config;
use crate::context_map::ContextMap;
use crate::counters::StationaryMap;
use crate::error::Result;
use crate::hash;
use crate::mixers::Mixer;
use crate::shared::Shared;

/// Order 1-6 and word contexts through a context map,
/// order 0 and 1 through direct maps.
pub struct NormalModel {
    cm: ContextMap,
    order0: StationaryMap,
    order1: StationaryMap,
    word: u64,
}

impl NormalModel {
    pub const CONTEXTS: usize = 7;

    pub fn new(size: usize, config: &Config) -> Result<Self> {
        Ok(Self {
            cm: ContextMap::new(size, Self::CONTEXTS, UNIT_SCALE, config.run_stats, config.byte_history)?,
            order0: StationaryMap::new(0, 5, UNIT_SCALE),
            order1: StationaryMap::new(8, 5, UNIT_SCALE),
            word: 0,
        })
    }

    pub fn order(&self) -> usize {
        self.cm.order()
    }

    fn set_contexts(&mut self, shared: &Shared) {
        let c4 = u64::from(shared.c4);
        let c8 = u64::from(shared.c8);
        for order in 1..=4 {
            let mask = (1u64 << (8 * order)) - 1;
            self.cm.set(hash::hash(&[order, c4 & mask]));
        }
        self.cm.set(hash::hash(&[5, c4, c8 & 0xff]));
        self.cm.set(hash::hash(&[6, c4, c8 & 0xffff]));
        if self.word == 0 {
            self.cm.skip();
        } else {
            self.cm.set(hash::hash(&[7, self.word, c4 & 0xff]));
        }
        self.order0.set(0);
        self.order1.set(shared.c1.into());
    }
}

impl Model for NormalModel {
    fn mixer_inputs(&self) -> usize {
        self.cm.mixer_inputs() + 2 * StationaryMap::MIXER_INPUTS
    }

    fn mix<M: Mixer>(&mut self, shared: &Shared, m: &mut M) {
        if shared.bit_position == 0 {
            self.set_contexts(shared);
        }
        self.cm.mix(m, shared);
        self.order0.mix(m, shared.c0);
        self.order1.mix(m, shared.c0);
    }

    fn update(&mut self, shared: &Shared) {
        self.cm.update(shared);
        self.order0.update(shared.y);
        self.order1.update(shared.y);
        if shared.bit_position == 0 {
            let c = shared.c1;
            self.word = if c.is_ascii_alphabetic() {
                hash::combine(self.word, u64::from(c.to_ascii_lowercase()))
            } else {
                0
            };
        }
    }

    fn set_scale(&mut self, scale: i32) {
        self.cm.set_scale(scale);
        self.order0.set_scale(scale);
        self.order1.set_scale(scale);
    }
}
