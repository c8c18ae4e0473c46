use crate::logistic::stretch;
use crate::mixers::Mixer;

/// Direct-indexed map for (nearly) stationary contexts.
///
/// Keeps a 16-bit probability for each context and partial byte.
/// Adds two inputs to the mixer.
pub struct StationaryMap {
    data: Vec<u16>,
    mask: u32,
    context: usize,
    index: usize,
    rate: u32,
    scale: i32,
}

impl StationaryMap {
    pub const MIXER_INPUTS: usize = 2;

    pub fn new(context_bits: u32, rate: u32, scale: i32) -> Self {
        debug_assert!(context_bits <= 16 && (1..16).contains(&rate));
        Self {
            data: vec![0x7fff; (1 << context_bits) * 255],
            mask: (1 << context_bits) - 1,
            context: 0,
            index: 0,
            rate,
            scale,
        }
    }

    /// Selects the context for the next byte; higher bits are dropped.
    pub fn set(&mut self, ctx: u32) {
        self.context = (ctx & self.mask) as usize * 255;
    }

    pub fn set_scale(&mut self, scale: i32) {
        self.scale = scale;
    }

    /// `c0` is the partial byte with its leading 1
    pub fn mix<M: Mixer>(&mut self, m: &mut M, c0: u32) {
        debug_assert!((1..256).contains(&c0));
        self.index = self.context + c0 as usize - 1;
        let p = i32::from(self.data[self.index] >> 4);
        m.add((stretch(p) * self.scale) >> 8);
        m.add(((p - 2048) * self.scale) >> 9);
    }

    pub fn update(&mut self, bit: u8) {
        let t = &mut self.data[self.index];
        let target = i32::from(bit) << 16;
        let next = i32::from(*t) + ((target - i32::from(*t) + (1 << (self.rate - 1))) >> self.rate);
        *t = next.clamp(0, 0xffff) as u16;
    }
}
