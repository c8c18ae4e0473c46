use super::Mixer;
use crate::logistic::{squash, ST_MAX};

/// Fixed point one for weights
const ONE: i32 = 1 << 16;
const MAX_WEIGHT: i32 = 1 << 20;
/// Neutral scale factor
pub const UNIT_SCALE: i32 = 1024;
const DEFAULT_LR: i32 = 7;

/// Gated linear mixing in the logistic domain.
///
/// Every selected weight set computes `squash(dot(inputs, weights))`.
/// With more than one set selected per bit, a second mixer
/// with a single weight set combines their outputs.
pub struct LogisticMixer {
    inputs: Vec<i32>,
    input_count: usize,
    weights: Vec<i32>,
    contexts: usize,
    selected: Vec<usize>,
    max_selected: usize,
    base: usize,
    // per selected set: probability and stretched output
    outputs: Vec<(i32, i32)>,
    scale: i32,
    lr: i32,
    final_layer: Option<Box<LogisticMixer>>,
}

impl LogisticMixer {
    /// `input_count` inputs, `contexts` weight sets in total, at most `max_selected` chosen per bit.
    pub fn new(input_count: usize, contexts: usize, max_selected: usize) -> Self {
        debug_assert!(input_count > 0 && contexts >= max_selected && max_selected > 0);
        let final_layer = (max_selected > 1).then(|| {
            let mut m = Self::with_weights(max_selected, 1, 1, ONE / max_selected as i32);
            m.set_learning_rate(2);
            Box::new(m)
        });
        Self { final_layer, ..Self::with_weights(input_count, contexts, max_selected, 0) }
    }

    fn with_weights(input_count: usize, contexts: usize, max_selected: usize, w: i32) -> Self {
        Self {
            inputs: Vec::with_capacity(input_count),
            input_count,
            weights: vec![w; input_count * contexts],
            contexts,
            selected: Vec::with_capacity(max_selected),
            max_selected,
            base: 0,
            outputs: Vec::with_capacity(max_selected),
            scale: UNIT_SCALE,
            lr: DEFAULT_LR,
            final_layer: None,
        }
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Output gain of the first layer, `UNIT_SCALE` is neutral
    pub fn set_scale_factor(&mut self, scale: i32) {
        self.scale = scale;
    }

    pub fn set_learning_rate(&mut self, lr: i32) {
        self.lr = lr;
    }

    pub fn weight(&self, ctx: usize, input: usize) -> i32 {
        self.weights[ctx * self.input_count + input]
    }

    fn dot(&self, ctx: usize) -> i32 {
        let w = &self.weights[ctx * self.input_count..(ctx + 1) * self.input_count];
        let sum: i64 = self.inputs.iter().zip(w).map(|(&x, &w)| i64::from(x) * i64::from(w)).sum();
        let dp = ((sum >> 16) * i64::from(self.scale)) >> 10;
        dp.clamp(-i64::from(ST_MAX), i64::from(ST_MAX)) as i32
    }

    fn train(&mut self, ctx: usize, err: i32) {
        let w = &mut self.weights[ctx * self.input_count..(ctx + 1) * self.input_count];
        for (w, &x) in w.iter_mut().zip(&self.inputs) {
            *w = (*w + ((x * err + (1 << 13)) >> 14)).clamp(-MAX_WEIGHT, MAX_WEIGHT - 1);
        }
    }

    /// Mixed 12-bit probability of a 1
    pub fn p(&mut self) -> u16 {
        debug_assert_eq!(self.inputs.len(), self.input_count, "models added the wrong number of inputs");
        if self.selected.is_empty() {
            self.selected.push(0);
        }
        self.outputs.clear();
        for i in 0..self.selected.len() {
            let dp = self.dot(self.selected[i]);
            self.outputs.push((squash(dp), dp));
        }
        match self.final_layer.as_deref_mut() {
            Some(m) => {
                for i in 0..m.input_count {
                    m.add(self.outputs.get(i).map_or(0, |o| o.1));
                }
                m.set(0, 1);
                m.p()
            }
            None => self.outputs[0].0 as u16,
        }
    }

    pub fn update(&mut self, bit: u8) {
        let y = i32::from(bit) << 12;
        for i in 0..self.selected.len() {
            let err = (y - self.outputs[i].0) * self.lr;
            self.train(self.selected[i], err);
        }
        if let Some(m) = self.final_layer.as_deref_mut() {
            m.update(bit);
        }
        self.inputs.clear();
        self.selected.clear();
        self.outputs.clear();
        self.base = 0;
    }
}

impl Mixer for LogisticMixer {
    #[inline]
    fn add(&mut self, x: i32) {
        debug_assert!(self.inputs.len() < self.input_count, "more mixer inputs than declared");
        self.inputs.push(x);
    }

    fn set(&mut self, ctx: u32, range: u32) {
        debug_assert!(ctx < range && self.base + range as usize <= self.contexts);
        debug_assert!(self.selected.len() < self.max_selected);
        self.selected.push(self.base + ctx as usize);
        self.base += range as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logistic::stretch;

    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1103515245).wrapping_add(12345) & 0x7fff_ffff;
        *seed >> 16
    }

    #[test]
    fn learns_a_certain_input() {
        let mut m = LogisticMixer::new(1, 1, 1);
        let mut p = 0;
        for _ in 0..10_000 {
            m.add(stretch(4095));
            m.set(0, 1);
            p = m.p();
            m.update(1);
        }
        assert!(m.weight(0, 0) > 0);
        assert!(p > 4000, "{p}");
    }

    #[test]
    fn untrained_mixer_is_neutral() {
        let mut m = LogisticMixer::new(3, 4, 1);
        for x in [100, -2047, 900] {
            m.add(x);
        }
        m.set(2, 4);
        assert!((i32::from(m.p()) - 2048).abs() <= 1);
    }

    #[test]
    fn converges_to_source_probability() {
        for q in [410u32, 3277, 3900] {
            let mut m = LogisticMixer::new(1, 1, 1);
            let mut seed = 12345;
            let mut errors = Vec::new();
            for _ in 0..20_000 {
                let y = u8::from((lcg(&mut seed) & 4095) < q);
                m.add(256);
                m.set(0, 1);
                errors.push((i64::from(m.p()) - i64::from(q)).abs());
                m.update(y);
            }
            let early = errors[..500].iter().sum::<i64>() / 500;
            let late = errors[errors.len() - 2000..].iter().sum::<i64>() / 2000;
            assert!(late < early, "q={q}: {early} -> {late}");
            assert!(late < 100, "q={q}: {late}");
        }
    }

    #[test]
    fn scale_factor_sharpens_output() {
        let mut unit = LogisticMixer::new(1, 1, 1);
        let mut sharp = LogisticMixer::new(1, 1, 1);
        sharp.set_scale_factor(2 * UNIT_SCALE);
        for _ in 0..200 {
            for m in [&mut unit, &mut sharp] {
                m.add(300);
                m.set(0, 1);
                m.p();
                m.update(1);
            }
        }
        // the doubled gain acts like a doubled learning rate on a single input
        unit.add(300);
        unit.set(0, 1);
        sharp.add(300);
        sharp.set(0, 1);
        let (pa, pb) = (i32::from(unit.p()), i32::from(sharp.p()));
        assert!(pb > pa && pa > 2048, "{pa} {pb}");
    }

    #[test]
    fn weight_sets_are_independent() {
        let mut m = LogisticMixer::new(1, 2, 1);
        for i in 0..4000 {
            let ctx = i & 1;
            m.add(512);
            m.set(ctx, 2);
            m.p();
            m.update(ctx as u8);
        }
        assert!(m.weight(1, 0) > 0);
        assert!(m.weight(0, 0) < 0);
    }

    #[test]
    fn two_layers_follow_the_informed_set() {
        let mut m = LogisticMixer::new(2, 2 + 8, 2);
        let mut p = 0;
        for i in 0..5000u32 {
            m.add(1024);
            m.add(-300);
            m.set(0, 2);
            m.set(i % 8, 8);
            p = m.p();
            m.update(1);
        }
        assert!(p > 3800, "{p}");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "more mixer inputs than declared")]
    fn rejects_extra_inputs() {
        let mut m = LogisticMixer::new(2, 1, 1);
        m.add(1);
        m.add(2);
        m.add(3);
    }
}
