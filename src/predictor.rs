use crate::config::Config;
use crate::error::Result;
use crate::mixers::{LogisticMixer, Mixer};
use crate::models::{Model, ModelSet, NormalModel};
use crate::shared::Shared;
use crate::sse::Sse;
use tracing::debug;

// weight set selectors: known orders, partial byte, last byte
const ORDER_SETS: u32 = NormalModel::CONTEXTS as u32 + 1;
const MIXER_CONTEXTS: usize = ORDER_SETS as usize + 256 + 256;
const MIXER_SELECTED: usize = 3;
// constant input, lets every weight set learn an offset
const BIAS: i32 = 256;

/// Probability of the next bit from all models, mixed and refined.
///
/// Every bit goes through `p`, then `update` with the coded bit.
/// Encoder and decoder build identical predictors from the same config.
pub struct Predictor {
    shared: Shared,
    models: ModelSet,
    mixer: LogisticMixer,
    sse: Sse,
    pr: u16,
}

impl Predictor {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let models = ModelSet::new(config)?;
        let mixer = LogisticMixer::new(1 + models.mixer_inputs(), MIXER_CONTEXTS, MIXER_SELECTED);
        debug!(inputs = mixer.input_count(), contexts = MIXER_CONTEXTS, "mixer ready");
        let shared = Shared::with_history(config.mem());
        let mut predictor = Self { shared, models, mixer, sse: Sse::new(), pr: 2048 };
        predictor.pr = predictor.predict();
        Ok(predictor)
    }

    /// 12-bit probability that the next bit is 1, in `1..=4094`
    pub fn p(&self) -> u16 {
        self.pr
    }

    pub fn update(&mut self, bit: u8) {
        debug_assert!(bit <= 1);
        self.shared.update(bit);
        self.models.update(&self.shared);
        self.mixer.update(bit);
        self.sse.update(bit);
        self.pr = self.predict();
    }

    fn predict(&mut self) -> u16 {
        self.mixer.add(BIAS);
        self.models.mix(&self.shared, &mut self.mixer);
        self.mixer.set(self.models.order() as u32, ORDER_SETS);
        self.mixer.set(self.shared.c0, 256);
        self.mixer.set(u32::from(self.shared.c1), 256);
        let pr = self.mixer.p();
        self.sse.p(pr, &self.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unroll_for;

    fn cost(predictor: &mut Predictor, bytes: &[u8]) -> f64 {
        let mut bits = 0.0;
        for &byte in bytes {
            unroll_for!(bit in byte, {
                let p = f64::from(predictor.p()) / 4096.0;
                bits -= if bit == 1 { p.log2() } else { (1.0 - p).log2() };
                predictor.update(bit);
            });
        }
        bits / 8.0
    }

    #[test]
    fn first_prediction_is_ready() {
        let predictor = Predictor::new(&Config::with_level(0).unwrap()).unwrap();
        assert!((1..=4094).contains(&predictor.p()));
    }

    #[test]
    fn mixer_has_a_bias_input() {
        let mut predictor = Predictor::new(&Config::with_level(0).unwrap()).unwrap();
        assert_eq!(predictor.mixer.input_count(), predictor.models.mixer_inputs() + 1);
        // the inputs added for the next bit fill the mixer exactly
        predictor.update(1);
        assert!((1..=4094).contains(&predictor.p()));
    }

    #[test]
    fn long_repeats_are_nearly_free() {
        let config = Config { level: 0, dmc: false, sparse: false, ..Config::default() };
        let mut predictor = Predictor::new(&config).unwrap();
        let mut seed = 3u32;
        let block: Vec<u8> = (0..2000)
            .map(|_| {
                seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                (seed >> 16) as u8
            })
            .collect();
        let first = cost(&mut predictor, &block);
        let second = cost(&mut predictor, &block);
        assert!(first > 1500.0, "{first}");
        assert!(second < first / 4.0, "{first} -> {second}");
    }

    #[test]
    fn repetition_gets_cheap() {
        let config = Config { level: 0, dmc: false, ..Config::default() };
        let mut predictor = Predictor::new(&config).unwrap();
        let text = b"context mixing compresses repetitive text well. ";
        let first = cost(&mut predictor, text);
        let mut later = 0.0;
        for _ in 0..5 {
            later = cost(&mut predictor, text);
        }
        assert!(later < first / 4.0, "{first} -> {later}");
    }

    #[test]
    fn probabilities_stay_in_bounds() {
        let mut predictor = Predictor::new(&Config::with_level(0).unwrap()).unwrap();
        let mut seed = 1u32;
        for i in 0..4000u32 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let bit = if i < 2000 { 1 } else { (seed >> 30) as u8 & 1 };
            assert!((1..=4094).contains(&predictor.p()));
            predictor.update(bit);
        }
    }
}
