use crate::logistic::{squash, stretch};
use crate::u16;

const BUCKETS: usize = 24;

/// Adaptive probability map: refines a probability given a small context.
///
/// The input is stretched and placed between two of 24 buckets per context;
/// the output interpolates their values and the nearer one is trained.
pub struct Apm {
    table: Vec<u16>,
    index: usize,
    rate: u32,
}

impl Apm {
    pub fn new(contexts: usize, rate: u32) -> Self {
        debug_assert!((1..16).contains(&rate));
        let table = (0..contexts * BUCKETS)
            .map(|i| {
                let x = ((i % BUCKETS) as i32 * 2 + 1) * 4096 / (BUCKETS as i32 * 2) - 2048;
                u16!(squash(x) * 16)
            })
            .collect();
        Self { table, index: 0, rate }
    }

    /// Refined 12-bit probability of `p` in context `cx`
    pub fn p(&mut self, p: u16, cx: usize) -> u16 {
        let s = (stretch(i32::from(p)) + 2048) * (BUCKETS as i32 - 1);
        let weight = s & 0xfff;
        let base = cx * BUCKETS + (s >> 12) as usize;
        self.index = base + (weight >> 11) as usize;
        let lo = i32::from(self.table[base]);
        let hi = i32::from(self.table[base + 1]);
        ((lo * (4096 - weight) + hi * weight) >> 16) as u16
    }

    pub fn update(&mut self, bit: u8) {
        let y = i32::from(bit);
        let target = (y << 16) + (y << self.rate) - y - y;
        let t = &mut self.table[self.index];
        *t = (i32::from(*t) + ((target - i32::from(*t)) >> self.rate)) as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_near_identity() {
        let mut apm = Apm::new(4, 7);
        for p in [100u16, 1000, 2048, 3000, 4000] {
            let q = apm.p(p, 2);
            assert!((i32::from(q) - i32::from(p)).abs() < 64, "{p} -> {q}");
        }
    }

    #[test]
    fn learns_per_context() {
        let mut apm = Apm::new(2, 6);
        for _ in 0..2000 {
            apm.p(2048, 0);
            apm.update(1);
            apm.p(2048, 1);
            apm.update(0);
        }
        assert!(apm.p(2048, 0) > 2600);
        assert!(apm.p(2048, 1) < 1500);
    }

    #[test]
    fn stays_in_range() {
        let mut apm = Apm::new(1, 5);
        for i in 0..5000u32 {
            let p = apm.p((i % 4095) as u16 + 1, 0);
            assert!(p < 4096);
            apm.update((i & 1) as u8);
        }
    }
}
