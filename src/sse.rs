use crate::counters::Apm;
use crate::hash;
use crate::shared::Shared;
use crate::u16;

/// Final calibration of the mixer output by three APMs of growing order.
pub struct Sse {
    order0: Apm,
    order1: Apm,
    order2: Apm,
}

impl Default for Sse {
    fn default() -> Self {
        Self::new()
    }
}

impl Sse {
    pub fn new() -> Self {
        Self { order0: Apm::new(256, 7), order1: Apm::new(1 << 16, 7), order2: Apm::new(1 << 16, 7) }
    }

    /// Refined probability, always in `1..=4094`
    pub fn p(&mut self, pr: u16, shared: &Shared) -> u16 {
        let c0 = shared.c0 as usize;
        let a0 = u32::from(self.order0.p(pr, c0));
        let a1 = u32::from(self.order1.p(pr, c0 | usize::from(shared.c1) << 8));
        let h = hash::hash(&[u64::from(shared.c4 & 0xffff), c0 as u64]);
        let a2 = u32::from(self.order2.p(pr, (h >> 48) as usize));
        let p = (2 * u32::from(pr) + a0 + 2 * a1 + 3 * a2 + 4) >> 3;
        u16!(p.clamp(1, 4094))
    }

    pub fn update(&mut self, bit: u8) {
        self.order0.update(bit);
        self.order1.update(bit);
        self.order2.update(bit);
    }
}
