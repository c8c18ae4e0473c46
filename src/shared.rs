const DEFAULT_HISTORY: usize = 1 << 16;

/// Bit and byte context of the stream being coded, owned by the predictor.
///
/// Updated once per bit, before any model sees that bit.
pub struct Shared {
    /// Last coded bit
    pub y: u8,
    /// Partial byte with a leading 1, in 1..=255
    pub c0: u32,
    /// Last whole byte
    pub c1: u8,
    /// Last 4 whole bytes, most recent in the low byte
    pub c4: u32,
    /// The 4 bytes before `c4`
    pub c8: u32,
    /// Bits of the current byte seen so far, 0..=7
    pub bit_position: u8,
    history: Vec<u8>,
    mask: usize,
    pos: usize,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Keeps the last `size` bytes, a power of two
    pub fn with_history(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self { y: 0, c0: 1, c1: 0, c4: 0, c8: 0, bit_position: 0, history: vec![0; size], mask: size - 1, pos: 0 }
    }

    pub fn update(&mut self, bit: u8) {
        debug_assert!(bit <= 1);
        self.y = bit;
        self.c0 += self.c0 + u32::from(bit);
        self.bit_position = (self.bit_position + 1) & 7;
        if self.bit_position == 0 {
            self.c1 = self.c0 as u8;
            self.c8 = (self.c8 << 8) | (self.c4 >> 24);
            self.c4 = (self.c4 << 8) | u32::from(self.c1);
            self.history[self.pos & self.mask] = self.c1;
            self.pos += 1;
            self.c0 = 1;
        }
    }

    /// The `i`-th most recent whole byte, `byte(1) == c1`
    pub fn byte(&self, i: usize) -> u8 {
        debug_assert!(i > 0 && i <= self.mask);
        self.history[self.pos.wrapping_sub(i) & self.mask]
    }

    /// Bytes further back than this have been overwritten
    pub fn window(&self) -> usize {
        self.mask
    }

    /// Number of whole bytes seen
    pub fn bytes_seen(&self) -> usize {
        self.pos
    }
}
