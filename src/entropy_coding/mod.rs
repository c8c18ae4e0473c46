pub mod io;

use std::io::Result;

const TOP_SHIFT: u32 = u32::BITS - u8::BITS; // 24
const TOP_MASK: u32 = 0xff << TOP_SHIFT; // 0xFF000000, leading byte of the range
const PROB_BITS: u32 = 12;

/// The `ArithmeticCoder` encodes/decodes bits given a 12-bit probability that the bit is 1.
///
/// Carry-less binary range coder: the interval `[x1, x2]` narrows on every bit and
/// leading bytes are shifted out as soon as `x1` and `x2` agree on them.
pub struct ArithmeticCoder<T> {
    x1: u32, // low
    x2: u32, // high
    x: u32,  // state (decoder only)
    io: T,   // byte reader/writer
}

pub trait ACRead {
    /// Read a byte or 0 on EOF
    fn read_byte(&mut self) -> Result<u8>;
    /// Read 4 bytes BE as u32 and pad with 0s on EOF
    fn read_u32(&mut self) -> Result<u32> {
        let bytes = [self.read_byte()?, self.read_byte()?, self.read_byte()?, self.read_byte()?];
        Ok(u32::from_be_bytes(bytes))
    }
}

pub trait ACWrite {
    /// Writes one settled byte of the range
    fn write_byte(&mut self, byte: u8) -> Result<()>;
    /// Flushes the internal writer
    fn flush(&mut self) -> Result<()>;
}

impl<T> ArithmeticCoder<T> {
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<W: ACWrite> ArithmeticCoder<W> {
    pub fn new_coder(writer: W) -> Self {
        Self { io: writer, x1: 0, x2: u32::MAX, x: 0 }
    }

    pub fn encode(&mut self, bit: u8, prob: u16) -> Result<()> {
        debug_assert!(bit <= 1, "Tried to encode invalid bit");
        let xmid = lerp(self.x1, self.x2, prob);

        // Update range (kinda like binary search)
        match bit {
            0 => self.x1 = xmid + 1,
            _ => self.x2 = xmid,
        }

        // Renormalize range -> write matching leading bytes to stream
        while ((self.x1 ^ self.x2) & TOP_MASK) == 0 {
            self.io.write_byte((self.x2 >> TOP_SHIFT) as u8)?;
            self.x1 <<= 8;
            self.x2 = (self.x2 << 8) | 0xff;
        }

        Ok(())
    }

    /// Writes the single byte that disambiguates the final range.
    /// Must be called exactly once, after the last `encode`.
    pub fn flush(&mut self) -> Result<()> {
        // leading bytes differ, so this can't overflow and lands inside (x1, x2]
        debug_assert!(self.x1 >> TOP_SHIFT < self.x2 >> TOP_SHIFT);
        self.io.write_byte((self.x1 >> TOP_SHIFT) as u8 + 1)?;
        self.io.flush()
    }
}

impl<R: ACRead> ArithmeticCoder<R> {
    pub fn new_decoder(mut reader: R) -> Result<Self> {
        let x = reader.read_u32()?;
        Ok(Self { io: reader, x1: 0, x2: u32::MAX, x })
    }

    pub fn decode(&mut self, prob: u16) -> Result<u8> {
        let xmid = lerp(self.x1, self.x2, prob);
        let bit = (self.x <= xmid).into();

        // Update range (kinda like binary search)
        match bit {
            0 => self.x1 = xmid + 1,
            _ => self.x2 = xmid,
        }

        // Renormalize range -> read new bytes from stream
        while ((self.x1 ^ self.x2) & TOP_MASK) == 0 {
            self.x1 <<= 8;
            self.x2 = (self.x2 << 8) | 0xff;
            self.x = (self.x << 8) | u32::from(self.io.read_byte()?);
        }

        Ok(bit)
    }
}

#[inline(always)]
fn lerp(x1: u32, x2: u32, prob: u16) -> u32 {
    debug_assert!(u32::from(prob) < 1 << PROB_BITS, "Probability must be 12-bit");
    // (x2 - x1) >> 12 times p < 4096 can't reach x2, so both halves stay non-empty
    let xmid = x1 + ((x2 - x1) >> PROB_BITS) * u32::from(prob);
    debug_assert!(xmid >= x1 && xmid < x2);
    xmid
}
