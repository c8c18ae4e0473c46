use crate::error::{Error, Result};

pub const MAX_LEVEL: u8 = 9;

/// Everything the decoder must know to rebuild the encoder's models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Memory level, tables grow by a factor of two per level
    pub level: u8,
    /// Run length inputs of the context maps
    pub run_stats: bool,
    /// Byte history inputs of the context maps
    pub byte_history: bool,
    pub dmc: bool,
    pub sparse: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { level: 4, run_stats: true, byte_history: true, dmc: true, sparse: true }
    }
}

impl Config {
    pub fn with_level(level: u8) -> Result<Self> {
        let config = Self { level, ..Self::default() };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.level > MAX_LEVEL {
            return Err(Error::InvalidLevel(self.level));
        }
        Ok(())
    }

    /// Sizing unit in bytes
    pub fn mem(&self) -> usize {
        65536 << self.level
    }

    pub fn flags(&self) -> u8 {
        u8::from(self.run_stats)
            | u8::from(self.byte_history) << 1
            | u8::from(self.dmc) << 2
            | u8::from(self.sparse) << 3
    }

    pub fn from_parts(level: u8, flags: u8) -> Result<Self> {
        let config = Self {
            level,
            run_stats: flags & 1 != 0,
            byte_history: flags & 2 != 0,
            dmc: flags & 4 != 0,
            sparse: flags & 8 != 0,
        };
        config.validate()?;
        Ok(config)
    }
}
