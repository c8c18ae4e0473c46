//! Crate error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("compression level {0} is out of range 0..=9")]
    InvalidLevel(u8),

    /// A table was sized to zero or to a non power of two.
    #[error("{what} table size {size} is not a nonzero power of two")]
    TableSize { what: &'static str, size: usize },

    #[error("context map asked for {count} contexts, at most {max} are supported")]
    TooManyContexts { count: usize, max: usize },

    #[error("not a ctxmix archive")]
    BadMagic,

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u8),

    #[error("archive is truncated")]
    Truncated,

    #[error("restored data differs from the original at byte {pos}")]
    Verify { pos: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
