use crate::entropy_coding::ACWrite;
use crate::error::{Error, Result};
use std::io;

/// Coder sink that only counts bytes, for measuring compressed size.
#[derive(Default)]
pub struct ACStats {
    bytes: u64,
}

impl ACStats {
    pub fn new() -> Self {
        Self { bytes: 0 }
    }

    /// Compressed size in bytes, without the archive header
    pub fn result(&self) -> u64 {
        self.bytes
    }
}

impl ACWrite for ACStats {
    fn write_byte(&mut self, _byte: u8) -> io::Result<()> {
        self.bytes += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Position of the first difference between two buffers, if any
pub fn verify(original: &[u8], restored: &[u8]) -> Option<usize> {
    let mismatch = original.iter().zip(restored).position(|(a, b)| a != b);
    match mismatch {
        Some(pos) => Some(pos),
        None if original.len() != restored.len() => Some(original.len().min(restored.len())),
        None => None,
    }
}

/// Fails with the position of the first difference
pub fn check(original: &[u8], restored: &[u8]) -> Result<()> {
    match verify(original, restored) {
        Some(pos) => Err(Error::Verify { pos }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runner::{compress, encode_with, HEADER_SIZE};

    #[test]
    fn stats_match_real_archive() {
        let data = b"abracadabra abracadabra abracadabra";
        let config = Config::with_level(0).unwrap();
        let stats = encode_with(data.iter().map(|&b| Ok(b)), ACStats::new(), &config).unwrap();
        let archive = compress(data, &config).unwrap();
        assert_eq!(stats.result() as usize + HEADER_SIZE, archive.len());
    }

    #[test]
    fn verify_finds_first_difference() {
        assert_eq!(verify(b"abc", b"abc"), None);
        assert_eq!(verify(b"abc", b"abd"), Some(2));
        assert_eq!(verify(b"abc", b"ab"), Some(2));
        assert_eq!(verify(b"", b"x"), Some(0));
    }

    #[test]
    fn check_reports_mismatch_as_error() {
        assert!(check(b"same", b"same").is_ok());
        assert!(matches!(check(b"abcd", b"abXd"), Err(Error::Verify { pos: 2 })));
        assert!(matches!(check(b"abcd", b"abc"), Err(Error::Verify { pos: 3 })));
    }
}
