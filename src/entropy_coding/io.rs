use core::slice::from_mut as into_slice;
use std::io::{self, ErrorKind, Read, Write};

use super::{ACRead, ACWrite};

/// Arithmetic coder read io for `io::Read` types
pub struct ACReader<R> {
    inner: R,
}

impl<R: Read> ACReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ACRead for ACReader<R> {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = 0;
        let result = self.inner.read_exact(into_slice(&mut byte));

        match result {
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(0),
            _ => result.map(|_| byte),
        }
    }
}

/// Arithmetic coder write io for `io::Write` types
pub struct ACWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> ACWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes handed to the inner writer so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ACWrite for ACWriter<W> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
