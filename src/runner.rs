//! Archive framing around the coded bit stream.
//!
//! Layout: magic `CXM1`, version, level, flags, original length (u64 BE), coded stream.

use std::io::{ErrorKind, Read, Write};

use crate::config::Config;
use crate::entropy_coding::{
    io::{ACReader, ACWriter},
    ACWrite, ArithmeticCoder,
};
use crate::error::{Error, Result};
use crate::predictor::Predictor;
use crate::{unroll_collect, unroll_for};

pub const MAGIC: [u8; 4] = *b"CXM1";
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = MAGIC.len() + 3 + 8;

/// Header fields of an archive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub config: Config,
    pub len: u64,
}

impl Header {
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[VERSION, self.config.level, self.config.flags()])?;
        writer.write_all(&self.len.to_be_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0; HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(err),
        })?;
        if buf[..4] != MAGIC {
            return Err(Error::BadMagic);
        }
        if buf[4] != VERSION {
            return Err(Error::UnsupportedVersion(buf[4]));
        }
        let config = Config::from_parts(buf[5], buf[6])?;
        let mut len = [0; 8];
        len.copy_from_slice(&buf[7..]);
        Ok(Self { config, len: u64::from_be_bytes(len) })
    }
}

/// Codes `bytes` with a fresh predictor into `writer`, which is returned when done.
pub fn encode_with<W: ACWrite>(bytes: impl IntoIterator<Item = std::io::Result<u8>>, writer: W, config: &Config) -> Result<W> {
    let mut predictor = Predictor::new(config)?;
    let mut ac = ArithmeticCoder::new_coder(writer);
    for byte in bytes {
        let byte = byte?;
        unroll_for!(bit in byte, {
            ac.encode(bit, predictor.p())?;
            predictor.update(bit);
        });
    }
    ac.flush()?;
    Ok(ac.into_inner())
}

/// Writes an archive of the `len` bytes of `reader`.
pub fn encode<R: Read, W: Write>(reader: R, len: u64, mut writer: W, config: &Config) -> Result<W> {
    config.validate()?;
    Header { config: *config, len }.write(&mut writer)?;
    let mut read = 0;
    let bytes = reader.take(len).bytes().inspect(|_| read += 1);
    let writer = encode_with(bytes, ACWriter::new(writer), config)?;
    if read != len {
        return Err(Error::Truncated);
    }
    Ok(writer.into_inner())
}

/// Restores an archive into `writer`, returns the number of bytes written.
/// A corrupted stream decodes to garbage rather than failing.
pub fn decode<R: Read, W: Write>(mut reader: R, mut writer: W) -> Result<u64> {
    let header = Header::read(&mut reader)?;
    let mut predictor = Predictor::new(&header.config)?;
    let mut ac = ArithmeticCoder::new_decoder(ACReader::new(reader))?;
    for _ in 0..header.len {
        unroll_collect!(bit into byte, {
            bit = ac.decode(predictor.p())?;
            predictor.update(bit);
        });
        writer.write_all(&[byte])?;
    }
    writer.flush()?;
    Ok(header.len)
}

pub fn compress(data: &[u8], config: &Config) -> Result<Vec<u8>> {
    let out = Vec::with_capacity(HEADER_SIZE + data.len() / 2);
    encode(data, data.len() as u64, out, config)
}

pub fn decompress(archive: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decode(archive, &mut out)?;
    Ok(out)
}
