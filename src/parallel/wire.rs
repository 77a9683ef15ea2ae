//! Wire format helpers.
//!
//! All exchanged buffers are count-prefixed record streams with fixed-width
//! little-endian fields. Reads are checked: a truncated buffer is a fatal
//! communication error, never a panic.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{EngineError, Result};

/// Append-only record writer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Checked record reader over a received buffer.
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(EngineError::comm(format!(
                "truncated record stream: need {} bytes, {} left",
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut w = WireWriter::new();
        w.put_u64(3);
        w.put_i64(-42);
        w.put_f64(1.5);
        w.put_u8(2);
        let data = w.into_vec();

        let mut r = WireReader::new(&data);
        assert_eq!(r.get_u64().unwrap(), 3);
        assert_eq!(r.get_i64().unwrap(), -42);
        assert_eq!(r.get_f64().unwrap(), 1.5);
        assert_eq!(r.get_u8().unwrap(), 2);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_is_an_error() {
        let mut w = WireWriter::new();
        w.put_u32(7);
        let data = w.into_vec();

        let mut r = WireReader::new(&data);
        assert!(r.get_u64().is_err());
    }
}
