//! XDR primitives (RFC 4506): big-endian, 4-byte aligned

use crate::error::ViewerError;

pub trait WriteXdr {
    fn write_xdr(&self, w: &mut XdrWriter);

    fn to_xdr(&self) -> Vec<u8> {
        let mut w = XdrWriter::default();
        self.write_xdr(&mut w);
        w.into_bytes()
    }
}

pub trait ReadXdr: Sized {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, ViewerError>;

    /// Decode a complete value; trailing bytes are an error
    fn from_xdr(bytes: &[u8]) -> Result<Self, ViewerError> {
        let mut r = XdrReader::new(bytes);
        let value = Self::read_xdr(&mut r)?;
        if r.remaining() != 0 {
            return Err(ViewerError::Xdr(format!(
                "{} trailing bytes after value",
                r.remaining()
            )));
        }
        Ok(value)
    }
}

#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(value as u32);
    }

    /// Fixed-length opaque
    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    /// Variable-length opaque or string
    pub fn write_var(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_fixed(bytes);
    }

    fn pad(&mut self, len: usize) {
        let padding = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(padding));
    }
}

#[derive(Debug)]
pub struct XdrReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ViewerError> {
        if self.remaining() < len {
            return Err(ViewerError::Xdr(format!(
                "unexpected end of input at byte {} (wanted {})",
                self.pos, len
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, ViewerError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    pub fn read_i32(&mut self) -> Result<i32, ViewerError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Result<u64, ViewerError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn read_i64(&mut self) -> Result<i64, ViewerError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_bool(&mut self) -> Result<bool, ViewerError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ViewerError::Xdr(format!("invalid bool {}", other))),
        }
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], ViewerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        self.skip_padding(N)?;
        Ok(out)
    }

    pub fn read_var(&mut self, max_len: usize) -> Result<Vec<u8>, ViewerError> {
        let len = self.read_u32()? as usize;
        if len > max_len {
            return Err(ViewerError::Xdr(format!(
                "length {} exceeds limit {}",
                len, max_len
            )));
        }
        let bytes = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(bytes)
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), ViewerError> {
        let padding = (4 - len % 4) % 4;
        if self.take(padding)?.iter().any(|b| *b != 0) {
            return Err(ViewerError::Xdr("non-zero padding".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_opaque_is_padded() {
        let mut w = XdrWriter::default();
        w.write_var(b"hello");
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0]);

        let mut r = XdrReader::new(&bytes);
        assert_eq!(r.read_var(28).unwrap(), b"hello".to_vec());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_limits() {
        let mut w = XdrWriter::default();
        w.write_var(&[1u8; 10]);
        let bytes = w.into_bytes();
        assert!(XdrReader::new(&bytes).read_var(8).is_err());
        assert!(XdrReader::new(&bytes[..6]).read_var(10).is_err());
    }

    #[test]
    fn test_rejects_dirty_padding() {
        let bytes = vec![0, 0, 0, 1, 7, 0, 1, 0];
        assert!(XdrReader::new(&bytes).read_var(4).is_err());
    }

    #[test]
    fn test_integers_are_big_endian() {
        let mut w = XdrWriter::default();
        w.write_i64(-2);
        w.write_u32(0x0102_0304);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..8], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]);
        let mut r = XdrReader::new(&bytes);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
    }
}
