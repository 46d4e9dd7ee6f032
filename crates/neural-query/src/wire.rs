//! Binary wire form for passing query nodes between processes.
//!
//! Wire format: strings are `[u32 BE length][UTF-8 bytes]`, integers are
//! `u32 BE`, floats are `f32 BE`. Lists are a `u32 BE` count followed by the
//! items. Reads are bounds-checked and fail with [`Error::Wire`].
//!
//! Writer and reader share [`MAX_ITEM_LEN`]: anything the writer accepts,
//! the reader decodes. Compound queries may nest at most [`MAX_DEPTH`]
//! levels deep.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use neural_core::{Error, Result};

/// Maximum length of a single string (in bytes) or list: 16 MiB.
pub const MAX_ITEM_LEN: u32 = 16 * 1024 * 1024;

/// Maximum nesting of compound queries.
pub const MAX_DEPTH: usize = 64;

fn checked_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|len| *len <= MAX_ITEM_LEN)
        .ok_or_else(|| Error::wire(format!("{what} too large: {len} (max {MAX_ITEM_LEN})")))
}

/// Append-only writer for the wire form.
#[derive(Debug, Default)]
pub struct StreamOutput {
    buf: BytesMut,
}

impl StreamOutput {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.buf.put_u32(checked_len(value.len(), "string length")?);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Write a list count.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        self.buf.put_u32(checked_len(count, "list length")?);
        Ok(())
    }

    /// Write an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Write a count-prefixed float vector.
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        self.buf.put_u32(checked_len(values.len(), "vector length")?);
        for value in values {
            self.buf.put_f32(*value);
        }
        Ok(())
    }

    /// Finish writing and return the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked reader over an encoded buffer.
#[derive(Debug)]
pub struct StreamInput<'a> {
    buf: &'a [u8],
    depth: usize,
}

impl<'a> StreamInput<'a> {
    /// Read from `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, depth: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(Error::wire(format!(
                "truncated input reading {what}: need {needed} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        self.ensure(4, what)?;
        let len = self.buf.get_u32();
        if len > MAX_ITEM_LEN {
            return Err(Error::wire(format!(
                "{what} too large: {len} (max {MAX_ITEM_LEN})"
            )));
        }
        Ok(len as usize)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len("string length")?;
        self.ensure(len, "string bytes")?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        String::from_utf8(bytes).map_err(|e| Error::wire(format!("invalid UTF-8: {e}")))
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4, "u32")?;
        Ok(self.buf.get_u32())
    }

    /// Read a count-prefixed float vector.
    pub fn read_f32_vec(&mut self) -> Result<Vec<f32>> {
        let len = self.read_len("vector length")?;
        self.ensure(len * 4, "vector data")?;
        Ok((0..len).map(|_| self.buf.get_f32()).collect())
    }

    /// Enter a compound query, failing past [`MAX_DEPTH`] levels.
    pub fn enter_nested(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::wire(format!(
                "queries nested deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a compound query entered with [`StreamInput::enter_nested`].
    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(Error::wire(format!(
                "{} trailing bytes after query",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}
