//! Bounds-checked little-endian reads over an immutable buffer.

use crate::error::{DecodeError, DecodeResult};
use bytes::Bytes;

/// Read cursor over an immutable byte buffer.
///
/// Every read either advances the position by exactly the number of bytes it
/// consumed or fails with `OutOfBounds` and leaves the position untouched.
/// Slice reads return `Bytes` views that share the underlying buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Creates a cursor at position 0
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer itself is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Moves to an absolute position within `[0, len]`
    pub fn seek(&mut self, pos: usize) -> DecodeResult<()> {
        if pos > self.data.len() {
            return Err(DecodeError::out_of_bounds(
                pos - self.pos.min(pos),
                self.remaining(),
                self.pos,
            ));
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips `n` bytes forward
    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Reads exactly `n` bytes without copying
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<Bytes> {
        self.ensure(n)?;
        let slice = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(slice)
    }

    /// Reads everything from the current position to the end
    pub fn read_remaining(&mut self) -> Bytes {
        let slice = self.data.slice(self.pos..);
        self.pos = self.data.len();
        slice
    }

    /// Returns the next `N` bytes without consuming them
    pub fn peek_array<const N: usize>(&self) -> DecodeResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        Ok(out)
    }

    /// Reads a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let out = self.peek_array::<N>()?;
        self.pos += N;
        Ok(out)
    }

    /// Reads an unsigned byte
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a signed byte (two's complement)
    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u16`
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i16`
    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u32`
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i32`
    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `f32`
    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `f64`
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Rewinds to a position this cursor has already passed
    pub(crate) fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.pos);
        self.pos = pos.min(self.pos);
    }

    fn ensure(&self, n: usize) -> DecodeResult<()> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(DecodeError::out_of_bounds(n, self.remaining(), self.pos)),
        }
    }
}
