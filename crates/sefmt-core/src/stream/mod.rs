//! Byte-level reading primitives.
//!
//! [`ByteCursor`] does the bounds-checked reads, [`DecodeContext`] gives nested
//! decoders read access to their ancestors, and the [`repeat`] policies cover
//! the three ways the formats express lists. The free functions here read the
//! small composite fields every format shares: magic tags, length-prefixed
//! strings, float triples and transforms.

mod context;
mod cursor;
pub mod repeat;

pub use context::DecodeContext;
pub use cursor::ByteCursor;
pub use repeat::{check_count, counted, until, until_eof};

use crate::error::{DecodeError, DecodeResult};
use crate::value::{ascii_view, BitFlags, FlagSchema, Matrix12, QuatVect, Text, Vector3};

/// Encoded size of a `u32` length prefix, the smallest possible string
pub const CTSTRING_MIN: usize = 4;
/// Encoded size of three `f32`s
pub const FLOAT3_SIZE: usize = 12;
/// Encoded size of a 3×4 transform
pub const MATRIX12_SIZE: usize = 48;
/// Encoded size of a position plus quaternion
pub const QVECT_SIZE: usize = 28;

/// Reads `expected.len()` bytes and checks them against `expected`.
///
/// On mismatch the cursor is left where the magic started and the error offset
/// points there too.
pub fn expect_magic(cur: &mut ByteCursor, expected: &'static str) -> DecodeResult<Text> {
    let offset = cur.position();
    let bytes = cur.read_bytes(expected.len())?;
    if bytes.as_ref() != expected.as_bytes() {
        cur.rewind(offset);
        return Err(DecodeError::bad_magic(expected, ascii_view(&bytes), offset));
    }
    Ok(Text::new(bytes, offset))
}

/// Reads a 4-byte chunk tag
pub fn read_tag(cur: &mut ByteCursor) -> DecodeResult<Text> {
    read_text(cur, 4)
}

/// Reads `len` bytes as text
pub fn read_text(cur: &mut ByteCursor, len: usize) -> DecodeResult<Text> {
    let offset = cur.position();
    let bytes = cur.read_bytes(len)?;
    Ok(Text::new(bytes, offset))
}

/// Reads a `u32` length followed by that many bytes of text
pub fn read_ctstring(cur: &mut ByteCursor) -> DecodeResult<Text> {
    let start = cur.position();
    let len = cur.read_u32()?;
    read_text(cur, len as usize).map_err(|err| {
        cur.rewind(start);
        err
    })
}

/// Reads three `f32`s
pub fn read_float3(cur: &mut ByteCursor) -> DecodeResult<Vector3> {
    let data: [u8; FLOAT3_SIZE] = cur.read_array()?;
    let f = |i: usize| f32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    Ok(Vector3::new(f(0), f(4), f(8)))
}

/// Reads twelve `f32`s
pub fn read_matrix12(cur: &mut ByteCursor) -> DecodeResult<Matrix12> {
    let data: [u8; MATRIX12_SIZE] = cur.read_array()?;
    let mut out = [0f32; 12];
    for (value, chunk) in out.iter_mut().zip(data.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(Matrix12(out))
}

/// Reads a position followed by a `w, x, y, z` quaternion
pub fn read_qvect(cur: &mut ByteCursor) -> DecodeResult<QuatVect> {
    let data: [u8; QVECT_SIZE] = cur.read_array()?;
    let f = |i: usize| f32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    Ok(QuatVect {
        pos: Vector3::new(f(0), f(4), f(8)),
        w: f(12),
        x: f(16),
        y: f(20),
        z: f(24),
    })
}

/// Reads a `u32` flags word with the given bit names
pub fn read_flags(cur: &mut ByteCursor, schema: FlagSchema) -> DecodeResult<BitFlags> {
    Ok(BitFlags::new(cur.read_u32()?, schema))
}

#[cfg(test)]
pub(crate) use fixture::FixtureWriter;
