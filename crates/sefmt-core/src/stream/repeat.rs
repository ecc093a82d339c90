//! Repetition policies shared by every decoder.
//!
//! - [`counted`]: a known element count, validated against the stream before
//!   anything is allocated.
//! - [`until_eof`]: elements until the stream runs out; a partial trailing
//!   element ends the list quietly.
//! - [`until`]: at least one element, then more until a predicate over the
//!   last element holds.

use super::ByteCursor;
use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeResult, ResultExt};
use crate::value::Value;
use tracing::debug;

/// Validates a declared element count.
///
/// Fails with `CountLimit` above `config.max_elements` and with `InvalidCount`
/// when `count * element_size` exceeds the bytes left in `cur`.
pub fn check_count(
    cur: &ByteCursor,
    config: &DecoderConfig,
    count: u64,
    element_size: usize,
) -> DecodeResult<usize> {
    let offset = cur.position();
    if count > config.max_elements as u64 {
        return Err(DecodeError::count_limit(count, config.max_elements, offset));
    }
    let fits = count
        .checked_mul(element_size as u64)
        .is_some_and(|needed| needed <= cur.remaining() as u64);
    if !fits {
        return Err(DecodeError::invalid_count(
            count,
            element_size,
            cur.remaining(),
            offset,
        ));
    }
    usize::try_from(count)
        .map_err(|_| DecodeError::invalid_count(count, element_size, cur.remaining(), offset))
}

/// Decodes exactly `count` elements.
///
/// `element_size` is the smallest encoded size of one element and feeds the
/// up-front [`check_count`] guard. Errors carry the element index.
pub fn counted<T, F>(
    cur: &mut ByteCursor,
    config: &DecoderConfig,
    count: impl Into<u64>,
    element_size: usize,
    mut element: F,
) -> DecodeResult<Vec<Value>>
where
    T: Into<Value>,
    F: FnMut(&mut ByteCursor) -> DecodeResult<T>,
{
    let count = check_count(cur, config, count.into(), element_size)?;
    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        items.push(element(cur).at_index(index)?.into());
    }
    Ok(items)
}

/// Decodes elements until the stream is exhausted or `done` holds for the
/// element just decoded.
///
/// An element that fails to decode ends the list: the cursor is moved back to
/// where that element started and everything decoded before it is returned.
pub fn until_eof<T, F, P>(cur: &mut ByteCursor, mut element: F, mut done: P) -> Vec<Value>
where
    T: Into<Value>,
    F: FnMut(&mut ByteCursor) -> DecodeResult<T>,
    P: FnMut(&T) -> bool,
{
    let mut items = Vec::new();
    while !cur.is_at_end() {
        let start = cur.position();
        match element(cur) {
            Ok(item) => {
                let finished = done(&item);
                items.push(item.into());
                // an element that consumes nothing would repeat forever
                if finished || cur.position() == start {
                    break;
                }
            }
            Err(err) => {
                debug!(
                    offset = start,
                    decoded = items.len(),
                    error = %err,
                    "discarding partial trailing element"
                );
                cur.rewind(start);
                break;
            }
        }
    }
    items
}

/// Decodes at least one element, continuing until `done` holds for the
/// element just decoded.
///
/// Running out of input before `done` holds fails with `Truncated`, naming
/// `terminator` as what the stream was expected to contain.
pub fn until<T, F, P>(
    cur: &mut ByteCursor,
    terminator: &'static str,
    mut element: F,
    mut done: P,
) -> DecodeResult<Vec<Value>>
where
    T: Into<Value>,
    F: FnMut(&mut ByteCursor) -> DecodeResult<T>,
    P: FnMut(&T) -> bool,
{
    let mut items = Vec::new();
    loop {
        let item = element(cur).at_index(items.len())?;
        let finished = done(&item);
        items.push(item.into());
        if finished {
            return Ok(items);
        }
        if cur.is_at_end() {
            return Err(DecodeError::truncated(terminator, cur.position()));
        }
    }
}
