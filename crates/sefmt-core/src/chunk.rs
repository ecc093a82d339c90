//! Tagged chunk dispatch.
//!
//! A chunk is a 4-byte ASCII tag followed by a body whose shape depends on the
//! tag. Each container declares its tag set as a closed enum implementing
//! [`ChunkKind`]; [`read_chunk`] reads the tag, resolves it and runs the body
//! decoder. The resulting record always has a `type` field and, unless the
//! body decoder declines, a `body` field.

use crate::error::{DecodeError, DecodeResult, ResultExt};
use crate::stream::{read_tag, ByteCursor};
use crate::value::{Record, Value};
use tracing::{trace, warn};

/// The closed set of tags a container understands
pub trait ChunkKind: Copy {
    /// Name of the container, used in diagnostics
    const CONTAINER: &'static str;

    /// Resolves a raw tag
    fn from_tag(tag: &[u8]) -> Option<Self>;
}

/// What to do with a tag the container does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownTag {
    /// Log a warning and record an empty body; the next chunk starts right
    /// after the tag
    Empty,
    /// Fail with `UnknownChunkTag`
    Fatal,
}

/// Reads one chunk.
///
/// `body` receives the resolved kind and returns the body value, or `None`
/// for tags that carry no body (sequence terminators).
pub fn read_chunk<K, F>(cur: &mut ByteCursor, unknown: UnknownTag, body: F) -> DecodeResult<Record>
where
    K: ChunkKind,
    F: FnOnce(K, &mut ByteCursor) -> DecodeResult<Option<Value>>,
{
    let offset = cur.position();
    let tag = read_tag(cur).at("type")?;
    let mut chunk = Record::new();

    match K::from_tag(tag.bytes()) {
        Some(kind) => {
            trace!(container = K::CONTAINER, tag = tag.as_str(), offset, "chunk");
            let value = body(kind, cur).at("body")?;
            chunk.insert("type", tag);
            if let Some(value) = value {
                chunk.insert("body", value);
            }
        }
        None => match unknown {
            UnknownTag::Empty => {
                warn!(
                    container = K::CONTAINER,
                    tag = tag.as_str(),
                    offset,
                    "unknown chunk tag, body left empty"
                );
                chunk.insert("type", tag);
                chunk.insert("body", Value::Empty);
            }
            UnknownTag::Fatal => {
                cur.rewind(offset);
                return Err(DecodeError::unknown_chunk_tag(tag.as_str(), offset));
            }
        },
    }

    Ok(chunk)
}

/// Whether a decoded chunk record carries the given tag
pub fn has_type(chunk: &Record, tag: &str) -> bool {
    chunk.get_str("type") == Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::stream::FixtureWriter;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestChunk {
        Number,
        End,
    }

    impl ChunkKind for TestChunk {
        const CONTAINER: &'static str = "test";

        fn from_tag(tag: &[u8]) -> Option<Self> {
            match tag {
                b"NUMB" => Some(Self::Number),
                b"TEND" => Some(Self::End),
                _ => None,
            }
        }
    }

    fn body(kind: TestChunk, cur: &mut ByteCursor) -> DecodeResult<Option<Value>> {
        match kind {
            TestChunk::Number => Ok(Some(cur.read_u32()?.into())),
            TestChunk::End => Ok(None),
        }
    }

    #[test]
    fn test_known_chunk() {
        let data = FixtureWriter::new().tag("NUMB").u32(7).finish();
        let mut cur = ByteCursor::new(data);
        let chunk = read_chunk(&mut cur, UnknownTag::Fatal, body).unwrap();
        assert!(has_type(&chunk, "NUMB"));
        assert_eq!(chunk.get_u32("body"), Some(7));
        assert!(cur.is_at_end());
    }

    #[test]
    fn test_terminator_has_no_body() {
        let mut cur = ByteCursor::new(FixtureWriter::new().tag("TEND").finish());
        let chunk = read_chunk(&mut cur, UnknownTag::Fatal, body).unwrap();
        assert!(has_type(&chunk, "TEND"));
        assert!(!chunk.contains("body"));
    }

    #[test]
    fn test_unknown_chunk_policies() {
        let data = FixtureWriter::new().tag("ZZZZ").u32(1).finish();

        let mut cur = ByteCursor::new(data.clone());
        let chunk = read_chunk(&mut cur, UnknownTag::Empty, body).unwrap();
        assert!(chunk.get("body").is_some_and(Value::is_empty_body));
        assert_eq!(cur.position(), 4);

        let mut cur = ByteCursor::new(data);
        let err = read_chunk(&mut cur, UnknownTag::Fatal, body).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnknownChunkTag {
                tag: "ZZZZ".to_string()
            }
        );
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_body_error_path() {
        let mut cur = ByteCursor::new(FixtureWriter::new().tag("NUMB").u16(1).finish());
        let err = read_chunk(&mut cur, UnknownTag::Fatal, body).unwrap_err();
        assert_eq!(err.path(), "body");
        assert_eq!(err.offset(), 4);
    }
}
