//! Engine-2 metadata (`.tex` and friends).
//!
//! A fixed header holds exactly eight tagged chunks. Unknown tags are kept
//! with an empty body; anything after the eighth chunk is left unread.

use crate::chunk::{read_chunk, ChunkKind, UnknownTag};
use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{counted, expect_magic, read_ctstring, ByteCursor, CTSTRING_MIN};
use crate::value::{Record, Value};

/// Number of chunks in every metadata header
const CHUNK_COUNT: u32 = 8;
const CHUNK_MIN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaChunk {
    Info,
    ResourceFiles,
    Idents,
    ExternalTypes,
    InternalTypes,
    ExternalObjects,
    ObjectTypes,
}

impl ChunkKind for MetaChunk {
    const CONTAINER: &'static str = "metadata";

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"INFO" => Some(MetaChunk::Info),
            b"RFIL" => Some(MetaChunk::ResourceFiles),
            b"IDNT" => Some(MetaChunk::Idents),
            b"EXTY" => Some(MetaChunk::ExternalTypes),
            b"INTY" => Some(MetaChunk::InternalTypes),
            b"EXOB" => Some(MetaChunk::ExternalObjects),
            b"OBTY" | b"EDTY" => Some(MetaChunk::ObjectTypes),
            _ => None,
        }
    }
}

/// Layout of an internal type definition, selected by its `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeDef {
    Simple,
    Array,
    Struct,
    Other,
}

impl From<u32> for TypeDef {
    fn from(value: u32) -> Self {
        match value {
            0 => TypeDef::Simple,
            4 => TypeDef::Array,
            5 => TypeDef::Struct,
            _ => TypeDef::Other,
        }
    }
}

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut header = Record::new()
        .with("magic", expect_magic(cur, "CTSEMETA").at("magic").at("header")?)
        .with("endianess", cur.read_u32().at("endianess").at("header")?)
        .with("metaVersion", cur.read_u32().at("metaVersion").at("header")?)
        .with("versionString", read_ctstring(cur).at("versionString").at("header")?);

    let chunks = counted(cur, config, CHUNK_COUNT, CHUNK_MIN, |cur| {
        read_chunk(cur, UnknownTag::Empty, |kind, cur| {
            chunk_body(kind, cur, config).map(|body| Some(body.into()))
        })
    })
    .at("chunks")
    .at("header")?;
    header.insert("chunks", chunks);
    Ok(Record::new().with("header", header))
}

fn chunk_body(kind: MetaChunk, cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    if kind == MetaChunk::Info {
        return Ok(Record::new()
            .with("isInitialized", cur.read_u32().at("isInitialized")?)
            .with("resourceCount", cur.read_u32().at("resourceCount")?)
            .with("identCount", cur.read_u32().at("identCount")?)
            .with("totalType", cur.read_u32().at("totalType")?)
            .with("totalObjects", cur.read_u32().at("totalObjects")?));
    }

    let count = cur.read_u32().at("count")?;
    let entries = match kind {
        MetaChunk::ResourceFiles => counted(cur, config, count, 8 + CTSTRING_MIN, |cur| {
            Ok(Record::new()
                .with("id", cur.read_u32().at("id")?)
                .with("flags", cur.read_u32().at("flags")?)
                .with("path", read_ctstring(cur).at("path")?))
        }),
        MetaChunk::Idents => counted(cur, config, count, 4 + CTSTRING_MIN, |cur| {
            Ok(Record::new()
                .with("id", cur.read_u32().at("id")?)
                .with("value", read_ctstring(cur).at("value")?))
        }),
        MetaChunk::ExternalTypes => counted(cur, config, count, 4 + CTSTRING_MIN, |cur| {
            Ok(Record::new()
                .with("typeId", cur.read_u32().at("typeId")?)
                .with("identifier", read_ctstring(cur).at("identifier")?))
        }),
        MetaChunk::InternalTypes => counted(cur, config, count, 8 + CTSTRING_MIN + 8, |cur| {
            internal_type(cur, config)
        }),
        MetaChunk::ExternalObjects => counted(cur, config, count, 16, |cur| {
            Ok(Record::new()
                .with("id", cur.read_u32().at("id")?)
                .with("resourceId", cur.read_u32().at("resourceId")?)
                .with("objectId", cur.read_u32().at("objectId")?)
                .with("objectTypeId", cur.read_u32().at("objectTypeId")?))
        }),
        MetaChunk::ObjectTypes => counted(cur, config, count, 8, |cur| {
            Ok(Record::new()
                .with("objectId", cur.read_u32().at("objectId")?)
                .with("typeId", cur.read_u32().at("typeId")?))
        }),
        MetaChunk::Info => Ok(Vec::new()),
    }
    .at("entries")?;

    Ok(Record::new().with("count", count).with("entries", entries))
}

fn internal_type(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut def = Record::new();
    def.insert("magic", expect_magic(cur, "DTTY").at("magic")?);
    def.insert("typeId", cur.read_u32().at("typeId")?);
    def.insert("identifier", read_ctstring(cur).at("identifier")?);
    def.insert("version", cur.read_u32().at("version")?);
    let type_code = cur.read_u32().at("type")?;
    def.insert("type", type_code);

    let data: Value = match TypeDef::from(type_code) {
        TypeDef::Simple => Record::new()
            .with("sizeInBytes", cur.read_u32().at("sizeInBytes").at("data")?)
            .with("endianessSize", cur.read_u32().at("endianessSize").at("data")?)
            .into(),
        TypeDef::Array => array_def(cur, config).at("data")?.into(),
        TypeDef::Struct => struct_def(cur, config).at("data")?.into(),
        TypeDef::Other => cur.read_u32().at("data")?.into(),
    };
    def.insert("data", data);
    Ok(def)
}

fn array_def(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let type_id = cur.read_u32().at("typeId")?;
    let magic = expect_magic(cur, "ADIM").at("magic")?;
    let count = cur.read_u32().at("dimensionCount")?;
    let dimensions = counted(cur, config, count, 4, ByteCursor::read_u32).at("dimensions")?;
    Ok(Record::new()
        .with("typeId", type_id)
        .with("magic", magic)
        .with("dimensionCount", count)
        .with("dimensions", dimensions))
}

fn struct_def(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let parent = cur.read_u32().at("parentTypeId")?;
    let magic = expect_magic(cur, "STMB").at("magic")?;
    let count = cur.read_u32().at("memberCount")?;
    let members = counted(cur, config, count, CTSTRING_MIN + 4, |cur| {
        Ok(Record::new()
            .with("identifier", read_ctstring(cur).at("identifier")?)
            .with("typeId", cur.read_u32().at("typeId")?))
    })
    .at("members")?;
    Ok(Record::new()
        .with("parentTypeId", parent)
        .with("magic", magic)
        .with("memberCount", count)
        .with("members", members))
}
