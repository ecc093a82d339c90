//! World (`.wld`).
//!
//! A world file starts with a build version and a `WRLD` marker followed by
//! tagged chunks up to `WEND`. Files that do not start with `BUIV` hold a
//! single bare chunk (typically a terrain list) and are decoded as such.
//!
//! The chunk loop is strict unless [`DecoderConfig::lenient_world_chunks`] is
//! set: a missing `WEND` is `Truncated` and errors inside a chunk body are
//! reported. In lenient mode a chunk that fails to decode ends the list and
//! the chunks before it are kept.

use crate::chunk::{has_type, read_chunk, ChunkKind, UnknownTag};
use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeResult, ResultExt};
use crate::stream::{
    check_count, counted, expect_magic, read_float3, read_text, until, until_eof, ByteCursor,
    DecodeContext,
};
use crate::value::{Blob, Record, Value};

/// `WLIF` read as a little-endian `u32`
const INFO_MAGIC: u32 = 0x4649_4C57;
/// `DTRS` read as a little-endian `u32`
const NAME_MAGIC: u32 = 0x5352_5444;

const BRUSH_SIZE: usize = 12;
const TERRAIN_MIN: usize = 4;
const DICT_ENTRY_MIN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorldChunk {
    Info,
    Positions,
    Brushes,
    Terrains,
    Dictionary,
    State,
    End,
}

impl ChunkKind for WorldChunk {
    const CONTAINER: &'static str = "world";

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"WLIF" => Some(WorldChunk::Info),
            b"DPOS" => Some(WorldChunk::Positions),
            b"BRAR" => Some(WorldChunk::Brushes),
            b"TRAR" => Some(WorldChunk::Terrains),
            b"DICT" => Some(WorldChunk::Dictionary),
            b"WSTA" => Some(WorldChunk::State),
            b"WEND" => Some(WorldChunk::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerrainKind {
    Legacy,
    Current,
}

impl ChunkKind for TerrainKind {
    const CONTAINER: &'static str = "terrain";

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"TERR" => Some(TerrainKind::Legacy),
            b"TRVR" => Some(TerrainKind::Current),
            _ => None,
        }
    }
}

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let root = Record::new();
    let ctx = DecodeContext::root(&root, config);

    if &cur.peek_array::<4>()? != b"BUIV" {
        let chunk = read_chunk(cur, UnknownTag::Fatal, |kind, cur| chunk_body(kind, cur, ctx)).at("trar")?;
        return Ok(Record::new().with("trar", chunk));
    }

    let build = Record::new()
        .with("magic", expect_magic(cur, "BUIV").at("magic").at("buildVersion")?)
        .with("number", cur.read_u32().at("number").at("buildVersion")?);
    let world = world(cur, ctx).at("world")?;
    Ok(Record::new().with("buildVersion", build).with("world", world))
}

fn world(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let start = expect_magic(cur, "WRLD").at("start")?;
    let chunk = |cur: &mut ByteCursor| read_chunk(cur, UnknownTag::Empty, |kind, cur| chunk_body(kind, cur, ctx));

    let chunks = if ctx.config().lenient_world_chunks {
        until_eof(cur, chunk, |c| has_type(c, "WEND"))
    } else {
        if cur.is_at_end() {
            return Err(DecodeError::truncated("WEND", cur.position()).within("chunks"));
        }
        until(cur, "WEND", chunk, |c| has_type(c, "WEND")).at("chunks")?
    };
    Ok(Record::new().with("start", start).with("chunks", chunks))
}

fn chunk_body(kind: WorldChunk, cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Option<Value>> {
    let config = ctx.config();
    let body: Value = match kind {
        WorldChunk::Info => world_info(cur, ctx)?.into(),
        WorldChunk::Positions => cur.read_u32()?.into(),
        WorldChunk::Brushes => brushes(cur, config)?.into(),
        WorldChunk::Terrains => terrains(cur, ctx)?.into(),
        WorldChunk::Dictionary => dictionary(cur, config)?.into(),
        WorldChunk::State => Record::new().with("version", cur.read_u32().at("version")?).into(),
        WorldChunk::End => return Ok(None),
    };
    Ok(Some(body))
}

fn world_info(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let len_or_magic = cur.read_u32().at("lenOrMagic")?;
    let mut info = Record::new().with("lenOrMagic", len_or_magic);
    let data = if len_or_magic == INFO_MAGIC {
        current_info(cur)
    } else {
        legacy_info(cur, ctx.child(&info))
    }
    .at("data")?;
    info.insert("data", data);
    Ok(info)
}

fn current_info(cur: &mut ByteCursor) -> DecodeResult<Record> {
    let len_or_magic = cur.read_u32().at("lenOrMagic")?;
    let mut info = Record::new().with("lenOrMagic", len_or_magic);
    let name_len = if len_or_magic == NAME_MAGIC {
        let len = cur.read_u32().at("len")?;
        info.insert("len", len);
        len
    } else {
        len_or_magic
    };
    info.insert("name", read_text(cur, name_len as usize).at("name")?);
    info.insert("spawnFlags", cur.read_u32().at("spawnFlags")?);
    let description_len = cur.read_u32().at("descriptionLen")?;
    info.insert("descriptionLen", description_len);
    info.insert(
        "description",
        read_text(cur, description_len as usize).at("description")?,
    );
    Ok(info)
}

/// Pre-`WLIF` info block: only a description whose length is the word the
/// enclosing chunk already read
fn legacy_info(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let len = ctx.parent_u32("lenOrMagic", cur)?;
    let description = read_text(cur, len as usize).at("description")?;
    Ok(Record::new().with("description", description))
}

fn brushes(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let count = cur.read_u32().at("count")?;
    let data = counted(cur, config, count, BRUSH_SIZE, |cur| {
        Ok(Record::new()
            .with("magic", expect_magic(cur, "BR3D").at("magic")?)
            .with("version", cur.read_u32().at("version")?)
            .with("mipCount", cur.read_u32().at("mipCount")?))
    })
    .at("data")?;
    Ok(Record::new().with("count", count).with("data", data))
}

fn terrains(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let count = cur.read_u32().at("count")?;
    let container = counted(cur, ctx.config(), count, TERRAIN_MIN, |cur| {
        read_chunk(cur, UnknownTag::Fatal, |kind: TerrainKind, cur| {
            let body = match kind {
                TerrainKind::Legacy => legacy_terrain(cur)?,
                TerrainKind::Current => terrain(cur, ctx)?,
            };
            Ok(Some(body.into()))
        })
    })
    .at("container")?;
    let end = expect_magic(cur, "EOTA").at("endId")?;
    Ok(Record::new()
        .with("count", count)
        .with("container", container)
        .with("endId", end))
}

fn legacy_terrain(cur: &mut ByteCursor) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("version", cur.read_u32().at("version")?)
        .with("hmWidth", cur.read_u32().at("hmWidth")?)
        .with("hmHeight", cur.read_u32().at("hmHeight")?)
        .with("stretch", read_float3(cur).at("stretch")?)
        .with("distFactor", cur.read_f32().at("distFactor")?)
        .with("terrainSize", read_float3(cur).at("terrainSize")?))
}

fn terrain(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let version = cur.read_u32().at("version")?;
    let data = terrain_global_data(cur).at("data")?;
    let trhm = expect_magic(cur, "TRHM").at("trhmMagic")?;
    let height_map = height_map(cur, ctx.child(&data)).at("heightMap")?;
    Ok(Record::new()
        .with("version", version)
        .with("data", data)
        .with("trhmMagic", trhm)
        .with("heightMap", height_map))
}

fn terrain_global_data(cur: &mut ByteCursor) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("trgdMagic", expect_magic(cur, "TRGD").at("trgdMagic")?)
        .with("hmWidth", cur.read_u32().at("hmWidth")?)
        .with("hmHeight", cur.read_u32().at("hmHeight")?)
        .with("shadowMapSizeAspect", cur.read_u32().at("shadowMapSizeAspect")?)
        .with("shadingMapSizeAspect", cur.read_u32().at("shadingMapSizeAspect")?)
        .with("layerCount", cur.read_u32().at("layerCount")?)
        .with("distFactor", cur.read_f32().at("distFactor")?)
        .with("stretch", read_float3(cur).at("stretch")?)
        .with("metricSize", read_float3(cur).at("metricSize")?))
}

/// 16-bit height samples; dimensions come from the terrain's global data
fn height_map(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Blob> {
    let width = ctx.parent_u32("hmWidth", cur)?;
    let height = ctx.parent_u32("hmHeight", cur)?;
    let samples = check_count(cur, ctx.config(), u64::from(width) * u64::from(height), 2)?;
    let offset = cur.position();
    let bytes = cur.read_bytes(samples * 2)?;
    Ok(Blob::new(bytes, offset))
}

fn dictionary(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let count = cur.read_u32().at("dictCount")?;
    let names = counted(cur, config, count, DICT_ENTRY_MIN, |cur| {
        let magic = expect_magic(cur, "DFNM").at("magic")?;
        let len = cur.read_u32().at("len")?;
        let value = read_text(cur, len as usize).at("value")?;
        Ok(Record::new()
            .with("magic", magic)
            .with("len", len)
            .with("value", value))
    })
    .at("names")?;
    let end = expect_magic(cur, "DEND").at("endId")?;
    Ok(Record::new()
        .with("dictCount", count)
        .with("names", names)
        .with("endId", end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::stream::FixtureWriter;
    use pretty_assertions::assert_eq;

    fn decode_with(data: Vec<u8>, config: &DecoderConfig) -> DecodeResult<(Record, usize)> {
        let mut cur = ByteCursor::new(data);
        let record = decode(&mut cur, config)?;
        Ok((record, cur.remaining()))
    }

    fn strict(data: Vec<u8>) -> DecodeResult<(Record, usize)> {
        decode_with(data, &DecoderConfig::default())
    }

    fn world_start() -> FixtureWriter {
        FixtureWriter::new().tag("BUIV").u32(10000).tag("WRLD")
    }

    fn chunk_types(world: &Record) -> Vec<String> {
        world
            .lookup(&["world", "chunks"])
            .and_then(Value::as_seq)
            .unwrap()
            .iter()
            .map(|c| c.as_record().and_then(|r| r.get_str("type")).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_world_chunks() {
        let data = world_start()
            .tag("WLIF")
            .u32(INFO_MAGIC)
            .u32(NAME_MAGIC)
            .u32(5)
            .tag("Intro")
            .u32(3)
            .u32(4)
            .tag("Test")
            .tag("DPOS")
            .u32(42)
            .tag("BRAR")
            .u32(1)
            .tag("BR3D")
            .u32(14)
            .u32(2)
            .tag("DICT")
            .u32(1)
            .tag("DFNM")
            .u32(9)
            .tag("a\\b.tex\0\0")
            .tag("DEND")
            .tag("WSTA")
            .u32(7)
            .tag("WEND")
            .finish();

        let (world, trailing) = strict(data).unwrap();
        assert_eq!(trailing, 0);
        assert_eq!(world.lookup(&["buildVersion", "number"]), Some(&Value::from(10000u32)));
        assert_eq!(chunk_types(&world), vec!["WLIF", "DPOS", "BRAR", "DICT", "WSTA", "WEND"]);

        let chunks = world.lookup(&["world", "chunks"]).and_then(Value::as_seq).unwrap();
        let info = chunks[0].as_record().unwrap().lookup(&["body", "data"]).and_then(Value::as_record).unwrap();
        assert_eq!(info.get_str("name"), Some("Intro"));
        assert_eq!(info.get_u32("len"), Some(5));
        assert_eq!(info.get_str("description"), Some("Test"));
        assert_eq!(chunks[1].as_record().unwrap().get_u32("body"), Some(42));
        assert!(!chunks[5].as_record().unwrap().contains("body"));
    }

    #[test]
    fn test_world_info_without_name_tag() {
        let data = world_start()
            .tag("WLIF")
            .u32(INFO_MAGIC)
            .u32(3)
            .tag("Lab")
            .u32(0)
            .u32(0)
            .tag("WEND")
            .finish();
        let (world, _) = strict(data).unwrap();
        let chunks = world.lookup(&["world", "chunks"]).and_then(Value::as_seq).unwrap();
        let info = chunks[0].as_record().unwrap().lookup(&["body", "data"]).and_then(Value::as_record).unwrap();
        assert_eq!(info.get_str("name"), Some("Lab"));
        assert!(!info.contains("len"));
    }

    #[test]
    fn test_legacy_world_info() {
        let data = world_start().tag("WLIF").u32(7).tag("Old map").tag("WEND").finish();
        let (world, trailing) = strict(data).unwrap();
        assert_eq!(trailing, 0);
        assert_eq!(chunk_types(&world), vec!["WLIF", "WEND"]);

        let chunks = world.lookup(&["world", "chunks"]).and_then(Value::as_seq).unwrap();
        let info = chunks[0].as_record().unwrap().get_record("body").unwrap();
        assert_eq!(info.get_u32("lenOrMagic"), Some(7));
        assert_eq!(info.lookup(&["data", "description"]).and_then(Value::as_str), Some("Old map"));
    }

    #[test]
    fn test_unknown_world_chunk_is_empty() {
        let data = world_start().tag("XTRA").tag("WEND").finish();
        let (world, _) = strict(data).unwrap();
        assert_eq!(chunk_types(&world), vec!["XTRA", "WEND"]);
    }

    #[test]
    fn test_missing_wend() {
        let data = world_start().tag("DPOS").u32(1).finish();
        let err = strict(data.clone()).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::Truncated { expected: "WEND" });
        assert_eq!(err.path(), "world.chunks");

        let lenient = DecoderConfig::new().lenient_world_chunks(true);
        let (world, trailing) = decode_with(data, &lenient).unwrap();
        assert_eq!(trailing, 0);
        assert_eq!(chunk_types(&world), vec!["DPOS"]);
    }

    #[test]
    fn test_empty_world_body() {
        let err = strict(world_start().finish()).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::Truncated { expected: "WEND" });
    }

    #[test]
    fn test_corrupt_trailing_chunk() {
        let data = world_start().tag("DPOS").u32(1).tag("BRAR").u32(1).tag("XXXX").finish();

        let err = strict(data.clone()).unwrap_err();
        assert_eq!(err.path(), "world.chunks[1].body.data");

        let lenient = DecoderConfig::new().lenient_world_chunks(true);
        let (world, trailing) = decode_with(data, &lenient).unwrap();
        assert_eq!(chunk_types(&world), vec!["DPOS"]);
        assert_eq!(trailing, 12);
    }

    fn terrain_list() -> FixtureWriter {
        FixtureWriter::new()
            .tag("TRAR")
            .u32(2)
            .tag("TERR")
            .u32(1)
            .u32(65)
            .u32(65)
            .f3(1.0, 1.0, 1.0)
            .f32(0.5)
            .f3(256.0, 32.0, 256.0)
            .tag("TRVR")
            .u32(9)
            .tag("TRGD")
            .u32(2)
            .u32(3)
            .u32(0)
            .u32(0)
            .u32(1)
            .f32(1.0)
            .f3(1.0, 1.0, 1.0)
            .f3(64.0, 8.0, 64.0)
            .tag("TRHM")
            .zeros(12)
            .tag("EOTA")
    }

    #[test]
    fn test_bare_terrain_chunk() {
        let (world, trailing) = strict(terrain_list().finish()).unwrap();
        assert_eq!(trailing, 0);

        let trar = world.get_record("trar").unwrap();
        assert_eq!(trar.get_str("type"), Some("TRAR"));
        let container = trar.lookup(&["body", "container"]).and_then(Value::as_seq).unwrap();
        assert_eq!(container.len(), 2);

        let legacy = container[0].as_record().unwrap();
        assert_eq!(legacy.get_str("type"), Some("TERR"));
        assert_eq!(legacy.lookup(&["body", "hmWidth"]), Some(&Value::from(65u32)));

        let current = container[1].as_record().unwrap();
        let height_map = current.lookup(&["body", "heightMap"]).and_then(Value::as_blob).unwrap();
        assert_eq!(height_map.len(), 12);
    }

    #[test]
    fn test_unknown_terrain_is_fatal() {
        let data = FixtureWriter::new().tag("TRAR").u32(1).tag("TRXX").u32(0).tag("EOTA").finish();
        let err = strict(data).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnknownChunkTag {
                tag: "TRXX".to_string()
            }
        );
        assert_eq!(err.path(), "trar.body.container[0]");
        assert_eq!(err.offset(), 8);
    }

    #[test]
    fn test_unknown_bare_chunk_is_fatal() {
        let err = strict(FixtureWriter::new().tag("ABCD").u32(0).finish()).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::UnknownChunkTag { .. }));
        assert_eq!(err.path(), "trar");
    }

    #[test]
    fn test_dictionary_requires_end_marker() {
        let data = world_start()
            .tag("DICT")
            .u32(0)
            .tag("DENX")
            .tag("WEND")
            .finish();
        let err = strict(data).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::BadMagic { .. }));
        assert_eq!(err.path(), "world.chunks[0].body.endId");
    }

    #[test]
    fn test_internal_magics() {
        let world = world_start()
            .tag("BRAR")
            .u32(1)
            .tag("BR3D")
            .u32(14)
            .u32(2)
            .tag("DICT")
            .u32(1)
            .tag("DFNM")
            .u32(4)
            .tag("a.wt")
            .tag("DEND")
            .tag("WEND")
            .finish();
        let terrains = terrain_list().finish();
        assert!(strict(world.clone()).is_ok());
        assert!(strict(terrains.clone()).is_ok());

        let cases = [
            (&world, "BR3D", "world.chunks[0].body.data[0].magic"),
            (&world, "DFNM", "world.chunks[1].body.names[0].magic"),
            (&world, "DEND", "world.chunks[1].body.endId"),
            (&terrains, "TRGD", "trar.body.container[1].body.data.trgdMagic"),
            (&terrains, "TRHM", "trar.body.container[1].body.trhmMagic"),
            (&terrains, "EOTA", "trar.body.endId"),
        ];
        for (valid, magic, path) in cases {
            let offset = valid
                .windows(4)
                .position(|window| window == magic.as_bytes())
                .unwrap();
            let mut data = valid.clone();
            data[offset] = b'X';
            let err = strict(data).unwrap_err();
            assert_eq!(
                err.kind(),
                &DecodeErrorKind::BadMagic {
                    expected: magic.to_string(),
                    actual: format!("X{}", &magic[1..])
                },
                "{magic}"
            );
            assert_eq!(err.offset(), offset, "{magic}");
            assert_eq!(err.path(), path, "{magic}");
        }
    }
}
