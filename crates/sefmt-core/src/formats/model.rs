//! Model (`.mdl`).
//!
//! The header declares the vertex and frame counts once; the vertex, frame
//! box, mip vertex and mip mask blocks further down are sized from those
//! header fields through the root context.

use crate::chunk::ChunkKind;
use crate::config::DecoderConfig;
use crate::error::{DecodeResult, ResultExt};
use crate::stream::{
    counted, expect_magic, read_flags, read_float3, read_tag, ByteCursor, DecodeContext,
    FLOAT3_SIZE,
};
use crate::value::{FlagSchema, Record, Value};
use tracing::warn;

/// Bit names of the model flags word
pub const MODEL_FLAGS: FlagSchema = &[
    ("faceForward", 0),
    ("reflections", 1),
    ("reflectionsHalf", 2),
    ("halfFaceForward", 3),
    ("compressed16bit", 4),
    ("stretchDetail", 5),
];

const VTX_COUNT: &[&str] = &["header", "vtxCount", "value"];
const FRAME_COUNT: &[&str] = &["header", "frameCount", "value"];
const MIP_FACTOR_COUNT: u32 = 32;

/// Per-frame vertex encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexFormat {
    /// `AFVX`: 8-bit coordinates plus a normal index
    Compressed8,
    /// `AV17`: 16-bit coordinates plus heading/pitch normal
    Compressed16,
}

impl ChunkKind for VertexFormat {
    const CONTAINER: &'static str = "model vertices";

    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"AFVX" => Some(VertexFormat::Compressed8),
            b"AV17" => Some(VertexFormat::Compressed16),
            _ => None,
        }
    }
}

impl VertexFormat {
    fn size(self) -> usize {
        match self {
            VertexFormat::Compressed8 => 4,
            VertexFormat::Compressed16 => 8,
        }
    }
}

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let header = header(cur).at("header")?;
    let mut model = Record::new().with("header", header);

    let tag = read_tag(cur).at("chunkId")?;
    model.insert("chunkId", tag.clone());
    let vertices: Value = match VertexFormat::from_tag(tag.bytes()) {
        Some(format) => vertex_chunk(cur, DecodeContext::root(&model, config), format)
            .at("vertices")?
            .into(),
        None => {
            warn!(
                container = VertexFormat::CONTAINER,
                tag = tag.as_str(),
                offset = tag.offset(),
                "unknown vertex chunk, no vertex data read"
            );
            Value::Empty
        }
    };
    model.insert("vertices", vertices);

    let frame_infos = frame_infos(cur, DecodeContext::root(&model, config)).at("frameInfos")?;
    model.insert("frameInfos", frame_infos);
    let main_mip = main_mip_vertices(cur, DecodeContext::root(&model, config)).at("mainMipVertices")?;
    model.insert("mainMipVertices", main_mip);
    let masks = mip_masks(cur, DecodeContext::root(&model, config)).at("mipMasks")?;
    model.insert("mipMasks", masks);

    let mip_count = sized_u32(cur, "IMIP", "count").at("mipCount")?;
    let mips = mip_count.get_u32("count").unwrap_or_default();
    model.insert("mipCount", mip_count);
    model.insert("mipFactors", mip_factors(cur, config).at("mipFactors")?);

    let infos = counted(cur, config, mips, 12, |cur| {
        Ok(Record::new().with("ipol", sized_u32(cur, "IPOL", "count").at("ipol")?))
    })
    .at("modelMipInfos")?;
    model.insert("modelMipInfos", infos);
    Ok(model)
}

fn header(cur: &mut ByteCursor) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("magic", expect_magic(cur, "MDAT").at("magic")?)
        .with("version", read_tag(cur).at("version")?)
        .with("flags", read_flags(cur, MODEL_FLAGS).at("flags")?)
        .with("vtxCount", sized_u32(cur, "IVTX", "value").at("vtxCount")?)
        .with("frameCount", sized_u32(cur, "IFRM", "value").at("frameCount")?))
}

/// A tagged chunk holding a size and a single `u32`
fn sized_u32(cur: &mut ByteCursor, magic: &'static str, name: &'static str) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("magic", expect_magic(cur, magic).at("magic")?)
        .with("size", cur.read_u32().at("size")?)
        .with(name, cur.read_u32().at(name)?))
}

fn vertex_chunk(
    cur: &mut ByteCursor,
    ctx: DecodeContext<'_>,
    format: VertexFormat,
) -> DecodeResult<Record> {
    let size = cur.read_u32().at("size")?;
    let mut chunk = Record::new().with("size", size);

    let vtx_count = ctx.root_u32(VTX_COUNT, cur)?;
    let frame_count = ctx.root_u32(FRAME_COUNT, cur)?;
    let total = u64::from(vtx_count) * u64::from(frame_count);

    let data = counted(cur, ctx.config(), total, format.size(), |cur| match format {
        VertexFormat::Compressed8 => Ok(Record::new()
            .with("x", cur.read_i8().at("x")?)
            .with("y", cur.read_i8().at("y")?)
            .with("z", cur.read_i8().at("z")?)
            .with("normIndex", cur.read_u8().at("normIndex")?)),
        VertexFormat::Compressed16 => Ok(Record::new()
            .with("x", cur.read_i16().at("x")?)
            .with("y", cur.read_i16().at("y")?)
            .with("z", cur.read_i16().at("z")?)
            .with("normH", cur.read_i8().at("normH")?)
            .with("normP", cur.read_i8().at("normP")?)),
    })
    .at("data")?;
    chunk.insert("data", data);
    Ok(chunk)
}

fn frame_infos(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let magic = expect_magic(cur, "AFIN").at("magic")?;
    let size = cur.read_u32().at("size")?;
    let frames = ctx.root_u32(FRAME_COUNT, cur)?;
    let boxes = counted(cur, ctx.config(), frames, 2 * FLOAT3_SIZE, |cur| {
        Ok(Record::new()
            .with("a", read_float3(cur).at("a")?)
            .with("b", read_float3(cur).at("b")?))
    })
    .at("boxes")?;
    Ok(Record::new()
        .with("magic", magic)
        .with("size", size)
        .with("boxes", boxes))
}

fn main_mip_vertices(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let magic = expect_magic(cur, "AMMV").at("magic")?;
    let size = cur.read_u32().at("size")?;
    let count = ctx.root_u32(VTX_COUNT, cur)?;
    let vertices = counted(cur, ctx.config(), count, FLOAT3_SIZE, read_float3).at("vertices")?;
    Ok(Record::new()
        .with("magic", magic)
        .with("size", size)
        .with("vertices", vertices))
}

fn mip_masks(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let magic = expect_magic(cur, "AVMK").at("magic")?;
    let size = cur.read_u32().at("size")?;
    let count = ctx.root_u32(VTX_COUNT, cur)?;
    let masks = counted(cur, ctx.config(), count, 4, ByteCursor::read_u32).at("masks")?;
    Ok(Record::new()
        .with("magic", magic)
        .with("size", size)
        .with("masks", masks))
}

fn mip_factors(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let magic = expect_magic(cur, "FMIP").at("magic")?;
    let size = cur.read_u32().at("size")?;
    let values = counted(cur, config, MIP_FACTOR_COUNT, 4, ByteCursor::read_f32).at("values")?;
    Ok(Record::new()
        .with("magic", magic)
        .with("size", size)
        .with("values", values))
}
